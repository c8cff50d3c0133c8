//! Utilities for dealing with generic pNext chains
//!
//! Descriptor-related create infos can carry extra per-binding or per-pool-size data in their
//! pNext chain. Cache keys must include this data, so the chain is flattened into a list of
//! owned [`PNext`] records before hashing. Structures this crate does not know about are skipped.

use std::ffi::c_void;

use ash::vk;

/// A typed element in the pNext chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PNext {
    /// `VkDescriptorSetLayoutBindingFlagsCreateInfo`, one entry per binding in declaration order.
    BindingFlags(Vec<vk::DescriptorBindingFlags>),
    /// `VkMutableDescriptorTypeCreateInfoEXT`, one list per binding or per pool size.
    MutableDescriptorTypes(Vec<Vec<vk::DescriptorType>>),
    /// `VkDescriptorPoolInlineUniformBlockCreateInfo`
    InlineUniformBlock(u32),
}

/// Borrow a Vulkan array as a slice, treating a null pointer as an empty array.
pub(crate) unsafe fn raw_slice<'a, T>(ptr: *const T, len: u32) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len as usize)
    }
}

/// Walk a pNext chain and collect every record this crate understands.
/// # Safety
/// `p_next` must be null or point to a valid chain of Vulkan structures, as required by the
/// Vulkan specification for the create info it was taken from.
pub unsafe fn read_chain(p_next: *const c_void) -> Vec<PNext> {
    let mut records = Vec::new();
    collect_records(p_next, &mut records);
    records
}

unsafe fn collect_records(p_next: *const c_void, records: &mut Vec<PNext>) {
    if p_next.is_null() {
        return;
    }

    let base = &*(p_next as *const vk::BaseInStructure);
    match base.s_type {
        vk::StructureType::DESCRIPTOR_SET_LAYOUT_BINDING_FLAGS_CREATE_INFO => {
            let info = &*(p_next as *const vk::DescriptorSetLayoutBindingFlagsCreateInfo);
            records.push(PNext::BindingFlags(raw_slice(info.p_binding_flags, info.binding_count).to_vec()));
        }
        vk::StructureType::MUTABLE_DESCRIPTOR_TYPE_CREATE_INFO_EXT => {
            let info = &*(p_next as *const vk::MutableDescriptorTypeCreateInfoEXT);
            let lists = raw_slice(info.p_mutable_descriptor_type_lists, info.mutable_descriptor_type_list_count)
                .iter()
                .map(|list| raw_slice(list.p_descriptor_types, list.descriptor_type_count).to_vec())
                .collect();
            records.push(PNext::MutableDescriptorTypes(lists));
        }
        vk::StructureType::DESCRIPTOR_POOL_INLINE_UNIFORM_BLOCK_CREATE_INFO => {
            let info = &*(p_next as *const vk::DescriptorPoolInlineUniformBlockCreateInfo);
            records.push(PNext::InlineUniformBlock(info.max_inline_uniform_block_bindings));
        }
        _ => {}
    }

    collect_records(base.p_next as *const c_void, records);
}

/// Per-binding flags found in a flattened chain, if any.
pub(crate) fn find_binding_flags(records: &[PNext]) -> Option<&[vk::DescriptorBindingFlags]> {
    records.iter().find_map(|record| match record {
        PNext::BindingFlags(flags) => Some(flags.as_slice()),
        _ => None,
    })
}

/// Mutable descriptor type lists found in a flattened chain, if any.
pub(crate) fn find_mutable_types(records: &[PNext]) -> Option<&[Vec<vk::DescriptorType>]> {
    records.iter().find_map(|record| match record {
        PNext::MutableDescriptorTypes(lists) => Some(lists.as_slice()),
        _ => None,
    })
}

/// Maximum inline uniform block binding count found in a flattened chain, if any.
pub(crate) fn find_inline_uniform_block(records: &[PNext]) -> Option<u32> {
    records.iter().find_map(|record| match record {
        PNext::InlineUniformBlock(count) => Some(*count),
        _ => None,
    })
}
