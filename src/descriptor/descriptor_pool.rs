//! Native descriptor pools and the per-set shape they are created from.
//!
//! Pools are never created directly by users. A [`DescriptorPoolAllocator`](super::pool_allocator::DescriptorPoolAllocator)
//! creates them from a [`DescriptorPoolCreateInfo`], which describes how many descriptors of each
//! type a *single* descriptor set needs. Every native pool holds a fixed number of sets, and its
//! per-type descriptor counts are scaled accordingly.

use std::fmt::{Display, Formatter};

use anyhow::Result;
use ash::vk;

use crate::core::device::Device;
use crate::pipeline::set_layout::DescriptorSetLayoutCreateInfo;
use crate::util::hash::InvariantSet;
use crate::util::pnext::{find_inline_uniform_block, find_mutable_types, raw_slice, read_chain};

/// Number of descriptors of one type that a single descriptor set needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPoolSize {
    /// Descriptor type
    pub ty: vk::DescriptorType,
    /// Descriptors of this type per set. For inline uniform blocks this is a size in bytes.
    pub count: u32,
    /// Descriptor types a `MUTABLE_EXT` descriptor of this entry can hold.
    pub mutable_types: Vec<vk::DescriptorType>,
}

/// Defines the per-set shape of a descriptor pool.
#[derive(Debug, Clone, Default)]
pub struct DescriptorPoolCreateInfo {
    /// Pool creation flags
    pub flags: vk::DescriptorPoolCreateFlags,
    /// Descriptor requirements of a single set.
    pub sizes: Vec<DescriptorPoolSize>,
    /// Inline uniform block bindings in a single set.
    pub max_inline_uniform_block_bindings: u32,
}

/// Structural identity of one pool size entry.
#[derive(Debug, Clone)]
pub struct DescriptorPoolSizeKey {
    pub(crate) ty: vk::DescriptorType,
    pub(crate) count: u32,
    pub(crate) mutable_types: InvariantSet<vk::DescriptorType>,
}

/// Structural identity of a pool shape. Pools with equal keys can serve each other's descriptor sets.
#[derive(Debug, Clone)]
pub struct DescriptorPoolKey {
    pub(crate) flags: vk::DescriptorPoolCreateFlags,
    pub(crate) sizes: InvariantSet<DescriptorPoolSizeKey>,
    pub(crate) max_inline_uniform_block_bindings: u32,
}

/// Memory pool for descriptor sets
#[derive(Derivative)]
#[derivative(Debug)]
pub(super) struct DescriptorPool {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::DescriptorPool,
}

impl DescriptorPoolCreateInfo {
    /// Derive the pool shape needed to allocate sets of the given layout. Bindings of the same type
    /// and mutable type set are merged, binding indices do not matter.
    pub fn from_layout(layout: &DescriptorSetLayoutCreateInfo) -> Self {
        let mut flags = vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET;
        if layout
            .flags
            .contains(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
        {
            flags |= vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND;
        }

        let mut groups: Vec<(InvariantSet<vk::DescriptorType>, DescriptorPoolSize)> = Vec::new();
        let mut max_inline_uniform_block_bindings = 0;
        // Empty bindings only reserve their index and need no pool space.
        for binding in layout.bindings.iter().filter(|binding| binding.count > 0) {
            if binding.ty == vk::DescriptorType::INLINE_UNIFORM_BLOCK {
                max_inline_uniform_block_bindings += 1;
            }

            let mutable_types = binding.mutable_types.iter().copied().collect::<InvariantSet<_>>();
            match groups
                .iter_mut()
                .find(|(types, size)| size.ty == binding.ty && *types == mutable_types)
            {
                Some((_, size)) => size.count += binding.count,
                None => groups.push((
                    mutable_types,
                    DescriptorPoolSize {
                        ty: binding.ty,
                        count: binding.count,
                        mutable_types: binding.mutable_types.clone(),
                    },
                )),
            }
        }

        Self {
            flags,
            sizes: groups.into_iter().map(|(_, size)| size).collect(),
            max_inline_uniform_block_bindings,
        }
    }

    /// Build a pool shape from a raw create info. All counts are divided by `maxSets`, so two pools
    /// created for different set capacities but the same per-set requirements give the same shape.
    /// Mutable descriptor type lists and the inline uniform block binding count are read from the
    /// pNext chain, other chained structures are ignored.
    /// # Safety
    /// `info` must be a valid `VkDescriptorPoolCreateInfo`, including its pNext chain.
    pub unsafe fn from_vk(info: &vk::DescriptorPoolCreateInfo) -> Self {
        let max_sets = info.max_sets.max(1);
        let records = read_chain(info.p_next);
        let mutable_types = find_mutable_types(&records).unwrap_or(&[]);

        let sizes = raw_slice(info.p_pool_sizes, info.pool_size_count)
            .iter()
            .enumerate()
            .map(|(index, size)| DescriptorPoolSize {
                ty: size.ty,
                count: size.descriptor_count / max_sets,
                mutable_types: mutable_types.get(index).cloned().unwrap_or_default(),
            })
            .filter(|size| size.count > 0)
            .collect();

        Self {
            flags: info.flags,
            sizes,
            max_inline_uniform_block_bindings: find_inline_uniform_block(&records).unwrap_or(0) / max_sets,
        }
    }

    /// Get the structural key of this pool shape.
    pub fn key(&self) -> DescriptorPoolKey {
        DescriptorPoolKey {
            flags: self.flags,
            sizes: self
                .sizes
                .iter()
                .map(|size| DescriptorPoolSizeKey {
                    ty: size.ty,
                    count: size.count,
                    mutable_types: size.mutable_types.iter().copied().collect(),
                })
                .collect(),
            max_inline_uniform_block_bindings: self.max_inline_uniform_block_bindings,
        }
    }
}

impl DescriptorPool {
    /// Create a new descriptor pool that can hold `max_sets` sets of the given shape.
    /// Size entries without descriptors are left out.
    pub(super) fn new(device: Device, info: &DescriptorPoolCreateInfo, max_sets: u32) -> Result<Self> {
        let sizes = info.sizes.iter().filter(|size| size.count > 0).collect::<Vec<_>>();
        let pool_sizes = sizes
            .iter()
            .map(|size| vk::DescriptorPoolSize {
                ty: size.ty,
                descriptor_count: size.count.saturating_mul(max_sets),
            })
            .collect::<Vec<_>>();
        let mutable_lists = sizes
            .iter()
            .map(|size| vk::MutableDescriptorTypeListEXT {
                descriptor_type_count: size.mutable_types.len() as u32,
                p_descriptor_types: size.mutable_types.as_ptr(),
            })
            .collect::<Vec<_>>();

        let mut mutable_info = vk::MutableDescriptorTypeCreateInfoEXT {
            mutable_descriptor_type_list_count: mutable_lists.len() as u32,
            p_mutable_descriptor_type_lists: mutable_lists.as_ptr(),
            ..Default::default()
        };
        let mut inline_uniform_block_info = vk::DescriptorPoolInlineUniformBlockCreateInfo {
            max_inline_uniform_block_bindings: info.max_inline_uniform_block_bindings.saturating_mul(max_sets),
            ..Default::default()
        };

        let mut vk_info = vk::DescriptorPoolCreateInfo::builder()
            .flags(info.flags)
            .max_sets(max_sets)
            .pool_sizes(pool_sizes.as_slice());
        if sizes.iter().any(|size| !size.mutable_types.is_empty()) {
            vk_info = vk_info.push_next(&mut mutable_info);
        }
        if info.max_inline_uniform_block_bindings > 0 {
            vk_info = vk_info.push_next(&mut inline_uniform_block_info);
        }

        let handle = unsafe { device.create_descriptor_pool(&vk_info)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDescriptorPool {handle:p}");

        Ok(Self {
            device,
            handle,
        })
    }

    /// Get the raw Vulkan handle of this descriptor pool
    pub(super) unsafe fn handle(&self) -> vk::DescriptorPool {
        self.handle
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkDescriptorPool {:p}", self.handle);
        unsafe {
            self.device.destroy_descriptor_pool(self.handle);
        }
    }
}

impl Display for DescriptorPoolCreateInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DescriptorPoolCreateInfo ({:?}", self.flags)?;
        for size in &self.sizes {
            write!(f, ", {:?} => {}", size.ty, size.count)?;
            if !size.mutable_types.is_empty() {
                write!(f, " {:?}", size.mutable_types)?;
            }
        }
        if self.max_inline_uniform_block_bindings > 0 {
            write!(f, ", inline uniform blocks => {}", self.max_inline_uniform_block_bindings)?;
        }
        write!(f, ")")
    }
}
