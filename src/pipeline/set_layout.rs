//! Wrapper structs around `VkDescriptorSetLayout` objects.
//!
//! Descriptor set layouts are cached by structure: two [`DescriptorSetLayoutCreateInfo`]s that
//! declare the same bindings (in any order) with the same flags share one [`DescriptorSetLayout`].
//!
//! # Example
//! ```ignore
//! use deimos::prelude::*;
//!
//! let mut cache = DescriptorSetLayoutCache::new(device.clone());
//! let info = DescriptorSetLayoutCreateInfo::new(vec![
//!     DescriptorBinding::new(0, vk::DescriptorType::UNIFORM_BUFFER, 1, vk::ShaderStageFlags::VERTEX),
//!     DescriptorBinding::new(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, vk::ShaderStageFlags::FRAGMENT),
//! ]);
//! let layout = cache.get_or_create(&info)?;
//! ```

use std::collections::HashSet;

use anyhow::Result;
use ash::vk;

use crate::core::device::Device;
use crate::core::error::Error;
use crate::util::cache::{Cache, Resource};
use crate::util::hash::InvariantSet;
use crate::util::pnext::{find_binding_flags, find_mutable_types, raw_slice, read_chain};

/// Cache of descriptor set layouts.
pub type DescriptorSetLayoutCache = Cache<DescriptorSetLayout>;

/// A fully built Vulkan descriptor set layout. This is a managed resource, so it cannot be manually
/// cloned or dropped.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorSetLayout {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::DescriptorSetLayout,
}

/// A single binding inside a descriptor set layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBinding {
    /// Binding index. Must be unique within a layout.
    pub binding: u32,
    /// Descriptor type of this binding.
    pub ty: vk::DescriptorType,
    /// Number of descriptors in this binding. For inline uniform blocks this is the size in bytes.
    pub count: u32,
    /// Shader stages that can access this binding.
    pub stages: vk::ShaderStageFlags,
    /// Immutable samplers, or empty if the binding does not use them. If not empty, there must be
    /// exactly `count` samplers.
    pub immutable_samplers: Vec<vk::Sampler>,
    /// Flags from `VkDescriptorSetLayoutBindingFlagsCreateInfo`.
    pub flags: vk::DescriptorBindingFlags,
    /// Descriptor types this binding can hold if it is of type `MUTABLE_EXT`.
    pub mutable_types: Vec<vk::DescriptorType>,
}

/// Describes a descriptor set layout.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutCreateInfo {
    /// Descriptor set layout flags
    pub flags: vk::DescriptorSetLayoutCreateFlags,
    /// All bindings in this layout. Declaration order is irrelevant for caching.
    pub bindings: Vec<DescriptorBinding>,
}

/// Structural identity of one binding. Immutable samplers and mutable types are compared as sets.
#[derive(Debug, Clone)]
pub struct DescriptorBindingKey {
    pub(crate) binding: u32,
    pub(crate) ty: vk::DescriptorType,
    pub(crate) count: u32,
    pub(crate) stages: vk::ShaderStageFlags,
    pub(crate) immutable_samplers: InvariantSet<vk::Sampler>,
    pub(crate) flags: vk::DescriptorBindingFlags,
    pub(crate) mutable_types: InvariantSet<vk::DescriptorType>,
}

/// Structural identity of a descriptor set layout: its flags and the set of its bindings.
#[derive(Debug, Clone)]
pub struct DescriptorSetLayoutKey {
    pub(crate) flags: vk::DescriptorSetLayoutCreateFlags,
    pub(crate) bindings: InvariantSet<DescriptorBindingKey>,
}

impl DescriptorBinding {
    /// Create a plain binding without immutable samplers, binding flags or mutable types.
    pub fn new(binding: u32, ty: vk::DescriptorType, count: u32, stages: vk::ShaderStageFlags) -> Self {
        Self {
            binding,
            ty,
            count,
            stages,
            immutable_samplers: Vec::new(),
            flags: vk::DescriptorBindingFlags::empty(),
            mutable_types: Vec::new(),
        }
    }

    pub fn with_immutable_samplers(mut self, samplers: impl Into<Vec<vk::Sampler>>) -> Self {
        self.immutable_samplers = samplers.into();
        self
    }

    pub fn with_flags(mut self, flags: vk::DescriptorBindingFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_mutable_types(mut self, types: impl Into<Vec<vk::DescriptorType>>) -> Self {
        self.mutable_types = types.into();
        self
    }

    /// Convert a raw Vulkan binding.
    /// # Safety
    /// If `p_immutable_samplers` is not null, it must point to `descriptor_count` samplers.
    pub unsafe fn from_vk(binding: &vk::DescriptorSetLayoutBinding) -> Self {
        Self {
            binding: binding.binding,
            ty: binding.descriptor_type,
            count: binding.descriptor_count,
            stages: binding.stage_flags,
            immutable_samplers: raw_slice(binding.p_immutable_samplers, binding.descriptor_count).to_vec(),
            flags: vk::DescriptorBindingFlags::empty(),
            mutable_types: Vec::new(),
        }
    }

    /// Get the structural key of this binding.
    pub fn key(&self) -> DescriptorBindingKey {
        DescriptorBindingKey {
            binding: self.binding,
            ty: self.ty,
            count: self.count,
            stages: self.stages,
            immutable_samplers: self.immutable_samplers.iter().copied().collect(),
            flags: self.flags,
            mutable_types: self.mutable_types.iter().copied().collect(),
        }
    }

    fn to_vk(&self) -> vk::DescriptorSetLayoutBinding {
        vk::DescriptorSetLayoutBinding {
            binding: self.binding,
            descriptor_type: self.ty,
            descriptor_count: self.count,
            stage_flags: self.stages,
            p_immutable_samplers: if self.immutable_samplers.is_empty() {
                std::ptr::null()
            } else {
                self.immutable_samplers.as_ptr()
            },
        }
    }
}

impl DescriptorSetLayoutCreateInfo {
    /// Create a layout description with no flags.
    pub fn new(bindings: impl Into<Vec<DescriptorBinding>>) -> Self {
        Self {
            flags: vk::DescriptorSetLayoutCreateFlags::empty(),
            bindings: bindings.into(),
        }
    }

    /// Set the layout create flags.
    pub fn flags(mut self, flags: vk::DescriptorSetLayoutCreateFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Build a layout description from a list of raw bindings.
    /// # Safety
    /// Every binding must satisfy the requirements of [`DescriptorBinding::from_vk`].
    pub unsafe fn from_bindings(bindings: &[vk::DescriptorSetLayoutBinding]) -> Self {
        Self::new(bindings.iter().map(|binding| DescriptorBinding::from_vk(binding)).collect::<Vec<_>>())
    }

    /// Build a layout description from a raw create info. Per-binding flags and mutable descriptor
    /// type lists in the pNext chain are folded into the bindings, other chained structures are ignored.
    /// # Safety
    /// `info` must be a valid `VkDescriptorSetLayoutCreateInfo`, including its pNext chain.
    pub unsafe fn from_vk(info: &vk::DescriptorSetLayoutCreateInfo) -> Self {
        let records = read_chain(info.p_next);
        let binding_flags = find_binding_flags(&records).unwrap_or(&[]);
        let mutable_types = find_mutable_types(&records).unwrap_or(&[]);

        let bindings = raw_slice(info.p_bindings, info.binding_count)
            .iter()
            .enumerate()
            .map(|(index, binding)| {
                let mut binding = DescriptorBinding::from_vk(binding);
                if let Some(flags) = binding_flags.get(index) {
                    binding.flags = *flags;
                }
                if let Some(types) = mutable_types.get(index) {
                    binding.mutable_types = types.clone();
                }
                binding
            })
            .collect::<Vec<_>>();

        Self {
            flags: info.flags,
            bindings,
        }
    }

    /// Get the structural key of this layout.
    pub fn key(&self) -> DescriptorSetLayoutKey {
        DescriptorSetLayoutKey {
            flags: self.flags,
            bindings: self.bindings.iter().map(|binding| binding.key()).collect(),
        }
    }

    /// Check the bindings before anything is handed to the driver.
    /// # Errors
    /// - Fails if a binding index is used more than once.
    /// - Fails if a binding has immutable samplers, but not exactly one per descriptor.
    pub(crate) fn check_bindings(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.bindings.len());
        if let Some(binding) = self.bindings.iter().find(|binding| !seen.insert(binding.binding)) {
            return Err(anyhow::Error::from(Error::DuplicateBinding(binding.binding)));
        }
        match self.bindings.iter().find(|binding| {
            !binding.immutable_samplers.is_empty() && binding.immutable_samplers.len() != binding.count as usize
        }) {
            None => Ok(()),
            Some(binding) => Err(anyhow::Error::from(Error::ImmutableSamplerCountMismatch(binding.binding))),
        }
    }
}

impl DescriptorSetLayout {
    /// Get unsafe access to the internal `VkDescriptorSetLayout`.
    /// # Safety
    /// The handle must not be destroyed, and must not be used after this object is dropped.
    pub unsafe fn handle(&self) -> vk::DescriptorSetLayout {
        self.handle
    }
}

impl Resource for DescriptorSetLayout {
    type Key = DescriptorSetLayoutKey;
    type CreateInfo = DescriptorSetLayoutCreateInfo;

    fn key(info: &Self::CreateInfo) -> Self::Key {
        info.key()
    }

    fn create(device: Device, info: &Self::CreateInfo) -> Result<Self> {
        info.check_bindings()?;

        let bindings = info.bindings.iter().map(|binding| binding.to_vk()).collect::<Vec<_>>();
        let binding_flags = info.bindings.iter().map(|binding| binding.flags).collect::<Vec<_>>();
        let mutable_lists = info
            .bindings
            .iter()
            .map(|binding| vk::MutableDescriptorTypeListEXT {
                descriptor_type_count: binding.mutable_types.len() as u32,
                p_descriptor_types: binding.mutable_types.as_ptr(),
            })
            .collect::<Vec<_>>();

        let mut flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo {
            binding_count: binding_flags.len() as u32,
            p_binding_flags: binding_flags.as_ptr(),
            ..Default::default()
        };
        let mut mutable_info = vk::MutableDescriptorTypeCreateInfoEXT {
            mutable_descriptor_type_list_count: mutable_lists.len() as u32,
            p_mutable_descriptor_type_lists: mutable_lists.as_ptr(),
            ..Default::default()
        };

        let mut vk_info = vk::DescriptorSetLayoutCreateInfo::builder()
            .flags(info.flags)
            .bindings(bindings.as_slice());
        if binding_flags.iter().any(|flags| !flags.is_empty()) {
            vk_info = vk_info.push_next(&mut flags_info);
        }
        if info.bindings.iter().any(|binding| !binding.mutable_types.is_empty()) {
            vk_info = vk_info.push_next(&mut mutable_info);
        }

        let handle = unsafe { device.create_descriptor_set_layout(&vk_info)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDescriptorSetLayout {handle:p}");

        Ok(Self {
            device,
            handle,
        })
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkDescriptorSetLayout {:p}", self.handle);
        unsafe {
            self.device.destroy_descriptor_set_layout(self.handle);
        }
    }
}
