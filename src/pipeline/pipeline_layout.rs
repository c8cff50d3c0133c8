//! Wrapper structs around `VkPipelineLayout` objects.

use anyhow::Result;
use ash::vk;

use crate::core::device::Device;
use crate::util::cache::{Cache, Resource};
use crate::util::hash::InvariantSet;
use crate::util::pnext::raw_slice;

/// Cache of pipeline layouts.
pub type PipelineLayoutCache = Cache<PipelineLayout>;

/// A fully built Vulkan pipeline layout. This is a managed resource, so it cannot be manually
/// created or dropped.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PipelineLayout {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::PipelineLayout,
    set_layouts: Vec<vk::DescriptorSetLayout>,
}

/// Defines a range of Vulkan push constants.
#[derive(Debug, Clone, Default, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    /// Shader stages where this push constant range is used
    pub stage_flags: vk::ShaderStageFlags,
    /// Offset into the global push constant block of this range
    pub offset: u32,
    /// Size of this push constant range
    pub size: u32,
}

/// Define a pipeline layout, this includes all descriptor set layouts and push constant ranges used by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutCreateInfo {
    /// Pipeline layout flags
    pub flags: vk::PipelineLayoutCreateFlags,
    /// Descriptor set layouts for this pipeline layout.
    pub set_layouts: Vec<vk::DescriptorSetLayout>,
    /// Push constant ranges used in this pipeline
    pub push_constants: Vec<PushConstantRange>,
}

/// Structural identity of a pipeline layout. Set layouts and push constant ranges are compared as sets.
#[derive(Debug, Clone)]
pub struct PipelineLayoutKey {
    pub(crate) flags: vk::PipelineLayoutCreateFlags,
    pub(crate) set_layouts: InvariantSet<vk::DescriptorSetLayout>,
    pub(crate) push_constants: InvariantSet<PushConstantRange>,
}

impl PipelineLayout {
    /// Get unsafe access to the internal `VkPipelineLayout`.
    /// # Safety
    /// Any vulkan calls that mutate this pipeline layout may put the system in an undefined state.
    pub unsafe fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }

    /// Get the descriptor set layouts of this pipeline layout, in the order it was created with.
    pub fn set_layouts(&self) -> &[vk::DescriptorSetLayout] {
        self.set_layouts.as_slice()
    }
}

impl PipelineLayoutCreateInfo {
    /// Pipeline layout using only the given descriptor set layouts.
    pub fn from_set_layouts(set_layouts: &[vk::DescriptorSetLayout]) -> Self {
        Self {
            set_layouts: set_layouts.to_vec(),
            ..Default::default()
        }
    }

    /// Pipeline layout with a single descriptor set layout.
    pub fn from_set_layout(set_layout: vk::DescriptorSetLayout) -> Self {
        Self::from_set_layouts(std::slice::from_ref(&set_layout))
    }

    /// Build a description from a raw create info.
    /// # Safety
    /// `info` must be a valid `VkPipelineLayoutCreateInfo`.
    pub unsafe fn from_vk(info: &vk::PipelineLayoutCreateInfo) -> Self {
        Self {
            flags: info.flags,
            set_layouts: raw_slice(info.p_set_layouts, info.set_layout_count).to_vec(),
            push_constants: raw_slice(info.p_push_constant_ranges, info.push_constant_range_count)
                .iter()
                .map(|range| PushConstantRange {
                    stage_flags: range.stage_flags,
                    offset: range.offset,
                    size: range.size,
                })
                .collect(),
        }
    }

    /// Get the structural key of this pipeline layout.
    pub fn key(&self) -> PipelineLayoutKey {
        PipelineLayoutKey {
            flags: self.flags,
            set_layouts: self.set_layouts.iter().copied().collect(),
            push_constants: self.push_constants.iter().copied().collect(),
        }
    }
}

impl Resource for PipelineLayout {
    type Key = PipelineLayoutKey;
    type CreateInfo = PipelineLayoutCreateInfo;

    fn key(info: &Self::CreateInfo) -> Self::Key {
        info.key()
    }

    fn create(device: Device, info: &Self::CreateInfo) -> Result<Self> {
        let pc = info.push_constants.iter().map(|pc| pc.to_vk()).collect::<Vec<_>>();
        let vk_info = vk::PipelineLayoutCreateInfo::builder()
            .flags(info.flags)
            .push_constant_ranges(pc.as_slice())
            .set_layouts(info.set_layouts.as_slice());

        let handle = unsafe { device.create_pipeline_layout(&vk_info)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkPipelineLayout {handle:p}");

        Ok(Self {
            device,
            handle,
            set_layouts: info.set_layouts.clone(),
        })
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkPipelineLayout {:p}", self.handle);
        unsafe {
            self.device.destroy_pipeline_layout(self.handle);
        }
    }
}

impl PushConstantRange {
    pub fn to_vk(&self) -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: self.stage_flags,
            offset: self.offset,
            size: self.size,
        }
    }
}
