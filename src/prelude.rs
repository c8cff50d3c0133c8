pub use ash::vk;

pub use crate::core::device::{DescriptorBackend, Device};
pub use crate::core::error::Error;

pub use crate::util::cache::{Cache, Resource};
pub use crate::util::hash::InvariantSet;
pub use crate::util::pnext::PNext;

pub use crate::pipeline::pipeline_layout::{PipelineLayout, PipelineLayoutCache, PipelineLayoutCreateInfo, PushConstantRange};
pub use crate::pipeline::set_layout::{DescriptorBinding, DescriptorSetLayout, DescriptorSetLayoutCache, DescriptorSetLayoutCreateInfo};

pub use crate::descriptor::allocation::PoolSetAllocation;
pub use crate::descriptor::descriptor_pool::{DescriptorPoolCreateInfo, DescriptorPoolSize};
pub use crate::descriptor::descriptor_set::{buffer_descriptor_type, ManagedDescriptorSet};
pub use crate::descriptor::manager::DescriptorSetManager;
pub use crate::descriptor::pool_allocator::{DescriptorPoolAllocator, DEFAULT_POOL_CAPACITY};
pub use crate::descriptor::registry::DescriptorPoolRegistry;
