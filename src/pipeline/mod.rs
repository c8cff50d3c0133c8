//! Layout objects shared between pipelines and descriptor sets.
//!
//! Both [`DescriptorSetLayout`](set_layout::DescriptorSetLayout) and
//! [`PipelineLayout`](pipeline_layout::PipelineLayout) are immutable once created, and a renderer
//! only ever needs a handful of distinct ones. They are therefore stored in a
//! [`Cache`](crate::util::cache::Cache) keyed by structure, and handed out as shared handles.
//!
//! # Example
//! ```ignore
//! use deimos::prelude::*;
//!
//! let mut set_layouts = DescriptorSetLayoutCache::new(device.clone());
//! let mut pipeline_layouts = PipelineLayoutCache::new(device.clone());
//! let set_layout = set_layouts.get_or_create(&DescriptorSetLayoutCreateInfo::new(vec![
//!     DescriptorBinding::new(0, vk::DescriptorType::STORAGE_BUFFER, 1, vk::ShaderStageFlags::COMPUTE),
//! ]))?;
//! let info = PipelineLayoutCreateInfo::from_set_layout(unsafe { set_layout.handle() });
//! let pipeline_layout = pipeline_layouts.get_or_create(&info)?;
//! ```

pub mod hash;
pub mod pipeline_layout;
pub mod set_layout;
