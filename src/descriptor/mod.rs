//! This module handles everything related to descriptor sets.
//!
//! The main entry point is [`DescriptorSetManager`](manager::DescriptorSetManager). Given the layout
//! description of a descriptor set, it resolves the cached layout object, finds the pool allocator
//! for the layout's descriptor counts and returns a [`ManagedDescriptorSet`](descriptor_set::ManagedDescriptorSet)
//! that cleans up after itself.
//!
//! Descriptor pools are completely managed for you. Sets with the same descriptor counts share a
//! [`DescriptorPoolAllocator`](pool_allocator::DescriptorPoolAllocator), which grows by adding
//! pools of 32 sets and destroys pools again once they become empty and enough free space remains.
//!
//! # Example
//!
//! ```ignore
//! use deimos::prelude::*;
//!
//! let mut manager = DescriptorSetManager::new(device.clone());
//! let set = manager.allocate_descriptor_set(&DescriptorSetLayoutCreateInfo::new(vec![
//!     // In GLSL: layout(set = X, binding = 0) uniform sampler2D tex;
//!     DescriptorBinding::new(0, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, vk::ShaderStageFlags::FRAGMENT),
//! ]))?;
//! set.write_sampled_image(0, my_image_view, my_sampler)?;
//! ```
//!
//! # Threading
//!
//! Nothing in this module is thread safe, and none of the types are `Send`. A single owner thread
//! is expected to make all calls and to drop all sets.

pub mod allocation;
pub mod descriptor_pool;
pub mod descriptor_set;
pub mod manager;
pub mod pool_allocator;
pub mod registry;
