//! Descriptor set allocation and layout caching for Vulkan
//!
//! Deimos takes care of everything between "this shader needs these bindings" and a ready-to-use
//! `VkDescriptorSet`. It caches descriptor set layouts and pipeline layouts by structure, so equal
//! descriptions share one native object, and it allocates descriptor sets from self-managing pools
//! that grow and shrink with demand.
//!
//! To get started, import the prelude
//! ```ignore
//! use deimos::prelude::*;
//! ```
//!
//! # Example
//!
//! Deimos does not create the Vulkan device. Wrap the `ash::Device` you already have:
//! ```ignore
//! use deimos::prelude::*;
//!
//! let device = Device::from_ash(ash_device.clone());
//! let mut manager = DescriptorSetManager::new(device.clone());
//! let info = DescriptorSetLayoutCreateInfo::new(vec![
//!     DescriptorBinding::new(0, vk::DescriptorType::UNIFORM_BUFFER, 1, vk::ShaderStageFlags::VERTEX),
//! ]);
//! let set = manager.allocate_descriptor_set(&info)?;
//! set.write_buffer(0, vk::DescriptorType::UNIFORM_BUFFER, camera_buffer, 0, vk::WHOLE_SIZE)?;
//! // The set is freed and its pool slot returned when `set` is dropped.
//! ```
//!
//! For further example code, check out the following modules
//! - [`descriptor`] for descriptor set allocation and pool management.
//! - [`pipeline`] for descriptor set layout and pipeline layout caching.
//! - [`util`] for the structural hashing and pNext chain utilities the caches are built on.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod core;
pub mod descriptor;
pub mod pipeline;
pub mod util;
