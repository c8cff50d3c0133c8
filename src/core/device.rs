//! The device handle used to create and destroy all native descriptor objects.
//!
//! Deimos does not create Vulkan devices itself. Instead, it talks to whatever owns the `VkDevice`
//! through the [`DescriptorBackend`] trait, which covers exactly the part of the device API
//! needed for descriptor management. [`ash::Device`] implements it out of the box:
//!
//! ```ignore
//! use deimos::prelude::*;
//!
//! // `ash_device` was created by your own initialization code.
//! let device = Device::from_ash(ash_device.clone());
//! let mut manager = DescriptorSetManager::new(device.clone());
//! ```

use std::ops::Deref;
use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;

/// The subset of the Vulkan device API used by this crate. Signatures match the corresponding
/// [`ash::Device`] functions, with allocation callbacks omitted.
///
/// # Safety
/// All functions carry the same safety requirements as the Vulkan commands they wrap.
pub trait DescriptorBackend {
    /// `vkCreateDescriptorSetLayout`
    unsafe fn create_descriptor_set_layout(&self, info: &vk::DescriptorSetLayoutCreateInfo) -> VkResult<vk::DescriptorSetLayout>;
    /// `vkDestroyDescriptorSetLayout`
    unsafe fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);
    /// `vkCreatePipelineLayout`
    unsafe fn create_pipeline_layout(&self, info: &vk::PipelineLayoutCreateInfo) -> VkResult<vk::PipelineLayout>;
    /// `vkDestroyPipelineLayout`
    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);
    /// `vkCreateDescriptorPool`
    unsafe fn create_descriptor_pool(&self, info: &vk::DescriptorPoolCreateInfo) -> VkResult<vk::DescriptorPool>;
    /// `vkDestroyDescriptorPool`
    unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);
    /// `vkAllocateDescriptorSets`
    unsafe fn allocate_descriptor_sets(&self, info: &vk::DescriptorSetAllocateInfo) -> VkResult<Vec<vk::DescriptorSet>>;
    /// `vkFreeDescriptorSets`
    unsafe fn free_descriptor_sets(&self, pool: vk::DescriptorPool, sets: &[vk::DescriptorSet]) -> VkResult<()>;
    /// `vkUpdateDescriptorSets`
    unsafe fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet], copies: &[vk::CopyDescriptorSet]);
}

impl DescriptorBackend for ash::Device {
    unsafe fn create_descriptor_set_layout(&self, info: &vk::DescriptorSetLayoutCreateInfo) -> VkResult<vk::DescriptorSetLayout> {
        ash::Device::create_descriptor_set_layout(self, info, None)
    }

    unsafe fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        ash::Device::destroy_descriptor_set_layout(self, layout, None)
    }

    unsafe fn create_pipeline_layout(&self, info: &vk::PipelineLayoutCreateInfo) -> VkResult<vk::PipelineLayout> {
        ash::Device::create_pipeline_layout(self, info, None)
    }

    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        ash::Device::destroy_pipeline_layout(self, layout, None)
    }

    unsafe fn create_descriptor_pool(&self, info: &vk::DescriptorPoolCreateInfo) -> VkResult<vk::DescriptorPool> {
        ash::Device::create_descriptor_pool(self, info, None)
    }

    unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        ash::Device::destroy_descriptor_pool(self, pool, None)
    }

    unsafe fn allocate_descriptor_sets(&self, info: &vk::DescriptorSetAllocateInfo) -> VkResult<Vec<vk::DescriptorSet>> {
        ash::Device::allocate_descriptor_sets(self, info)
    }

    unsafe fn free_descriptor_sets(&self, pool: vk::DescriptorPool, sets: &[vk::DescriptorSet]) -> VkResult<()> {
        ash::Device::free_descriptor_sets(self, pool, sets)
    }

    unsafe fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet], copies: &[vk::CopyDescriptorSet]) {
        ash::Device::update_descriptor_sets(self, writes, copies)
    }
}

/// Handle to the device backend. The backend is reference counted, so this is cheap to clone
/// and can be stored in every object that needs to destroy itself later.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Device {
    #[derivative(Debug = "ignore")]
    inner: Rc<dyn DescriptorBackend>,
}

impl Device {
    /// Wrap any backend implementation.
    pub fn new<B: DescriptorBackend + 'static>(backend: B) -> Self {
        Self {
            inner: Rc::new(backend),
        }
    }

    /// Wrap an existing `ash` device. The caller stays responsible for destroying the `VkDevice`,
    /// and must only do so after every object created through this handle has been dropped.
    pub fn from_ash(device: ash::Device) -> Self {
        Self::new(device)
    }
}

impl Deref for Device {
    type Target = dyn DescriptorBackend;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}
