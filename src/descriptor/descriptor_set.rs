use std::rc::Rc;

use anyhow::Result;
use ash::vk;

use crate::core::error::Error;
use crate::descriptor::allocation::PoolSetAllocation;
use crate::pipeline::set_layout::DescriptorSetLayout;

/// A descriptor set together with the pool slot it was allocated from. Dropping it frees the set
/// (if its pool allows freeing individual sets) and then gives the slot back.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ManagedDescriptorSet {
    handle: vk::DescriptorSet,
    #[derivative(Debug = "ignore")]
    layout: Rc<DescriptorSetLayout>,
    // Must stay the last field, the slot is released after the set is freed.
    allocation: PoolSetAllocation,
}

/// Pick the descriptor type matching a buffer's usage, or `None` if the usage does not map to
/// exactly one buffer descriptor type.
pub fn buffer_descriptor_type(usage: vk::BufferUsageFlags) -> Option<vk::DescriptorType> {
    let descriptor_usage = usage
        & (vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER
            | vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER
            | vk::BufferUsageFlags::UNIFORM_BUFFER
            | vk::BufferUsageFlags::STORAGE_BUFFER);
    [
        (vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER, vk::DescriptorType::UNIFORM_TEXEL_BUFFER),
        (vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER, vk::DescriptorType::STORAGE_TEXEL_BUFFER),
        (vk::BufferUsageFlags::UNIFORM_BUFFER, vk::DescriptorType::UNIFORM_BUFFER),
        (vk::BufferUsageFlags::STORAGE_BUFFER, vk::DescriptorType::STORAGE_BUFFER),
    ]
    .into_iter()
    .find(|(flags, _)| *flags == descriptor_usage)
    .map(|(_, ty)| ty)
}

impl ManagedDescriptorSet {
    /// Allocate a descriptor set with the given layout in the pool slot reserved by `allocation`.
    /// # Errors
    /// - Fails if the allocator owning `allocation` was dropped.
    /// - Fails if the native allocation fails. The slot is released in that case.
    pub fn new(allocation: PoolSetAllocation, layout: Rc<DescriptorSetLayout>) -> Result<Self> {
        let device = allocation
            .device()
            .ok_or_else(|| anyhow::Error::from(Error::AllocatorDestroyed))?;
        let set_layout = unsafe { layout.handle() };
        let info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(unsafe { allocation.descriptor_pool() })
            .set_layouts(std::slice::from_ref(&set_layout));

        let handle = unsafe { device.allocate_descriptor_sets(&info)? }
            .first()
            .copied()
            .ok_or_else(|| anyhow::Error::from(Error::NoDescriptorSetAllocated))?;
        #[cfg(feature = "log-objects")]
        trace!("Allocated new VkDescriptorSet {handle:p}");

        Ok(Self {
            handle,
            layout,
            allocation,
        })
    }

    /// Get unsafe access to the internal `VkDescriptorSet`.
    /// # Safety
    /// The set must not be freed manually, and must not be used after this object is dropped.
    pub unsafe fn handle(&self) -> vk::DescriptorSet {
        self.handle
    }

    /// The layout this set was allocated with.
    pub fn layout(&self) -> &Rc<DescriptorSetLayout> {
        &self.layout
    }

    /// The pool slot backing this set.
    pub fn allocation(&self) -> &PoolSetAllocation {
        &self.allocation
    }

    /// Write a single buffer descriptor to array element 0 of `binding`.
    /// # Errors
    /// - Fails if the allocator owning this set was dropped.
    pub fn write_buffer(
        &self,
        binding: u32,
        ty: vk::DescriptorType,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> Result<()> {
        let info = vk::DescriptorBufferInfo {
            buffer,
            offset,
            range,
        };
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(self.handle)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(ty)
            .buffer_info(std::slice::from_ref(&info))
            .build();
        self.update(&write)
    }

    /// Write a single image descriptor to array element 0 of `binding`.
    /// # Errors
    /// - Fails if the allocator owning this set was dropped.
    pub fn write_image(
        &self,
        binding: u32,
        ty: vk::DescriptorType,
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    ) -> Result<()> {
        let info = vk::DescriptorImageInfo {
            sampler,
            image_view: view,
            image_layout: layout,
        };
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(self.handle)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(ty)
            .image_info(std::slice::from_ref(&info))
            .build();
        self.update(&write)
    }

    /// Write a combined image sampler in `SHADER_READ_ONLY_OPTIMAL` layout.
    pub fn write_sampled_image(&self, binding: u32, view: vk::ImageView, sampler: vk::Sampler) -> Result<()> {
        self.write_image(
            binding,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            view,
            sampler,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
    }

    fn update(&self, write: &vk::WriteDescriptorSet) -> Result<()> {
        let device = self
            .allocation
            .device()
            .ok_or_else(|| anyhow::Error::from(Error::AllocatorDestroyed))?;
        unsafe {
            device.update_descriptor_sets(std::slice::from_ref(write), &[]);
        }
        Ok(())
    }
}

impl Drop for ManagedDescriptorSet {
    fn drop(&mut self) {
        // Without a device the pool is already gone, and the set with it.
        let Some(device) = self.allocation.device() else {
            return;
        };
        #[cfg(feature = "log-objects")]
        trace!("Freeing VkDescriptorSet {:p}", self.handle);
        let result = unsafe { device.free_descriptor_sets(self.allocation.descriptor_pool(), std::slice::from_ref(&self.handle)) };
        if let Err(err) = result {
            warn!("Failed to free descriptor set: {err}");
        }
    }
}
