use anyhow::Result;
use ash::vk;

use crate::core::device::Device;
use crate::core::error::Error;
use crate::descriptor::descriptor_pool::DescriptorPoolCreateInfo;
use crate::descriptor::descriptor_set::ManagedDescriptorSet;
use crate::descriptor::registry::DescriptorPoolRegistry;
use crate::pipeline::set_layout::{DescriptorSetLayoutCache, DescriptorSetLayoutCreateInfo};

/// Entry point for descriptor set allocation. Combines a [`DescriptorSetLayoutCache`] with a
/// [`DescriptorPoolRegistry`], so a descriptor set can be requested from nothing but its layout description.
///
/// Not thread safe. All calls, and all drops of the returned sets, must happen on the same thread.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorSetManager {
    #[derivative(Debug = "ignore")]
    device: Device,
    set_layouts: DescriptorSetLayoutCache,
    pools: DescriptorPoolRegistry,
}

static_assertions::assert_not_impl_any!(DescriptorSetManager: Send, Sync);
static_assertions::assert_not_impl_any!(ManagedDescriptorSet: Send, Sync);

impl DescriptorSetManager {
    /// Create a new descriptor set manager. No native objects are created until the first allocation.
    pub fn new(device: Device) -> Self {
        Self {
            set_layouts: DescriptorSetLayoutCache::new(device.clone()),
            pools: DescriptorPoolRegistry::new(device.clone()),
            device,
        }
    }

    /// Allocate a descriptor set for the given layout. The layout is looked up in (or added to) the
    /// layout cache, and the set is allocated from the pool allocator matching the layout's descriptor counts.
    /// # Errors
    /// - Fails if `info` has no bindings, declares a binding index twice, or gives a binding a
    ///   number of immutable samplers other than its descriptor count.
    /// - Fails if creating the layout, a new pool or the descriptor set itself fails.
    pub fn allocate_descriptor_set(&mut self, info: &DescriptorSetLayoutCreateInfo) -> Result<ManagedDescriptorSet> {
        if info.bindings.is_empty() {
            return Err(anyhow::Error::from(Error::EmptyDescriptorBinding));
        }
        info.check_bindings()?;

        let layout = self.set_layouts.get_or_create(info)?;
        let shape = DescriptorPoolCreateInfo::from_layout(info);
        let allocation = self.pools.get_allocator(&shape).allocate()?;
        ManagedDescriptorSet::new(allocation, layout)
    }

    /// Allocate a descriptor set for a layout with the given bindings and no flags.
    /// # Safety
    /// Immutable sampler pointers in `bindings` must be null or point to `descriptor_count` samplers.
    pub unsafe fn allocate_with_bindings(&mut self, bindings: &[vk::DescriptorSetLayoutBinding]) -> Result<ManagedDescriptorSet> {
        self.allocate_descriptor_set(&DescriptorSetLayoutCreateInfo::from_bindings(bindings))
    }

    /// Allocate a descriptor set from a raw layout create info, including its pNext chain.
    /// # Safety
    /// `info` must be a valid `VkDescriptorSetLayoutCreateInfo`.
    pub unsafe fn allocate_from_vk(&mut self, info: &vk::DescriptorSetLayoutCreateInfo) -> Result<ManagedDescriptorSet> {
        self.allocate_descriptor_set(&DescriptorSetLayoutCreateInfo::from_vk(info))
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Access the layout cache, for example to erase layouts that will not be used again.
    pub fn set_layouts(&mut self) -> &mut DescriptorSetLayoutCache {
        &mut self.set_layouts
    }

    /// Access the pool allocators.
    pub fn pools(&self) -> &DescriptorPoolRegistry {
        &self.pools
    }
}
