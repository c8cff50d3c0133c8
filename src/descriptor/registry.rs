//! Lookup of the pool allocator responsible for a pool shape.

use std::collections::HashMap;

use crate::core::device::Device;
use crate::descriptor::descriptor_pool::{DescriptorPoolCreateInfo, DescriptorPoolKey};
use crate::descriptor::pool_allocator::DescriptorPoolAllocator;

/// Maps every pool shape ever requested to its own [`DescriptorPoolAllocator`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorPoolRegistry {
    #[derivative(Debug = "ignore")]
    device: Device,
    allocators: HashMap<DescriptorPoolKey, DescriptorPoolAllocator>,
}

impl DescriptorPoolRegistry {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            allocators: HashMap::new(),
        }
    }

    /// Get the allocator for pools of the given shape, registering a new one if this shape was never seen.
    pub fn get_allocator(&mut self, info: &DescriptorPoolCreateInfo) -> &mut DescriptorPoolAllocator {
        self.allocators.entry(info.key()).or_insert_with(|| {
            debug!("Registering descriptor pool allocator for {info}");
            DescriptorPoolAllocator::new(self.device.clone(), info.clone())
        })
    }

    /// Get the allocator for a pool shape without registering one.
    pub fn find_allocator(&self, info: &DescriptorPoolCreateInfo) -> Option<&DescriptorPoolAllocator> {
        self.allocators.get(&info.key())
    }

    /// Number of distinct pool shapes registered.
    pub fn len(&self) -> usize {
        self.allocators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocators.is_empty()
    }
}
