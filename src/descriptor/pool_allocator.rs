//! Bucketed free-list allocator over fixed-capacity descriptor pools.
//!
//! A [`DescriptorPoolAllocator`] serves descriptor sets of a single pool shape. It owns a growing
//! list of native pools that each hold [`DEFAULT_POOL_CAPACITY`] sets, and keeps every pool in a
//! bucket according to its number of free slots. Reserving a slot always picks a pool from the
//! fullest-free bucket, so allocations concentrate in pools that are already mostly empty. Pools
//! that get all of their slots back are destroyed once at least one more pool's worth of free
//! slots exists elsewhere.
//!
//! Pool indices are stable. A destroyed pool leaves a hole in the index space that is never reused,
//! because outstanding [`PoolSetAllocation`]s refer to their pool by index.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

use anyhow::Result;
use ash::vk;

use crate::core::device::Device;
use crate::core::error::Error;
use crate::descriptor::allocation::PoolSetAllocation;
use crate::descriptor::descriptor_pool::{DescriptorPool, DescriptorPoolCreateInfo};

/// Number of descriptor sets in every pool created by the allocator.
pub const DEFAULT_POOL_CAPACITY: u32 = 32;

/// Bookkeeping shared between an allocator and all of its outstanding allocations.
#[derive(Derivative)]
#[derivative(Debug)]
pub(super) struct InternalState {
    /// `None` once the owning allocator was dropped.
    #[derivative(Debug = "ignore")]
    device: Option<Device>,
    info: DescriptorPoolCreateInfo,
    capacity: u32,
    pools: Vec<Option<DescriptorPool>>,
    remaining: Vec<u32>,
    /// `availability[n]` holds the indices of all live pools with exactly `n` free slots.
    availability: Vec<BTreeSet<u32>>,
    highest_availability: u32,
    total_remaining: u32,
    released: HashSet<u32>,
}

/// Allocates descriptor set slots from a self-managing collection of descriptor pools.
///
/// Not thread safe: the allocator and every allocation made from it must stay on one thread.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorPoolAllocator {
    #[derivative(Debug = "ignore")]
    device: Device,
    state: Rc<RefCell<InternalState>>,
}

impl InternalState {
    fn new(device: Device, info: DescriptorPoolCreateInfo, capacity: u32) -> Self {
        Self {
            device: Some(device),
            info,
            capacity,
            pools: Vec::new(),
            remaining: Vec::new(),
            availability: vec![BTreeSet::new(); capacity as usize + 1],
            highest_availability: 0,
            total_remaining: 0,
            released: HashSet::new(),
        }
    }

    pub(super) fn is_alive(&self) -> bool {
        self.device.is_some()
    }

    pub(super) fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    /// Native handle of the pool at `index`, or a null handle if it was torn down.
    pub(super) fn pool_handle(&self, index: u32) -> vk::DescriptorPool {
        match self.pools.get(index as usize) {
            Some(Some(pool)) => unsafe { pool.handle() },
            _ => vk::DescriptorPool::null(),
        }
    }

    fn create_pool(&mut self) -> Result<()> {
        let Some(device) = self.device.clone() else {
            return Err(anyhow::Error::from(Error::AllocatorDestroyed));
        };
        let pool = DescriptorPool::new(device, &self.info, self.capacity)?;

        // The current length is the index of the new pool. Holes are never filled.
        let index = self.pools.len() as u32;
        self.pools.push(Some(pool));
        self.remaining.push(self.capacity);
        self.availability[self.capacity as usize].insert(index);
        self.highest_availability = self.capacity;
        self.total_remaining += self.capacity;
        debug!("Created descriptor pool {index} for {}", self.info);
        Ok(())
    }

    /// Reserve one set slot and return the index of the pool it belongs to.
    pub(super) fn reserve(&mut self) -> Result<u32> {
        if self.highest_availability == 0 {
            self.create_pool()?;
        }

        let level = self.highest_availability as usize;
        let Some(index) = self.availability[level].pop_first() else {
            return Err(anyhow::Error::from(Error::Uncategorized("descriptor pool availability out of sync")));
        };
        self.availability[level - 1].insert(index);
        self.remaining[index as usize] -= 1;
        self.total_remaining -= 1;
        if self.availability[level].is_empty() {
            self.highest_availability -= 1;
        }
        Ok(index)
    }

    /// Give a slot back to the pool at `index`. Does nothing once the allocator was dropped.
    pub(super) fn release(&mut self, index: u32) {
        if !self.is_alive() {
            return;
        }

        let slot = index as usize;
        let remaining = self.remaining[slot];
        debug_assert!(!self.released.contains(&index), "released slot of destroyed descriptor pool {index}");
        debug_assert!(remaining < self.capacity, "descriptor pool {index} released more slots than it has");
        if self.released.contains(&index) || remaining >= self.capacity {
            return;
        }

        self.availability[remaining as usize].remove(&index);
        let remaining = remaining + 1;
        self.availability[remaining as usize].insert(index);
        self.remaining[slot] = remaining;
        self.total_remaining += 1;

        // Only a pool that got all of its sets back can go, and only if enough slack remains elsewhere.
        if remaining == self.capacity && self.total_remaining >= self.capacity.saturating_mul(2) {
            self.availability[remaining as usize].remove(&index);
            self.remaining[slot] = 0;
            self.total_remaining -= self.capacity;
            self.released.insert(index);
            self.pools[slot] = None;
            debug!("Released descriptor pool {index} for {}", self.info);

            while self.highest_availability > 0 && self.availability[self.highest_availability as usize].is_empty() {
                self.highest_availability -= 1;
            }
        } else {
            self.highest_availability = self.highest_availability.max(remaining);
        }
    }

    /// Destroy all pools. Outstanding allocations turn into no-ops.
    fn destroy(&mut self) {
        self.pools.clear();
        self.availability.iter_mut().for_each(|bucket| bucket.clear());
        self.highest_availability = 0;
        self.total_remaining = 0;
        self.device = None;
    }
}

impl DescriptorPoolAllocator {
    /// Create an allocator for pools of the given shape. No pool is created until the first allocation.
    pub fn new(device: Device, info: DescriptorPoolCreateInfo) -> Self {
        Self::with_capacity(device, info, DEFAULT_POOL_CAPACITY)
    }

    /// Create an allocator whose pools hold `capacity` sets each. A capacity of zero is treated as one.
    /// Pools are always created with `FREE_DESCRIPTOR_SET`, since every slot goes back to its pool
    /// on its own.
    pub fn with_capacity(device: Device, mut info: DescriptorPoolCreateInfo, capacity: u32) -> Self {
        let capacity = capacity.max(1);
        info.flags |= vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET;
        Self {
            state: Rc::new(RefCell::new(InternalState::new(device.clone(), info, capacity))),
            device,
        }
    }

    /// Reserve a slot for one descriptor set. Creates a new pool if all existing pools are full.
    /// # Errors
    /// - Fails if a new pool was needed and creating it failed.
    pub fn allocate(&mut self) -> Result<PoolSetAllocation> {
        PoolSetAllocation::new(&self.state)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Shape of the pools this allocator creates.
    pub fn info(&self) -> DescriptorPoolCreateInfo {
        self.state.borrow().info.clone()
    }

    /// Number of sets every pool can hold.
    pub fn capacity(&self) -> u32 {
        self.state.borrow().capacity
    }

    /// Number of pool indices ever handed out, including destroyed pools.
    pub fn pool_count(&self) -> usize {
        self.state.borrow().pools.len()
    }

    /// Number of pools currently alive.
    pub fn live_pool_count(&self) -> usize {
        self.state.borrow().pools.iter().filter(|pool| pool.is_some()).count()
    }

    /// Total number of free slots over all live pools.
    pub fn total_remaining(&self) -> u32 {
        self.state.borrow().total_remaining
    }

    /// Free slots in the pool at `index`. Destroyed or unknown pools report zero.
    pub fn remaining(&self, index: u32) -> u32 {
        self.state.borrow().remaining.get(index as usize).copied().unwrap_or(0)
    }

    /// The largest number of free slots any live pool has.
    pub fn highest_availability(&self) -> u32 {
        self.state.borrow().highest_availability
    }

    /// Whether the pool at `index` was destroyed.
    pub fn is_released(&self, index: u32) -> bool {
        self.state.borrow().released.contains(&index)
    }
}

impl Drop for DescriptorPoolAllocator {
    fn drop(&mut self) {
        self.state.borrow_mut().destroy();
    }
}
