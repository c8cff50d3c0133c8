//! A reserved descriptor set slot inside a [`DescriptorPoolAllocator`](super::pool_allocator::DescriptorPoolAllocator).

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use ash::vk;

use crate::core::device::Device;
use crate::descriptor::pool_allocator::InternalState;

/// Claim on one slot of one descriptor pool. The slot is given back when this is dropped.
///
/// An allocation keeps the allocator's bookkeeping alive, so it may outlive the allocator itself.
/// In that case all pools are already destroyed and dropping the allocation does nothing.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PoolSetAllocation {
    #[derivative(Debug = "ignore")]
    state: Rc<RefCell<InternalState>>,
    pool_index: u32,
    pool: vk::DescriptorPool,
}

impl PoolSetAllocation {
    pub(super) fn new(state: &Rc<RefCell<InternalState>>) -> Result<Self> {
        let mut inner = state.borrow_mut();
        let pool_index = inner.reserve()?;
        let pool = inner.pool_handle(pool_index);
        drop(inner);
        Ok(Self {
            state: state.clone(),
            pool_index,
            pool,
        })
    }

    /// Index of the pool this slot belongs to. Stable for the lifetime of the allocation.
    pub fn pool_index(&self) -> u32 {
        self.pool_index
    }

    /// Get unsafe access to the pool this slot belongs to.
    /// # Safety
    /// The pool is destroyed when the owning allocator is dropped. Check [`PoolSetAllocation::is_alive`] first.
    pub unsafe fn descriptor_pool(&self) -> vk::DescriptorPool {
        self.pool
    }

    /// Whether the owning allocator still exists.
    pub fn is_alive(&self) -> bool {
        self.state.borrow().is_alive()
    }

    /// Device of the owning allocator, or `None` if it was dropped.
    pub fn device(&self) -> Option<Device> {
        self.state.borrow().device().cloned()
    }
}

impl Drop for PoolSetAllocation {
    fn drop(&mut self) {
        self.state.borrow_mut().release(self.pool_index);
    }
}
