use anyhow::Result;
use ash::vk;

use deimos::{DescriptorPoolAllocator, DescriptorPoolCreateInfo, DescriptorPoolSize, PoolSetAllocation, DEFAULT_POOL_CAPACITY};

mod framework;

const CAPACITY: u32 = 4;

fn uniform_pool() -> DescriptorPoolCreateInfo {
    DescriptorPoolCreateInfo {
        flags: vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET,
        sizes: vec![DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            count: 2,
            mutable_types: vec![],
        }],
        max_inline_uniform_block_bindings: 0,
    }
}

fn allocate_n(allocator: &mut DescriptorPoolAllocator, n: u32) -> Result<Vec<PoolSetAllocation>> {
    (0..n).map(|_| allocator.allocate()).collect()
}

#[test]
pub fn no_pool_before_first_allocation() {
    let (device, state) = framework::make_device();
    let allocator = DescriptorPoolAllocator::new(device, uniform_pool());
    assert_eq!(allocator.capacity(), DEFAULT_POOL_CAPACITY);
    assert_eq!(allocator.pool_count(), 0);
    assert_eq!(allocator.total_remaining(), 0);
    assert_eq!(state.borrow().pools_created, 0);
}

#[test]
pub fn pools_are_created_with_scaled_sizes() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::new(device, uniform_pool());
    let _allocation = allocator.allocate()?;

    let state = state.borrow();
    let record = state.last_pool.as_ref().expect("A pool should have been created");
    assert_eq!(record.max_sets, DEFAULT_POOL_CAPACITY);
    assert_eq!(record.sizes, vec![(vk::DescriptorType::UNIFORM_BUFFER, 2 * DEFAULT_POOL_CAPACITY)]);
    assert!(record.flags.contains(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET));
    assert!(record.mutable_types.is_none());
    assert!(record.inline_uniform_block_bindings.is_none());
    Ok(())
}

#[test]
pub fn grows_only_when_full() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, uniform_pool(), CAPACITY);

    let first = allocate_n(&mut allocator, CAPACITY)?;
    assert!(first.iter().all(|allocation| allocation.pool_index() == 0));
    assert_eq!(allocator.pool_count(), 1);
    assert_eq!(allocator.total_remaining(), 0);
    assert_eq!(allocator.highest_availability(), 0);

    let overflow = allocator.allocate()?;
    assert_eq!(overflow.pool_index(), 1);
    assert_eq!(allocator.pool_count(), 2);
    assert_eq!(allocator.total_remaining(), CAPACITY - 1);
    assert_eq!(allocator.highest_availability(), CAPACITY - 1);
    assert_eq!(state.borrow().pools_created, 2);
    Ok(())
}

#[test]
pub fn prefers_pool_with_most_free_slots() -> Result<()> {
    let (device, _state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, uniform_pool(), CAPACITY);

    let mut allocations = allocate_n(&mut allocator, CAPACITY + 1)?;
    // Pool 0 gets two slots back and now has 2 free, pool 1 still has 3 free.
    allocations.drain(0..2).for_each(drop);
    assert_eq!(allocator.remaining(0), 2);
    assert_eq!(allocator.remaining(1), CAPACITY - 1);

    let next = allocator.allocate()?;
    assert_eq!(next.pool_index(), 1);
    Ok(())
}

#[test]
pub fn empty_pool_is_kept_without_enough_slack() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, uniform_pool(), CAPACITY);

    let mut allocations = allocate_n(&mut allocator, CAPACITY + 1)?;
    let overflow = allocations.pop().expect("Allocated one more than capacity");
    drop(allocations);

    // Pool 0 is completely free, but only CAPACITY - 1 slots remain elsewhere.
    assert_eq!(allocator.remaining(0), CAPACITY);
    assert_eq!(allocator.total_remaining(), 2 * CAPACITY - 1);
    assert!(!allocator.is_released(0));
    assert_eq!(allocator.live_pool_count(), 2);
    assert_eq!(state.borrow().pools_destroyed, 0);

    // Now pool 1 empties as well, and one pool's worth of free slots is enough to release it.
    drop(overflow);
    assert!(allocator.is_released(1));
    assert!(!allocator.is_released(0));
    assert_eq!(allocator.live_pool_count(), 1);
    assert_eq!(allocator.total_remaining(), CAPACITY);
    assert_eq!(allocator.remaining(1), 0);
    assert_eq!(allocator.highest_availability(), CAPACITY);
    assert_eq!(state.borrow().pools_destroyed, 1);
    Ok(())
}

#[test]
pub fn released_indices_are_never_reused() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, uniform_pool(), CAPACITY);

    let mut allocations = allocate_n(&mut allocator, CAPACITY + 1)?;
    allocations.clear();
    assert!(allocator.is_released(1));

    // Refill pool 0, then overflow again. The new pool gets a fresh index.
    let refill = allocate_n(&mut allocator, CAPACITY)?;
    assert!(refill.iter().all(|allocation| allocation.pool_index() == 0));
    let overflow = allocator.allocate()?;
    assert_eq!(overflow.pool_index(), 2);
    assert_eq!(allocator.pool_count(), 3);
    assert_eq!(allocator.live_pool_count(), 2);
    assert_eq!(state.borrow().pools_created, 3);
    Ok(())
}

#[test]
pub fn accounting_round_trips() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, uniform_pool(), CAPACITY);

    let mut allocations = allocate_n(&mut allocator, 2 * CAPACITY + 2)?;
    assert_eq!(allocator.pool_count(), 3);
    assert_eq!(allocator.total_remaining(), CAPACITY - 2);

    for allocation in allocations.drain(..) {
        drop(allocation);
        let live = allocator.live_pool_count() as u32;
        let sum = (0..allocator.pool_count() as u32)
            .map(|index| allocator.remaining(index))
            .sum::<u32>();
        assert_eq!(allocator.total_remaining(), sum, "Total must equal the sum over live pools");
        assert!(allocator.total_remaining() <= live * CAPACITY);
    }

    // Pool 0 emptied first and stayed, pools 1 and 2 had enough slack to go.
    assert_eq!(allocator.live_pool_count(), 1);
    assert!(allocator.is_released(1));
    assert!(allocator.is_released(2));
    assert_eq!(allocator.total_remaining(), CAPACITY);
    assert_eq!(state.borrow().pools_destroyed, 2);
    Ok(())
}

#[test]
pub fn allocations_outlive_allocator() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, uniform_pool(), CAPACITY);

    let allocations = allocate_n(&mut allocator, CAPACITY + 1)?;
    assert!(allocations.iter().all(|allocation| allocation.is_alive()));
    drop(allocator);

    assert_eq!(state.borrow().pools_destroyed, 2, "Dropping the allocator destroys all pools");
    assert!(allocations.iter().all(|allocation| !allocation.is_alive()));
    assert!(allocations.iter().all(|allocation| allocation.device().is_none()));
    drop(allocations);
    assert_eq!(state.borrow().pools_destroyed, 2);
    assert_eq!(state.borrow().live_sets(), 0);
    assert_eq!(state.borrow().invalid_calls, 0);
    Ok(())
}

#[test]
pub fn failed_pool_creation_reserves_nothing() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, uniform_pool(), CAPACITY);

    state.borrow_mut().fail_pool_creation = true;
    let err = allocator.allocate().expect_err("Pool creation should fail");
    assert_eq!(err.downcast_ref::<vk::Result>(), Some(&vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
    assert_eq!(allocator.pool_count(), 0);
    assert_eq!(allocator.total_remaining(), 0);

    state.borrow_mut().fail_pool_creation = false;
    let allocation = allocator.allocate()?;
    assert_eq!(allocation.pool_index(), 0);
    Ok(())
}

#[test]
pub fn zero_capacity_is_clamped() -> Result<()> {
    let (device, _state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, uniform_pool(), 0);
    assert_eq!(allocator.capacity(), 1);

    let a = allocator.allocate()?;
    let b = allocator.allocate()?;
    assert_eq!((a.pool_index(), b.pool_index()), (0, 1));
    Ok(())
}

#[test]
pub fn allocations_carry_pool_handle() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, uniform_pool(), CAPACITY);

    let allocation = allocator.allocate()?;
    let pool = unsafe { allocation.descriptor_pool() };
    assert_ne!(pool, vk::DescriptorPool::null());
    assert!(state.borrow().pools.contains_key(&ash::vk::Handle::as_raw(pool)));
    Ok(())
}

#[test]
pub fn pools_always_allow_freeing_sets() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut info = uniform_pool();
    info.flags = vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND;
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, info, CAPACITY);
    assert_eq!(
        allocator.info().flags,
        vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND | vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET
    );

    let _allocation = allocator.allocate()?;
    let state = state.borrow();
    let record = state.last_pool.as_ref().expect("A pool should have been created");
    assert!(record.flags.contains(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET));
    assert!(record.flags.contains(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND));
    Ok(())
}

#[test]
pub fn zero_sized_entries_are_not_sent_to_the_driver() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut info = uniform_pool();
    info.sizes.push(DescriptorPoolSize {
        ty: vk::DescriptorType::STORAGE_IMAGE,
        count: 0,
        mutable_types: vec![],
    });
    let mut allocator = DescriptorPoolAllocator::with_capacity(device, info, CAPACITY);
    let _allocation = allocator.allocate()?;

    let state = state.borrow();
    let record = state.last_pool.as_ref().expect("A pool should have been created");
    assert_eq!(record.sizes, vec![(vk::DescriptorType::UNIFORM_BUFFER, 2 * CAPACITY)]);
    Ok(())
}

#[test]
pub fn default_capacity_growth_boundary() -> Result<()> {
    let (device, _state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::new(device, uniform_pool());
    let c = DEFAULT_POOL_CAPACITY;

    let mut allocations = allocate_n(&mut allocator, c)?;
    assert!(allocations.iter().all(|allocation| allocation.pool_index() == 0));
    allocations.push(allocator.allocate()?);
    assert_eq!(allocations.last().map(|allocation| allocation.pool_index()), Some(1));
    assert_eq!(allocator.total_remaining(), 2 * c - (c + 1));
    Ok(())
}

#[test]
pub fn full_pool_is_released_once_a_whole_pool_is_spare() -> Result<()> {
    let (device, state) = framework::make_device();
    let mut allocator = DescriptorPoolAllocator::new(device, uniform_pool());
    let c = DEFAULT_POOL_CAPACITY;

    let mut first = allocate_n(&mut allocator, c)?;
    let second = allocator.allocate()?;
    drop(second);
    // Pool 1 is completely free but stays, nothing else has spare slots.
    assert!(!allocator.is_released(1));
    assert_eq!(allocator.total_remaining(), c);

    while first.len() > 1 {
        first.pop();
        assert!(!allocator.is_released(0));
    }
    assert_eq!(allocator.total_remaining(), 2 * c - 1);

    // The last release brings the total to exactly two pools' worth.
    first.pop();
    assert!(allocator.is_released(0));
    assert!(!allocator.is_released(1));
    assert_eq!(allocator.total_remaining(), c);
    assert_eq!(allocator.live_pool_count(), 1);
    assert_eq!(state.borrow().pools_destroyed, 1);

    // Further cycles only ever use pool 1 or brand new pools.
    for _ in 0..3 {
        let batch = allocate_n(&mut allocator, c + 1)?;
        assert!(batch.iter().all(|allocation| allocation.pool_index() != 0));
    }
    Ok(())
}
