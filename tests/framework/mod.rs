// Each test binary uses a different part of the mock.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;

use deimos::util::pnext::{read_chain, PNext};
use deimos::{DescriptorBackend, Device};

/// What the mock saw in the last `vkCreateDescriptorPool` call.
#[derive(Debug, Clone)]
pub struct PoolRecord {
    pub flags: vk::DescriptorPoolCreateFlags,
    pub max_sets: u32,
    pub sizes: Vec<(vk::DescriptorType, u32)>,
    pub mutable_types: Option<Vec<Vec<vk::DescriptorType>>>,
    pub inline_uniform_block_bindings: Option<u32>,
}

/// What the mock saw in the last `vkCreateDescriptorSetLayout` call.
#[derive(Debug, Clone)]
pub struct LayoutRecord {
    pub flags: vk::DescriptorSetLayoutCreateFlags,
    pub bindings: Vec<(u32, vk::DescriptorType, u32)>,
    pub binding_flags: Option<Vec<vk::DescriptorBindingFlags>>,
    pub mutable_types: Option<Vec<Vec<vk::DescriptorType>>>,
}

#[derive(Debug, Clone)]
pub struct WriteRecord {
    pub set: vk::DescriptorSet,
    pub binding: u32,
    pub ty: vk::DescriptorType,
    pub buffers: Vec<vk::DescriptorBufferInfo>,
    pub images: Vec<vk::DescriptorImageInfo>,
}

#[derive(Debug)]
pub struct MockPool {
    pub flags: vk::DescriptorPoolCreateFlags,
    pub max_sets: u32,
    pub live_sets: HashSet<u64>,
}

/// Observable state of the mock device. Counters only ever go up.
#[derive(Debug, Default)]
pub struct MockState {
    next_handle: u64,
    pub layouts_created: usize,
    pub layouts_destroyed: usize,
    pub pipeline_layouts_created: usize,
    pub pipeline_layouts_destroyed: usize,
    pub pools_created: usize,
    pub pools_destroyed: usize,
    pub sets_allocated: usize,
    pub sets_freed: usize,
    /// Calls that referenced an unknown pool or set, or freed from a pool without `FREE_DESCRIPTOR_SET`.
    pub invalid_calls: usize,
    pub pools: HashMap<u64, MockPool>,
    pub last_pool: Option<PoolRecord>,
    pub last_layout: Option<LayoutRecord>,
    pub writes: Vec<WriteRecord>,
    pub fail_layout_creation: bool,
    pub fail_pool_creation: bool,
    pub fail_set_allocation: bool,
}

impl MockState {
    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Number of sets currently allocated over all live pools.
    pub fn live_sets(&self) -> usize {
        self.pools.values().map(|pool| pool.live_sets.len()).sum()
    }
}

pub type SharedState = Rc<RefCell<MockState>>;

/// A descriptor backend that hands out fake handles and enforces pool limits like a driver would.
pub struct MockBackend {
    state: SharedState,
}

fn find_mutable_types(records: &[PNext]) -> Option<Vec<Vec<vk::DescriptorType>>> {
    records.iter().find_map(|record| match record {
        PNext::MutableDescriptorTypes(lists) => Some(lists.clone()),
        _ => None,
    })
}

unsafe fn slice<'a, T>(ptr: *const T, len: u32) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len as usize)
    }
}

impl DescriptorBackend for MockBackend {
    unsafe fn create_descriptor_set_layout(&self, info: &vk::DescriptorSetLayoutCreateInfo) -> VkResult<vk::DescriptorSetLayout> {
        let mut state = self.state.borrow_mut();
        if state.fail_layout_creation {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let records = read_chain(info.p_next);
        state.last_layout = Some(LayoutRecord {
            flags: info.flags,
            bindings: slice(info.p_bindings, info.binding_count)
                .iter()
                .map(|binding| (binding.binding, binding.descriptor_type, binding.descriptor_count))
                .collect(),
            binding_flags: records.iter().find_map(|record| match record {
                PNext::BindingFlags(flags) => Some(flags.clone()),
                _ => None,
            }),
            mutable_types: find_mutable_types(&records),
        });
        state.layouts_created += 1;
        Ok(vk::DescriptorSetLayout::from_raw(state.next_handle()))
    }

    unsafe fn destroy_descriptor_set_layout(&self, _layout: vk::DescriptorSetLayout) {
        self.state.borrow_mut().layouts_destroyed += 1;
    }

    unsafe fn create_pipeline_layout(&self, _info: &vk::PipelineLayoutCreateInfo) -> VkResult<vk::PipelineLayout> {
        let mut state = self.state.borrow_mut();
        if state.fail_layout_creation {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        state.pipeline_layouts_created += 1;
        Ok(vk::PipelineLayout::from_raw(state.next_handle()))
    }

    unsafe fn destroy_pipeline_layout(&self, _layout: vk::PipelineLayout) {
        self.state.borrow_mut().pipeline_layouts_destroyed += 1;
    }

    unsafe fn create_descriptor_pool(&self, info: &vk::DescriptorPoolCreateInfo) -> VkResult<vk::DescriptorPool> {
        let mut state = self.state.borrow_mut();
        if state.fail_pool_creation {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let records = read_chain(info.p_next);
        state.last_pool = Some(PoolRecord {
            flags: info.flags,
            max_sets: info.max_sets,
            sizes: slice(info.p_pool_sizes, info.pool_size_count)
                .iter()
                .map(|size| (size.ty, size.descriptor_count))
                .collect(),
            mutable_types: find_mutable_types(&records),
            inline_uniform_block_bindings: records.iter().find_map(|record| match record {
                PNext::InlineUniformBlock(count) => Some(*count),
                _ => None,
            }),
        });
        let handle = state.next_handle();
        state.pools.insert(
            handle,
            MockPool {
                flags: info.flags,
                max_sets: info.max_sets,
                live_sets: HashSet::new(),
            },
        );
        state.pools_created += 1;
        Ok(vk::DescriptorPool::from_raw(handle))
    }

    unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        let mut state = self.state.borrow_mut();
        if state.pools.remove(&pool.as_raw()).is_none() {
            state.invalid_calls += 1;
        }
        state.pools_destroyed += 1;
    }

    unsafe fn allocate_descriptor_sets(&self, info: &vk::DescriptorSetAllocateInfo) -> VkResult<Vec<vk::DescriptorSet>> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.fail_set_allocation {
            return Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY);
        }
        let count = info.descriptor_set_count as usize;
        let handles = (0..count).map(|_| state.next_handle()).collect::<Vec<_>>();
        let Some(pool) = state.pools.get_mut(&info.descriptor_pool.as_raw()) else {
            state.invalid_calls += 1;
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        };
        if pool.live_sets.len() + count > pool.max_sets as usize {
            return Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY);
        }
        pool.live_sets.extend(handles.iter().copied());
        state.sets_allocated += count;
        Ok(handles.into_iter().map(vk::DescriptorSet::from_raw).collect())
    }

    unsafe fn free_descriptor_sets(&self, pool: vk::DescriptorPool, sets: &[vk::DescriptorSet]) -> VkResult<()> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let valid = match state.pools.get_mut(&pool.as_raw()) {
            Some(pool) if pool.flags.contains(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET) => {
                sets.iter().all(|set| pool.live_sets.remove(&set.as_raw()))
            }
            _ => false,
        };
        if !valid {
            state.invalid_calls += 1;
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        state.sets_freed += sets.len();
        Ok(())
    }

    unsafe fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet], _copies: &[vk::CopyDescriptorSet]) {
        let mut state = self.state.borrow_mut();
        for write in writes {
            state.writes.push(WriteRecord {
                set: write.dst_set,
                binding: write.dst_binding,
                ty: write.descriptor_type,
                buffers: slice(write.p_buffer_info, write.descriptor_count).to_vec(),
                images: slice(write.p_image_info, write.descriptor_count).to_vec(),
            });
        }
    }
}

/// Create a device backed by a fresh mock. The returned state can be inspected and modified by tests.
pub fn make_device() -> (Device, SharedState) {
    let _ = pretty_env_logger::try_init();
    let state = SharedState::default();
    let device = Device::new(MockBackend {
        state: state.clone(),
    });
    (device, state)
}
