//! `Hash` and `Eq` for every structural cache key.
//!
//! Hashes are built with [`hash_combine`], set-valued fields are already order independent through
//! [`InvariantSet`](crate::util::hash::InvariantSet). Equality always compares every field, so a
//! hash collision can never make two different descriptions share a cached object.

use std::hash::{Hash, Hasher};

use crate::descriptor::descriptor_pool::{DescriptorPoolKey, DescriptorPoolSizeKey};
use crate::pipeline::pipeline_layout::PipelineLayoutKey;
use crate::pipeline::set_layout::{DescriptorBindingKey, DescriptorSetLayoutKey};
use crate::util::hash::hash_combine;

impl Hash for DescriptorBindingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut seed = 0;
        hash_combine(&mut seed, &self.binding);
        hash_combine(&mut seed, &self.ty);
        hash_combine(&mut seed, &self.count);
        hash_combine(&mut seed, &self.stages);
        hash_combine(&mut seed, &self.immutable_samplers);
        hash_combine(&mut seed, &self.flags);
        hash_combine(&mut seed, &self.mutable_types);
        state.write_u64(seed);
    }
}

impl Hash for DescriptorSetLayoutKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut seed = 0;
        hash_combine(&mut seed, &self.flags);
        hash_combine(&mut seed, &self.bindings);
        state.write_u64(seed);
    }
}

impl Hash for PipelineLayoutKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut seed = 0;
        hash_combine(&mut seed, &self.flags);
        hash_combine(&mut seed, &self.set_layouts);
        hash_combine(&mut seed, &self.push_constants);
        state.write_u64(seed);
    }
}

impl Hash for DescriptorPoolSizeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut seed = 0;
        hash_combine(&mut seed, &self.ty);
        hash_combine(&mut seed, &self.count);
        hash_combine(&mut seed, &self.mutable_types);
        state.write_u64(seed);
    }
}

impl Hash for DescriptorPoolKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut seed = 0;
        hash_combine(&mut seed, &self.flags);
        hash_combine(&mut seed, &self.sizes);
        hash_combine(&mut seed, &self.max_inline_uniform_block_bindings);
        state.write_u64(seed);
    }
}

impl PartialEq<Self> for DescriptorBindingKey {
    fn eq(&self, other: &Self) -> bool {
        self.binding == other.binding
            && self.ty == other.ty
            && self.count == other.count
            && self.stages == other.stages
            && self.immutable_samplers == other.immutable_samplers
            && self.flags == other.flags
            && self.mutable_types == other.mutable_types
    }
}

impl PartialEq<Self> for DescriptorSetLayoutKey {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags && self.bindings == other.bindings
    }
}

impl PartialEq<Self> for PipelineLayoutKey {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags
            && self.set_layouts == other.set_layouts
            && self.push_constants == other.push_constants
    }
}

impl PartialEq<Self> for DescriptorPoolSizeKey {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.count == other.count && self.mutable_types == other.mutable_types
    }
}

impl PartialEq<Self> for DescriptorPoolKey {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags
            && self.sizes == other.sizes
            && self.max_inline_uniform_block_bindings == other.max_inline_uniform_block_bindings
    }
}

impl Eq for DescriptorBindingKey {}
impl Eq for DescriptorSetLayoutKey {}
impl Eq for PipelineLayoutKey {}
impl Eq for DescriptorPoolSizeKey {}
impl Eq for DescriptorPoolKey {}
