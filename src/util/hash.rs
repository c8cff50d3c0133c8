//! Hashing helpers used to build structural cache keys.
//!
//! Cache keys in this crate are built from descriptions that contain variable-length and often
//! unordered data, like the bindings of a descriptor set layout. [`hash_combine`] mixes values in
//! an order-dependent way, while [`hash_combine_invariant`] and [`hash_combine_unordered`] use a
//! commutative combine so that the declaration order of elements does not change the result.
//!
//! Hashes are only ever used to find a bucket. Every key type in this crate compares all of its
//! fields in `PartialEq`, so two different keys with the same hash never alias each other.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};

const GOLDEN_RATIO: u64 = 0x9e37_79b9_7f4a_7c15;

/// Hash a single value with a deterministic hasher.
pub fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Mix `value` into `seed`. The result depends on the order in which values are combined.
pub fn hash_combine<T: Hash + ?Sized>(seed: &mut u64, value: &T) {
    let hash = hash_one(value);
    *seed ^= hash
        .wrapping_add(GOLDEN_RATIO)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

/// splitmix64 finalizer, spreads bits before the commutative add.
fn finalize(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Mix `value` into `seed` with a commutative operation. Combining the same values in any order
/// yields the same seed.
pub fn hash_combine_invariant<T: Hash + ?Sized>(seed: &mut u64, value: &T) {
    *seed = seed.wrapping_add(finalize(hash_one(value)));
}

/// Combine a collection of values into `seed`, ignoring the iteration order of the collection.
/// The collection as a whole is combined in an order-dependent way with whatever came before it.
pub fn hash_combine_unordered<'a, T, I>(seed: &mut u64, items: I)
where
    T: Hash + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut accumulator = 0u64;
    let mut count = 0u64;
    for item in items {
        hash_combine_invariant(&mut accumulator, item);
        count += 1;
    }
    hash_combine(seed, &count);
    hash_combine(seed, &accumulator);
}

/// A set whose equality and hash ignore insertion order. Used inside cache keys wherever the
/// described data is semantically unordered.
#[derive(Clone)]
pub struct InvariantSet<T> {
    items: HashSet<T>,
}

impl<T: Hash + Eq> InvariantSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            items: HashSet::new(),
        }
    }

    /// Insert a value, returns `false` if an equal value was already present.
    pub fn insert(&mut self, value: T) -> bool {
        self.items.insert(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.items.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the set in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Hash + Eq> Default for InvariantSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq> FromIterator<T> for InvariantSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a, T: Hash + Eq> IntoIterator for &'a InvariantSet<T> {
    type Item = &'a T;
    type IntoIter = std::collections::hash_set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Hash + Eq> PartialEq for InvariantSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Hash + Eq> Eq for InvariantSet<T> {}

impl<T: Hash + Eq> Hash for InvariantSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut seed = 0;
        hash_combine_unordered(&mut seed, &self.items);
        state.write_u64(seed);
    }
}

impl<T: Debug> Debug for InvariantSet<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}
