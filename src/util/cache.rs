//! Structural caching of immutable native objects.
//!
//! A [`Cache`] maps a structural key, derived from a create info, to a single shared instance of the
//! resource built from it. Two create infos that produce equal keys always resolve to the same
//! object, no matter in what order their contents were declared.
//!
//! The cache is unbounded and never evicts on its own. Layout shapes in a renderer form a small set
//! that is discovered early and reused for the entire run, so the only ways to remove entries are
//! [`Cache::erase`] and [`Cache::clear`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use std::rc::Rc;

use anyhow::Result;

use crate::core::device::Device;

/// A native object that can be stored in a [`Cache`].
pub trait Resource: Sized {
    /// Structural identity of the resource. Equal keys must describe interchangeable objects.
    type Key: Hash + Eq;
    /// Description the resource is created from.
    type CreateInfo;

    /// Derive the structural key of a create info.
    fn key(info: &Self::CreateInfo) -> Self::Key;

    /// Create the native object.
    fn create(device: Device, info: &Self::CreateInfo) -> Result<Self>;
}

/// Cache of shared resources keyed by structural identity.
pub struct Cache<R: Resource> {
    device: Device,
    store: HashMap<R::Key, Rc<R>>,
}

impl<R: Resource> Cache<R> {
    /// Create an empty cache. Resources are created on `device` when first requested.
    pub fn new(device: Device) -> Self {
        Self {
            device,
            store: HashMap::new(),
        }
    }

    /// Get the resource matching `info`, creating it if no structurally equal resource exists yet.
    /// # Errors
    /// - Fails if creating the native object fails. Nothing is inserted in that case.
    pub fn get_or_create(&mut self, info: &R::CreateInfo) -> Result<Rc<R>> {
        match self.store.entry(R::key(info)) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let resource = Rc::new(R::create(self.device.clone(), info)?);
                Ok(entry.insert(resource).clone())
            }
        }
    }

    /// Get the resource matching `info` if it was created before.
    pub fn get(&self, info: &R::CreateInfo) -> Option<Rc<R>> {
        self.store.get(&R::key(info)).cloned()
    }

    /// Whether a resource matching `info` is cached.
    pub fn contains(&self, info: &R::CreateInfo) -> bool {
        self.store.contains_key(&R::key(info))
    }

    /// Remove the resource matching `info` from the cache. The native object is destroyed as soon
    /// as the last outstanding handle to it is dropped. Returns whether an entry was removed.
    pub fn erase(&mut self, info: &R::CreateInfo) -> bool {
        self.store.remove(&R::key(info)).is_some()
    }

    /// Remove all entries from the cache.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The device resources in this cache are created on.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl<R: Resource> Debug for Cache<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("entries", &self.store.len()).finish()
    }
}
