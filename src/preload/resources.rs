//! Revocable local references to fetched image bytes

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::Serialize;

/// Copyable lookup key for a registered resource.
///
/// Keys stay valid to hold after release; lookups simply miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceKey(pub u64);

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:docpreload/{}", self.0)
    }
}

/// Owning handle for a registered resource.
///
/// Not `Clone`: releasing consumes the handle, so each resource is
/// released at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceHandle {
    key: ResourceKey,
}

impl ResourceHandle {
    #[must_use]
    pub const fn key(&self) -> ResourceKey {
        self.key
    }
}

/// Byte store behind resource handles
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    next_id: u64,
    live: HashMap<ResourceKey, Arc<[u8]>>,
    released: u64,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and hand out the only handle to them
    pub fn create(&mut self, bytes: Vec<u8>) -> ResourceHandle {
        self.next_id += 1;
        let key = ResourceKey(self.next_id);
        self.live.insert(key, Arc::from(bytes));
        ResourceHandle { key }
    }

    /// Bytes for `key`, `None` once released
    #[must_use]
    pub fn get(&self, key: ResourceKey) -> Option<Arc<[u8]>> {
        self.live.get(&key).cloned()
    }

    /// Release a resource; returns false if it was already gone
    pub fn release(&mut self, handle: ResourceHandle) -> bool {
        let removed = self.live.remove(&handle.key).is_some();
        if removed {
            self.released += 1;
            debug!("Released {}", handle.key);
        }
        removed
    }

    /// Number of resources not yet released
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of resources released so far
    #[must_use]
    pub fn released_count(&self) -> u64 {
        self.released
    }
}
