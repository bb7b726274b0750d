//! Normalized spec cache
//!
//! Contracts are assumed immutable for the life of the process, so entries are
//! kept forever: no TTL, no eviction. Each contract identity owns one slot and
//! concurrent loads of the same identity share a single backend fetch.

use contractnav_core::{ContractId, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<Value>>>;

/// Process-lifetime cache of normalized specs keyed by `source:role:name`
///
/// ## Usage
///
/// ```rust,ignore
/// let cache = SpecCache::new();
///
/// let spec = cache
///     .get_or_try_load(&id, || async { backend.load(role, name).await.map(normalize_spec) })
///     .await?;
///
/// // Later calls hand back the same allocation
/// assert!(Arc::ptr_eq(&spec, &cache.get(&id).unwrap()));
/// ```
#[derive(Default)]
pub struct SpecCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl SpecCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // Every critical section is a single map operation, so a poisoned map is still consistent
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn slot(&self, key: &str) -> Slot {
        Arc::clone(self.lock().entry(key.to_string()).or_default())
    }

    /// Drop an empty slot once no other caller is waiting on it
    fn release(&self, key: &str, slot: &Slot) {
        let mut slots = self.lock();
        let idle = slots.get(key).is_some_and(|held| {
            Arc::ptr_eq(held, slot) && !slot.initialized() && Arc::strong_count(slot) == 2
        });

        if idle {
            slots.remove(key);
        }
    }

    /// Get a cached spec if it has been loaded
    pub fn get(&self, id: &ContractId) -> Option<Arc<Value>> {
        self.lock()
            .get(&id.cache_key())
            .and_then(|slot| slot.get().cloned())
    }

    /// Return the cached spec, or run `load` once and cache its result
    ///
    /// Concurrent callers for the same identity wait on the first load. A
    /// failed load caches nothing: the next call tries again, and a slot no
    /// one else is waiting on is dropped from the map.
    pub async fn get_or_try_load<F, Fut>(&self, id: &ContractId, load: F) -> Result<Arc<Value>, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, StoreError>>,
    {
        let key = id.cache_key();
        let slot = self.slot(&key);

        if let Some(value) = slot.get() {
            tracing::debug!(key = %id, "spec cache hit");
            return Ok(Arc::clone(value));
        }

        let loaded = slot
            .get_or_try_init(|| async {
                tracing::debug!(key = %id, "spec cache miss");
                load().await.map(Arc::new)
            })
            .await
            .map(Arc::clone);

        if loaded.is_err() {
            self.release(&key, &slot);
        }

        loaded
    }

    /// Check if a spec is cached for this identity
    pub fn contains(&self, id: &ContractId) -> bool {
        self.get(id).is_some()
    }

    /// Number of loaded specs
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots in the map, loaded or not
    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.lock().len()
    }
}
