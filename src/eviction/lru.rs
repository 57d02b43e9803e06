//! LRU Policy Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::HashMap;

use tracing::debug;

use super::list::{KeyList, SlotId};
use super::EvictionPolicy;

// == LRU Policy ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys are stored in a slot list where:
/// - Front = Least recently used
/// - Back = Most recently used
#[derive(Debug, Default)]
pub struct LruPolicy {
    /// Order of keys by access time
    order: KeyList<String>,
    /// Key to its node in `order`
    index: HashMap<String, SlotId>,
}

impl LruPolicy {
    // == Constructor ==
    /// Creates a new empty LRU policy.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if new.
    fn touch(&mut self, key: &str) {
        if let Some(id) = self.index.remove(key) {
            self.order.remove(id);
        }
        let id = self.order.push_back(key.to_string());
        self.index.insert(key.to_string(), id);
    }
}

impl EvictionPolicy for LruPolicy {
    fn on_put(&mut self, key: &str) {
        self.touch(key);
        debug!(key, "LRU put");
    }

    // == On Get ==
    /// Refreshes recency of a tracked key. Unknown keys are ignored.
    fn on_get(&mut self, key: &str) {
        if self.index.contains_key(key) {
            self.touch(key);
            debug!(key, "LRU access");
        }
    }

    fn on_delete(&mut self, key: &str) {
        if let Some(id) = self.index.remove(key) {
            self.order.remove(id);
            debug!(key, "LRU delete");
        }
    }

    // == Evict ==
    /// Returns the least recently used key without removing it.
    fn evict(&self) -> Option<String> {
        self.order.front().cloned()
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn name(&self) -> &'static str {
        "lru"
    }
}
