//! FIFO eviction: victims leave in arrival order. A re-PUT counts as a new
//! arrival; reads do not matter.

use std::collections::HashMap;

use tracing::debug;

use super::list::{KeyList, SlotId};
use super::EvictionPolicy;

#[derive(Debug, Default)]
pub struct FifoPolicy {
    queue: KeyList<String>,
    index: HashMap<String, SlotId>,
}

impl FifoPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionPolicy for FifoPolicy {
    fn on_put(&mut self, key: &str) {
        if let Some(id) = self.index.remove(key) {
            self.queue.remove(id);
        }
        let id = self.queue.push_back(key.to_string());
        self.index.insert(key.to_string(), id);
        debug!(key, "FIFO put");
    }

    fn on_get(&mut self, _key: &str) {}

    fn on_delete(&mut self, key: &str) {
        if let Some(id) = self.index.remove(key) {
            self.queue.remove(id);
            debug!(key, "FIFO delete");
        }
    }

    fn evict(&self) -> Option<String> {
        self.queue.front().cloned()
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn name(&self) -> &'static str {
        "fifo"
    }
}
