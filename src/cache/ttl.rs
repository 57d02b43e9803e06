//! TTL Index
//!
//! Buckets keys by the exact second they expire. A reverse index lets a
//! re-PUT move its key to the new bucket in O(1) (plus the ordered-map
//! lookup), so expiry is always evaluated against the latest TTL.
//!
//! Owned by the maintenance loop only; no interior locking.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

#[derive(Debug, Default)]
pub struct TtlIndex {
    /// expires_at -> keys expiring at that second
    buckets: BTreeMap<u64, HashSet<String>>,
    /// key -> expires_at
    reverse: HashMap<String, u64>,
}

impl TtlIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // == Add ==
    /// Indexes `key` under `expires_at`, moving it out of any older bucket.
    pub fn add(&mut self, expires_at: u64, key: impl Into<String>) {
        let key = key.into();
        match self.reverse.insert(key.clone(), expires_at) {
            Some(previous) if previous == expires_at => return,
            Some(previous) => self.detach(&key, previous),
            None => {}
        }
        self.buckets.entry(expires_at).or_default().insert(key);
        debug!(expires_at, "TTL index add");
    }

    // == Remove ==
    /// Drops `key` from the index. Returns its bucket if it was indexed.
    pub fn remove(&mut self, key: &str) -> Option<u64> {
        let expires_at = self.reverse.remove(key)?;
        self.detach(key, expires_at);
        Some(expires_at)
    }

    fn detach(&mut self, key: &str, expires_at: u64) {
        if let Some(keys) = self.buckets.get_mut(&expires_at) {
            keys.remove(key);
            if keys.is_empty() {
                self.buckets.remove(&expires_at);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    // == Peek ==
    /// Earliest expiration second present in the index.
    pub fn peek(&self) -> Option<u64> {
        self.buckets.keys().next().copied()
    }

    // == Poll ==
    /// Removes and returns the whole earliest bucket, or `None` when empty.
    pub fn poll(&mut self) -> Option<HashSet<String>> {
        let (_, keys) = self.buckets.pop_first()?;
        for key in &keys {
            self.reverse.remove(key);
        }
        Some(keys)
    }

    /// Number of distinct expiration buckets.
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    /// Number of indexed keys.
    pub fn key_count(&self) -> usize {
        self.reverse.len()
    }

    pub fn expiration_of(&self, key: &str) -> Option<u64> {
        self.reverse.get(key).copied()
    }
}
