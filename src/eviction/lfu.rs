//! LFU eviction with O(1) frequency buckets.
//!
//! ```text
//!   buckets (ascending frequency, empty buckets never kept)
//!   head ─► [freq 1: b, d] ◄──► [freq 3: a] ◄──► [freq 4: c] ◄── tail
//!
//!   by_freq: 1 -> bucket slot, 3 -> bucket slot, 4 -> bucket slot
//!   keys:    a -> (bucket of freq 3, slot of "a" inside it), ...
//! ```
//!
//! A PUT or GET is one access. A new key enters the frequency-1 bucket at the
//! head of the chain. An existing key at frequency `f` moves to the bucket
//! for `f + 1`, which is created right after its current bucket when absent.
//! The victim is the oldest key of the head bucket.

use std::collections::HashMap;

use tracing::{debug, error};

use super::list::{KeyList, SlotId};
use super::EvictionPolicy;

#[derive(Debug)]
struct Bucket {
    freq: u64,
    keys: KeyList<String>,
}

impl Bucket {
    fn new(freq: u64) -> Self {
        Self {
            freq,
            keys: KeyList::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Position {
    bucket: SlotId,
    slot: SlotId,
}

#[derive(Debug, Default)]
pub struct LfuPolicy {
    buckets: KeyList<Bucket>,
    by_freq: HashMap<u64, SlotId>,
    keys: HashMap<String, Position>,
}

impl LfuPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access count recorded for `key`.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        let position = self.keys.get(key)?;
        self.buckets.get(position.bucket).map(|bucket| bucket.freq)
    }

    // == Access ==
    fn access(&mut self, key: &str) {
        match self.keys.get(key).copied() {
            None => self.insert_new(key),
            Some(position) => self.promote(key, position),
        }
    }

    fn insert_new(&mut self, key: &str) {
        let bucket = match self.by_freq.get(&1) {
            Some(&bucket) => bucket,
            None => {
                let bucket = self.buckets.push_front(Bucket::new(1));
                self.by_freq.insert(1, bucket);
                bucket
            }
        };
        self.push_key(bucket, key);
    }

    fn promote(&mut self, key: &str, position: Position) {
        let Some(freq) = self.buckets.get(position.bucket).map(|b| b.freq) else {
            error!(key, "LFU key points at a missing bucket");
            self.keys.remove(key);
            return;
        };
        let next_freq = freq + 1;

        let target = match self.by_freq.get(&next_freq) {
            Some(&bucket) => Some(bucket),
            None => {
                let created = self
                    .buckets
                    .insert_after(position.bucket, Bucket::new(next_freq));
                if let Some(bucket) = created {
                    self.by_freq.insert(next_freq, bucket);
                }
                created
            }
        };
        let Some(target) = target else {
            return;
        };

        self.unlink(position);
        self.push_key(target, key);
    }

    fn push_key(&mut self, bucket: SlotId, key: &str) {
        if let Some(b) = self.buckets.get_mut(bucket) {
            let slot = b.keys.push_back(key.to_string());
            self.keys.insert(key.to_string(), Position { bucket, slot });
        }
    }

    /// Removes the key at `position` from its bucket, dropping the bucket if
    /// it becomes empty.
    fn unlink(&mut self, position: Position) {
        let emptied = match self.buckets.get_mut(position.bucket) {
            Some(bucket) => {
                bucket.keys.remove(position.slot);
                bucket.keys.is_empty().then_some(bucket.freq)
            }
            None => None,
        };
        if let Some(freq) = emptied {
            self.buckets.remove(position.bucket);
            self.by_freq.remove(&freq);
        }
    }

    #[cfg(test)]
    fn chain(&self) -> Vec<(u64, Vec<String>)> {
        self.buckets
            .iter()
            .map(|b| (b.freq, b.keys.iter().cloned().collect()))
            .collect()
    }
}

impl EvictionPolicy for LfuPolicy {
    fn on_put(&mut self, key: &str) {
        self.access(key);
        debug!(key, "LFU put");
    }

    fn on_get(&mut self, key: &str) {
        self.access(key);
        debug!(key, "LFU access");
    }

    fn on_delete(&mut self, key: &str) {
        if let Some(position) = self.keys.remove(key) {
            self.unlink(position);
            debug!(key, "LFU delete");
        }
    }

    fn evict(&self) -> Option<String> {
        self.buckets
            .front()
            .and_then(|bucket| bucket.keys.front())
            .cloned()
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn name(&self) -> &'static str {
        "lfu"
    }
}
