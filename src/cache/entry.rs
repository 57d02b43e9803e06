//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Entries are never mutated; a re-PUT replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The stored value
    value: String,
    /// Creation timestamp (epoch seconds)
    creation_time: u64,
    /// Expiration timestamp (epoch seconds), always >= creation_time
    expiration_time: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl_seconds` after `now`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `now` - Creation time in epoch seconds
    /// * `ttl_seconds` - TTL in seconds, 0 means already expired
    pub fn new(value: String, now: u64, ttl_seconds: u64) -> Self {
        Self {
            value,
            creation_time: now,
            expiration_time: now.saturating_add(ttl_seconds),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn expiration_time(&self) -> u64 {
        self.expiration_time
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= expiration_time`, so a zero TTL is a
    /// miss on the very next read.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiration_time
    }

    // == Time To Live ==
    /// Returns remaining TTL in seconds at `now`, 0 once expired.
    pub fn ttl_remaining(&self, now: u64) -> u64 {
        self.expiration_time.saturating_sub(now)
    }
}
