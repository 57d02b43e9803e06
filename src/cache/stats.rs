//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.
//! Counters are atomics so the engine worker, the maintenance loop and the
//! stats handler can share one instance.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Shared cache counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    removes: AtomicU64,
    evictions: AtomicU64,
    ttl_expirations: AtomicU64,
    dropped_events: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    /// Deletes that removed a resident entry, whoever issued them. TTL
    /// sweeps and evictions are also counted in `ttl_expirations` and
    /// `evictions`.
    pub removes: u64,
    pub evictions: u64,
    pub ttl_expirations: u64,
    pub dropped_events: u64,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ttl_expiration(&self) {
        self.ttl_expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_event(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            ttl_expirations: self.ttl_expirations.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new().snapshot();
        assert_eq!(stats, StatsSnapshot::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.snapshot().hit_rate(), 0.75);
    }

    #[test]
    fn test_counters_are_independent() {
        let stats = CacheStats::new();
        stats.record_put();
        stats.record_remove();
        stats.record_eviction();
        stats.record_eviction();
        stats.record_ttl_expiration();
        stats.record_dropped_event();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.puts, 1);
        assert_eq!(snapshot.removes, 1);
        assert_eq!(snapshot.evictions, 2);
        assert_eq!(snapshot.ttl_expirations, 1);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.hits, 0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_string(&CacheStats::new().snapshot()).unwrap();
        assert!(json.contains("ttlExpirations"));
        assert!(json.contains("droppedEvents"));
    }
}
