//! Eviction Module
//!
//! Policies decide which key leaves the cache when it holds more entries
//! than allowed. They are driven only by the maintenance loop, so none of
//! them synchronize internally.

mod fifo;
mod lfu;
mod list;
mod lru;

use std::fmt;
use std::str::FromStr;

pub use fifo::FifoPolicy;
pub use lfu::LfuPolicy;
pub use list::{KeyList, SlotId};
pub use lru::LruPolicy;

// == Eviction Policy ==
/// Bookkeeping fed by cache operation events.
///
/// `evict` only names the victim. The caller deletes it from the store and
/// then reports the removal through `on_delete`.
pub trait EvictionPolicy: Send {
    fn on_put(&mut self, key: &str);

    fn on_get(&mut self, key: &str);

    fn on_delete(&mut self, key: &str);

    /// Next victim, or `None` when nothing is tracked.
    fn evict(&self) -> Option<String>;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn name(&self) -> &'static str;
}

// == Eviction Kind ==
/// Policy selected through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionKind {
    Fifo,
    Lru,
    #[default]
    Lfu,
}

impl EvictionKind {
    pub fn build(self) -> Box<dyn EvictionPolicy> {
        match self {
            EvictionKind::Fifo => Box::new(FifoPolicy::new()),
            EvictionKind::Lru => Box::new(LruPolicy::new()),
            EvictionKind::Lfu => Box::new(LfuPolicy::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EvictionKind::Fifo => "fifo",
            EvictionKind::Lru => "lru",
            EvictionKind::Lfu => "lfu",
        }
    }
}

impl fmt::Display for EvictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown eviction policy '{0}', expected one of fifo, lru, lfu")]
pub struct UnknownPolicy(pub String);

impl FromStr for EvictionKind {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(EvictionKind::Fifo),
            "lru" => Ok(EvictionKind::Lru),
            "lfu" => Ok(EvictionKind::Lfu),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_names() {
        assert_eq!("fifo".parse(), Ok(EvictionKind::Fifo));
        assert_eq!("LRU".parse(), Ok(EvictionKind::Lru));
        assert_eq!(" Lfu ".parse(), Ok(EvictionKind::Lfu));
        assert_eq!(
            "random".parse::<EvictionKind>(),
            Err(UnknownPolicy("random".to_string()))
        );
    }

    #[test]
    fn test_build_matches_kind() {
        for kind in [EvictionKind::Fifo, EvictionKind::Lru, EvictionKind::Lfu] {
            let policy = kind.build();
            assert_eq!(policy.name(), kind.to_string());
            assert!(policy.is_empty());
        }
    }

    #[test]
    fn test_default_is_lfu() {
        assert_eq!(EvictionKind::default(), EvictionKind::Lfu);
    }
}
