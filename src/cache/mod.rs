//! Cache Module
//!
//! The single-writer store, its operation events, and the TTL index the
//! maintenance loop keeps alongside it.

mod engine;
mod entry;
mod events;
mod operation;
mod stats;
mod ttl;


// Re-export public types
pub use engine::{CacheEngine, Completion, EngineParts};
pub use entry::CacheEntry;
pub use events::{event_queue, EventReceiver, EventSender};
pub use operation::{CacheOperation, OperationType};
pub use stats::{CacheStats, StatsSnapshot};
pub use ttl::TtlIndex;
