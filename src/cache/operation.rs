//! Cache Operation Module
//!
//! Committed-operation records emitted by the engine for the maintenance loop.

use std::fmt;
use std::time::SystemTime;

use crate::cache::CacheEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Put,
    Get,
    Delete,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Put => "PUT",
            OperationType::Get => "GET",
            OperationType::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

// == Cache Operation ==
/// A committed operation. `entry` is only present for PUT.
#[derive(Debug, Clone)]
pub struct CacheOperation {
    pub op_type: OperationType,
    pub key: String,
    pub entry: Option<CacheEntry>,
    pub timestamp: SystemTime,
}

impl CacheOperation {
    pub fn put(key: impl Into<String>, entry: CacheEntry) -> Self {
        Self::new(OperationType::Put, key.into(), Some(entry))
    }

    pub fn get(key: impl Into<String>) -> Self {
        Self::new(OperationType::Get, key.into(), None)
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::new(OperationType::Delete, key.into(), None)
    }

    fn new(op_type: OperationType, key: String, entry: Option<CacheEntry>) -> Self {
        Self {
            op_type,
            key,
            entry,
            timestamp: SystemTime::now(),
        }
    }
}
