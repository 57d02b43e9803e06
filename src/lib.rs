//! Ring Cache - A clustered in-memory cache server
//!
//! Routes keys to owning nodes over a consistent-hash ring, serves owned keys
//! from a single-writer store with TTL expiration, and keeps the store bounded
//! with FIFO, LRU or LFU eviction driven by a background maintenance loop.

pub mod api;
pub mod cache;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod error;
pub mod eviction;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::{MaintenanceHandle, MaintenanceLoop};
