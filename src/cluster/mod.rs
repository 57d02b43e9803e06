//! Cluster Module
//!
//! Key ownership over a consistent-hash ring and forwarding of requests to
//! the owning node.

mod forward;
mod ring;

pub use forward::{ForwardFuture, Forwarder, HttpForwarder, UnreachableForwarder};
pub use ring::{hash, ClusterRouter, DEFAULT_VIRTUAL_NODES};
