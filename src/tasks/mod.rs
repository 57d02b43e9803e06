//! Background Tasks Module
//!
//! Long-running tasks that run alongside the HTTP server.

pub mod maintenance;

pub use maintenance::{
    GaugeSnapshot, MaintenanceGauges, MaintenanceHandle, MaintenanceLoop, DEFAULT_POLL_INTERVAL,
};
