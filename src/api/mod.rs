//! API Module
//!
//! HTTP handlers and routing for the cache node.
//!
//! # Endpoints
//! - `PUT /cache` - Store a value
//! - `GET /cache?key=` - Retrieve a value
//! - `DELETE /cache?key=` - Delete a key
//! - `POST /rpc/{put,get,delete}` - Node-to-node forwarding surface
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
