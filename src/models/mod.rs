//! Request and Response models for the cache server API
//!
//! DTOs for the public `/cache` surface and the node-to-node `/rpc` surface.
//! Wire names are camelCase.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{KeyQuery, PutRequest, RpcDeleteRequest, RpcGetRequest, RpcPutRequest};
pub use responses::{
    DeleteResponse, ErrorResponse, GetResponse, HealthResponse, PutResponse, RpcDeleteResponse,
    RpcGetResponse, RpcPutResponse, StatsResponse,
};
