//! Response DTOs for the cache server API
//!
//! Every `/cache` response carries a status or value plus optional
//! `errorCode`/`errorMessage` fields that are omitted on success.

use serde::{Deserialize, Serialize};

use crate::cache::StatsSnapshot;
use crate::error::CacheError;
use crate::tasks::GaugeSnapshot;

/// Response body for `PUT /cache`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutResponse {
    pub put_status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PutResponse {
    pub fn ok() -> Self {
        Self {
            put_status: true,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(err: &CacheError) -> Self {
        Self {
            put_status: false,
            error_code: Some(err.error_code().to_string()),
            error_message: Some(err.to_string()),
        }
    }
}

/// Response body for `GET /cache`. A miss has neither value nor error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl GetResponse {
    pub fn value(value: Option<String>) -> Self {
        Self {
            value,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(err: &CacheError) -> Self {
        Self {
            value: None,
            error_code: Some(err.error_code().to_string()),
            error_message: Some(err.to_string()),
        }
    }
}

/// Response body for `DELETE /cache`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub remove_status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DeleteResponse {
    pub fn ok() -> Self {
        Self {
            remove_status: true,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(err: &CacheError) -> Self {
        Self {
            remove_status: false,
            error_code: Some(err.error_code().to_string()),
            error_message: Some(err.to_string()),
        }
    }
}

// == RPC Responses ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcPutResponse {
    pub success: bool,
}

/// `value` is empty when `found` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcGetResponse {
    pub found: bool,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcDeleteResponse {
    pub success: bool,
}

/// Response body for `GET /stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub node_id: String,
    pub eviction_policy: String,
    /// Entries in the local store
    pub size: usize,
    /// Size above which eviction starts
    pub maximum_size: usize,
    pub hit_rate: f64,
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    #[serde(flatten)]
    pub maintenance: GaugeSnapshot,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    /// Whether the ring has at least one node
    pub cluster_ready: bool,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(node_id: impl Into<String>, cluster_ready: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            node_id: node_id.into(),
            cluster_ready,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Body returned by `/rpc/*` routes when the local engine fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: String,
    pub error_message: String,
}

impl ErrorResponse {
    pub fn from_error(err: &CacheError) -> Self {
        Self {
            error_code: err.error_code().to_string(),
            error_message: err.to_string(),
        }
    }
}
