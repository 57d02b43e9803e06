//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and queries.

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Request body for `PUT /cache`.
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store; required
/// - `ttl_in_sec`: Seconds until the entry expires, 0 when absent
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub ttl_in_sec: u64,
}

impl PutRequest {
    /// Checks the request and returns the value to store.
    pub fn validate(&self) -> Result<&str, CacheError> {
        if self.key.is_empty() {
            return Err(CacheError::InvalidArgument(
                "Key cannot be empty".to_string(),
            ));
        }
        self.value
            .as_deref()
            .ok_or_else(|| CacheError::InvalidArgument("Value is required".to_string()))
    }
}

/// Query string of `GET /cache` and `DELETE /cache`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: String,
}

// == RPC Requests ==
/// Body of `POST /rpc/put`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcPutRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub ttl_in_sec: u64,
}

/// Body of `POST /rpc/get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcGetRequest {
    pub key: String,
}

/// Body of `POST /rpc/delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcDeleteRequest {
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_request_deserialize() {
        let json = r#"{"key": "test", "value": "hello", "ttlInSec": 60}"#;
        let req: PutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value.as_deref(), Some("hello"));
        assert_eq!(req.ttl_in_sec, 60);
    }

    #[test]
    fn test_put_request_ttl_defaults_to_zero() {
        let req: PutRequest = serde_json::from_str(r#"{"key":"k","value":"v"}"#).unwrap();
        assert_eq!(req.ttl_in_sec, 0);
        assert_eq!(req.validate(), Ok("v"));
    }

    #[test]
    fn test_validate_empty_key() {
        let req: PutRequest = serde_json::from_str(r#"{"value":"v"}"#).unwrap();
        assert!(matches!(req.validate(), Err(CacheError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_missing_value() {
        let req: PutRequest = serde_json::from_str(r#"{"key":"k"}"#).unwrap();
        assert_eq!(
            req.validate(),
            Err(CacheError::InvalidArgument("Value is required".to_string()))
        );
    }

    #[test]
    fn test_rpc_put_wire_names() {
        let req = RpcPutRequest {
            key: "k".to_string(),
            value: "v".to_string(),
            ttl_in_sec: 9,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["ttlInSec"], 9);
    }
}
