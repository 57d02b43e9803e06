//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Wire code reported for a request that did not finish in time.
pub const TIMEOUT_ERROR_CODE: &str = "TIMEOUT";

/// Wire code reported for rejected input.
pub const INVALID_ARGUMENT_ERROR_CODE: &str = "INVALID_ARGUMENT";

/// Wire code reported for every other failure.
pub const DEFAULT_ERROR_CODE: &str = "ERROR.DEFAULT";

// == Cache Error Enum ==
/// Unified error type for the cache server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Missing key, or missing value on PUT
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Owner node is known to the ring but has no address
    #[error("Address not found for owner node={node}")]
    AddressNotFound { node: String },

    /// Remote owner was unreachable or answered with an error
    #[error("Forwarding failed: {0}")]
    Forwarding(String),

    /// Request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Request queue is full
    #[error("Cache worker is overloaded")]
    Overloaded,

    /// The worker stopped before completing the request
    #[error("Cache worker is unavailable")]
    WorkerUnavailable,

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    // == Error Code ==
    /// Returns the code placed in the `errorCode` field of API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CacheError::Timeout => TIMEOUT_ERROR_CODE,
            CacheError::InvalidArgument(_) => INVALID_ARGUMENT_ERROR_CODE,
            _ => DEFAULT_ERROR_CODE,
        }
    }

    // == Status Code ==
    /// Returns the HTTP status used when this error answers a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CacheError::AddressNotFound { .. } | CacheError::Forwarding(_) => {
                StatusCode::BAD_GATEWAY
            }
            CacheError::Overloaded | CacheError::WorkerUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::from_error(&self));
        (self.status_code(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CacheError::Timeout.error_code(), "TIMEOUT");
        assert_eq!(
            CacheError::InvalidArgument("key".into()).error_code(),
            "INVALID_ARGUMENT"
        );
        assert_eq!(
            CacheError::Forwarding("refused".into()).error_code(),
            DEFAULT_ERROR_CODE
        );
        assert_eq!(CacheError::Overloaded.error_code(), DEFAULT_ERROR_CODE);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            CacheError::InvalidArgument(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(CacheError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            CacheError::AddressNotFound { node: "n2".into() }.status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = CacheError::Overloaded.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_address_not_found_message_names_node() {
        let err = CacheError::AddressNotFound {
            node: "node-7".into(),
        };
        assert!(err.to_string().contains("node-7"));
    }
}
