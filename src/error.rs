//! Error types for the sync agent
//!
//! Provides unified error handling using thiserror. The cache itself never
//! fails; these errors come from the backend client, local storage and the
//! HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Sync Error Enum ==
/// Unified error type for the sync agent.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Key not found in cache (or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Backend unreachable or request timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { status: u16, endpoint: String },

    /// Response body or stored payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Local storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = match &self {
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SyncError::Network(_) | SyncError::HttpStatus { .. } => StatusCode::BAD_GATEWAY,
            SyncError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SyncError::Storage(_) | SyncError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the sync agent.
pub type Result<T> = std::result::Result<T, SyncError>;
