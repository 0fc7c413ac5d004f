//! Error types for the tiered cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the tiered cache.
///
/// Only `Validation` is surfaced by the cache layer itself; backend and
/// integrity failures are absorbed into miss semantics by the tier chain and
/// reported through events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key or value rejected before any tier mutation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Key not found in any tier
    #[error("Key not found: {0}")]
    NotFound(String),

    /// A remote tier failed or timed out
    #[error("Backend unavailable ({tier}): {reason}")]
    BackendUnavailable { tier: String, reason: String },

    /// Stored bytes failed checksum or authentication
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// Compression or decompression failed
    #[error("Transform failed: {0}")]
    Transform(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Shorthand for a backend failure on the named tier.
    pub fn backend(tier: impl Into<String>, reason: impl Into<String>) -> Self {
        CacheError::BackendUnavailable {
            tier: tier.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status used when the error reaches the REST surface.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::Validation(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Integrity(_)
            | CacheError::Transform(_)
            | CacheError::Config(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the tiered cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (CacheError::Validation("k".into()), StatusCode::BAD_REQUEST),
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (
                CacheError::backend("l2", "timeout"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CacheError::Integrity("k".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CacheError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_backend_error_display() {
        let err = CacheError::backend("L2", "connection refused");
        assert_eq!(
            err.to_string(),
            "Backend unavailable (L2): connection refused"
        );
    }
}
