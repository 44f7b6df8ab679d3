/// Unified error types for BlackIce
use crate::inventory::GatewayError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for fingerprinting and access resolution
#[derive(Error, Debug)]
pub enum AccessError {
    /// PEM envelope or DER payload could not be parsed
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// Key algorithm outside {RSA, ECDSA}
    #[error("Unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Re-encoding into PKCS#8 (or serializing a response) failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// No registered key pair carries this fingerprint
    #[error("No key pair registered for fingerprint {fingerprint}")]
    IdentityNotFound { fingerprint: String },

    /// Upstream inventory failure
    #[error("Inventory gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration or request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccessError {
    /// Stable error code used in response bodies and metric labels
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::MalformedKey(_) => "MalformedKey",
            AccessError::UnsupportedAlgorithm(_) => "UnsupportedAlgorithm",
            AccessError::Encoding(_) => "EncodingError",
            AccessError::IdentityNotFound { .. } => "IdentityNotFound",
            AccessError::Gateway(_) => "GatewayError",
            AccessError::Validation(_) => "InvalidRequest",
            AccessError::Io(_) | AccessError::Internal(_) => "InternalServerError",
        }
    }

    /// True for errors caused by the identity the caller presented
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            AccessError::MalformedKey(_)
                | AccessError::UnsupportedAlgorithm(_)
                | AccessError::Encoding(_)
        )
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert AccessError to HTTP response
impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = match &self {
            AccessError::MalformedKey(_)
            | AccessError::UnsupportedAlgorithm(_)
            | AccessError::Validation(_) => StatusCode::BAD_REQUEST,
            AccessError::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AccessError::IdentityNotFound { .. } => StatusCode::NOT_FOUND,
            AccessError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AccessError::Io(_) | AccessError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            // Don't leak details
            AccessError::Io(_) | AccessError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for BlackIce operations
pub type AccessResult<T> = Result<T, AccessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (AccessError::MalformedKey("x".into()), StatusCode::BAD_REQUEST),
            (AccessError::UnsupportedAlgorithm("ed25519".into()), StatusCode::BAD_REQUEST),
            (AccessError::Encoding("curve".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                AccessError::IdentityNotFound { fingerprint: "aa".into() },
                StatusCode::NOT_FOUND,
            ),
            (
                AccessError::Gateway(GatewayError::Transport("timeout".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (AccessError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_key_errors_are_distinct_from_denial() {
        assert!(AccessError::MalformedKey("x".into()).is_key_error());
        assert!(!AccessError::IdentityNotFound { fingerprint: "aa".into() }.is_key_error());
        assert!(!AccessError::Gateway(GatewayError::Transport("x".into())).is_key_error());
    }
}
