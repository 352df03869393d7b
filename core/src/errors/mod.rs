//! Domain-specific error types and error handling.

mod types;

// Re-export all error types
pub use types::{AuthError, StoreError, TokenError};

use sg_shared::{error_codes, ErrorResponse, IntoErrorResponse};
use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Whether repeating the call later may succeed.
    ///
    /// Only session store unavailability qualifies; every other failure is a
    /// definitive answer about the presented credential.
    pub fn is_retryable(&self) -> bool {
        match self {
            DomainError::Token(TokenError::StoreUnavailable) => true,
            DomainError::Store(StoreError::Unavailable { .. } | StoreError::Timeout { .. }) => true,
            _ => false,
        }
    }
}

impl IntoErrorResponse for DomainError {
    fn to_error_response(&self) -> ErrorResponse {
        match self {
            DomainError::Token(err) => err.clone().into(),
            DomainError::Auth(err) => err.clone().into(),
            DomainError::Store(err) => err.clone().into(),
            DomainError::Internal { .. } => {
                ErrorResponse::new(error_codes::INTERNAL_ERROR, "Internal server error")
            }
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(DomainError::from(TokenError::StoreUnavailable).is_retryable());
        assert!(DomainError::from(StoreError::Timeout { millis: 5 }).is_retryable());
        assert!(!DomainError::from(StoreError::Serialization {
            message: "bad".to_string()
        })
        .is_retryable());
        assert!(!DomainError::from(TokenError::ReplayDetected).is_retryable());
        assert!(!DomainError::from(AuthError::InvalidCredentials).is_retryable());
    }

    #[test]
    fn test_internal_error_hides_message() {
        let err = DomainError::Internal {
            message: "connection string leaked".to_string(),
        };
        let response = err.to_error_response();
        assert_eq!(response.error, "INTERNAL_ERROR");
        assert!(!response.message.contains("leaked"));
    }

    #[test]
    fn test_transparent_display() {
        let err = DomainError::from(TokenError::TokenRevoked);
        assert_eq!(err.to_string(), "Token revoked");
        assert_eq!(err.to_error_response().error, "TOKEN_REVOKED");
    }
}
