//! Error types for token management, the session store and authentication
//!
//! Every variant maps to a stable machine code from `sg_shared::error_codes`
//! so that a presentation layer can translate it without string matching.

use chrono::{DateTime, Utc};
use sg_shared::{error_codes, ErrorResponse};
use thiserror::Error;

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token signature verification failed")]
    InvalidSignature,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Refresh token reuse detected")]
    ReplayDetected,

    #[error("Session store unavailable")]
    StoreUnavailable,

    #[error("Token generation failed")]
    TokenGenerationFailed,

    #[error("Missing claim: {claim}")]
    MissingClaim { claim: String },
}

/// Session store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Session store call timed out after {millis} ms")]
    Timeout { millis: u64 },

    #[error("Session record serialization failed: {message}")]
    Serialization { message: String },
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Authentication-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("Credential service unavailable")]
    CredentialServiceUnavailable,
}

impl TokenError {
    /// Stable error code for clients
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidSignature | TokenError::MalformedToken | TokenError::InvalidToken => {
                error_codes::INVALID_TOKEN
            }
            TokenError::MissingClaim { .. } => error_codes::INVALID_TOKEN,
            TokenError::TokenExpired => error_codes::TOKEN_EXPIRED,
            TokenError::TokenRevoked => error_codes::TOKEN_REVOKED,
            TokenError::InvalidRefreshToken => error_codes::INVALID_REFRESH_TOKEN,
            TokenError::RefreshTokenExpired => error_codes::REFRESH_TOKEN_EXPIRED,
            TokenError::ReplayDetected => error_codes::REPLAY_DETECTED,
            TokenError::StoreUnavailable => error_codes::STORE_UNAVAILABLE,
            TokenError::TokenGenerationFailed => error_codes::TOKEN_GENERATION_FAILED,
        }
    }
}

/// Convert TokenError to ErrorResponse
impl From<TokenError> for ErrorResponse {
    fn from(err: TokenError) -> Self {
        let response = ErrorResponse::new(err.code(), err.to_string());
        match err {
            TokenError::StoreUnavailable => response.retryable(),
            _ => response,
        }
    }
}

/// Convert StoreError to ErrorResponse
impl From<StoreError> for ErrorResponse {
    fn from(err: StoreError) -> Self {
        let response = ErrorResponse::new(error_codes::STORE_UNAVAILABLE, err.to_string());
        match err {
            StoreError::Serialization { .. } => response,
            _ => response.retryable(),
        }
    }
}

/// Convert AuthError to ErrorResponse
impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::InvalidCredentials => {
                ErrorResponse::new(error_codes::INVALID_CREDENTIALS, err.to_string())
            }
            AuthError::AccountLocked { until } => {
                let retry_after = (*until - Utc::now()).num_seconds().max(0);
                ErrorResponse::new(error_codes::ACCOUNT_LOCKED, err.to_string())
                    .add_detail("locked_until", until.to_rfc3339())
                    .add_detail("retry_after_seconds", retry_after)
            }
            AuthError::CredentialServiceUnavailable => {
                ErrorResponse::new(error_codes::INTERNAL_ERROR, err.to_string()).retryable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_error_codes() {
        assert_eq!(TokenError::InvalidSignature.code(), "INVALID_TOKEN");
        assert_eq!(TokenError::MalformedToken.code(), "INVALID_TOKEN");
        assert_eq!(TokenError::ReplayDetected.code(), "REPLAY_DETECTED");
        assert_eq!(TokenError::RefreshTokenExpired.code(), "REFRESH_TOKEN_EXPIRED");
    }

    #[test]
    fn test_only_store_failures_are_retryable() {
        let response: ErrorResponse = TokenError::StoreUnavailable.into();
        assert!(response.retryable);

        let response: ErrorResponse = TokenError::TokenRevoked.into();
        assert!(!response.retryable);

        let response: ErrorResponse = StoreError::Timeout { millis: 10 }.into();
        assert!(response.retryable);
        assert_eq!(response.error, "STORE_UNAVAILABLE");
    }

    #[test]
    fn test_account_locked_details() {
        let until = Utc::now() + Duration::minutes(30);
        let response: ErrorResponse = AuthError::AccountLocked { until }.into();

        assert_eq!(response.error, "ACCOUNT_LOCKED");
        let details = response.details.unwrap();
        assert_eq!(details["locked_until"], until.to_rfc3339());
        assert!(details["retry_after_seconds"].as_i64().unwrap() > 1700);
    }
}
