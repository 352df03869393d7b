//! Business services containing the session lifecycle use cases.

pub mod auth;
pub mod token;

// Re-export commonly used types
pub use auth::{
    AuthService, CredentialVerifier, LockoutConfig, LoginLockout, VerifiedPrincipal,
};
pub use token::{
    CleanupResult, IndexCleanupConfig, SessionIndexCleanup, TokenService, TokenServiceConfig,
    TokenSigner,
};
