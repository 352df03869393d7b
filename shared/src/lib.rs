//! Shared configuration and error response types for SessionGuard
//!
//! This crate provides the pieces used by both the core and infrastructure crates:
//! - Configuration types (JWT, session store, logging, environment)
//! - The serialized error response shape

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, Environment,
    JwtConfig, CacheConfig, StoreBackend, LoggingConfig, LogFormat, SessionConfig,
};
pub use errors::{ErrorResponse, IntoErrorResponse, ApiResult, error_codes};
