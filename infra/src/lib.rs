//! # Infrastructure Layer
//!
//! Concrete implementations behind the SessionGuard core:
//! - **Cache**: Redis-backed `SessionStore`
//! - **Config**: layered configuration loading (`.env`, TOML file, `SG__` variables)
//! - **Telemetry**: `tracing` subscriber installation
//! - **Bootstrap**: explicit constructor wiring of the session services

// Re-export core types for convenience
pub use sg_core::errors::*;

/// Cache module - Redis session store
pub mod cache;

/// Configuration loading
pub mod config;

/// Tracing subscriber setup
pub mod telemetry;

/// Service wiring
pub mod bootstrap;

pub use bootstrap::{build_session_services, build_store, SessionServices};
pub use cache::RedisSessionStore;
pub use config::load_config;
pub use telemetry::init_tracing;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Domain service could not be constructed
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}

impl From<::config::ConfigError> for InfrastructureError {
    fn from(err: ::config::ConfigError) -> Self {
        InfrastructureError::Config(err.to_string())
    }
}
