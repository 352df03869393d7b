//! Configuration module with business-specific sub-modules
//!
//! - `auth` - JWT signing and session policy
//! - `cache` - Session store backend and Redis connection settings
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod cache;
pub mod environment;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use auth::{JwtConfig, SessionConfig};
pub use cache::{CacheConfig, StoreBackend};
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// JWT configuration
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Session lifecycle policy
    #[serde(default)]
    pub session: SessionConfig,

    /// Session store configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            jwt: JwtConfig::default(),
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            jwt: JwtConfig::default(),
            session: SessionConfig::default(),
            cache: CacheConfig::memory(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            jwt: JwtConfig::new("use-env-variable"),
            session: SessionConfig::default(),
            cache: CacheConfig::new("redis://redis:6379").with_prefix("sg"),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let env = Environment::from_env();
        let mut config = match env {
            Environment::Production => Self::production(),
            _ => Self::development(),
        };
        config.environment = env;
        config.logging = LoggingConfig::for_environment(env);
        config.jwt = JwtConfig::from_env();
        config.cache = CacheConfig::from_env();
        config
    }

    /// Configuration problems that must stop a production start-up
    pub fn validate(&self) -> Result<(), String> {
        if self.environment.is_production() && self.jwt.is_using_default_secret() {
            return Err("JWT secret must be set in production".to_string());
        }
        if self.environment.is_production() && self.cache.backend == StoreBackend::Memory {
            return Err("in-memory session store cannot be shared between instances".to_string());
        }
        self.jwt.validate()
    }
}
