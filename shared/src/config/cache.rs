//! Session store configuration module

use serde::{Deserialize, Serialize};

/// Session store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis instance
    Redis,
    /// Process-local store (single instance, development and tests)
    Memory,
}

/// Session store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Which backend holds the session allow-list
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Redis connection URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub connection_timeout: u64,

    /// Response timeout in seconds
    #[serde(default = "default_timeout")]
    pub response_timeout: u64,

    /// Prefix prepended to every session key, including its separator
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Maximum retry attempts for transient Redis failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry delay in milliseconds (doubled per attempt)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_url(),
            connection_timeout: default_timeout(),
            response_timeout: default_timeout(),
            key_prefix: default_key_prefix(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl CacheConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let backend = match std::env::var("SESSION_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Redis,
        };

        Self {
            backend,
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            key_prefix: std::env::var("SESSION_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            ..defaults
        }
    }

    /// Create a new Redis-backed configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// In-memory store configuration
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Default::default()
        }
    }

    /// Set the key namespace; a `:` separator is appended
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = format!("{}:", prefix.into());
        self
    }

    /// Generate a store key with prefix
    pub fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

fn default_backend() -> StoreBackend {
    StoreBackend::Redis
}

fn default_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_timeout() -> u64 {
    5
}

fn default_key_prefix() -> String {
    String::from("session:")
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.backend, StoreBackend::Redis);
        assert_eq!(config.key_prefix, "session:");
    }

    #[test]
    fn test_cache_config_with_prefix() {
        let config = CacheConfig::new("redis://cache:6379").with_prefix("sg");
        assert_eq!(config.make_key("refresh:abc"), "sg:refresh:abc");
    }

    #[test]
    fn test_backend_deserialization() {
        let config: CacheConfig = serde_json::from_str(r#"{"backend": "memory"}"#).unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.max_retries, 3);
    }
}
