//! Authentication and session configuration

use serde::{Deserialize, Serialize};

const DEFAULT_SECRET: &str = "development-secret-please-change-in-production";

/// JWT authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// Shared HMAC secret for signing access tokens
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Access token expiry time in seconds
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry: i64,

    /// JWT issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// JWT audience claim
    #[serde(default = "default_audience")]
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            access_token_expiry: default_access_expiry(),
            refresh_token_expiry: default_refresh_expiry(),
            issuer: default_issuer(),
            audience: default_audience(),
        }
    }
}

impl JwtConfig {
    /// Create a new JWT configuration with secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret: std::env::var("JWT_SECRET").unwrap_or(defaults.secret),
            access_token_expiry: std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.access_token_expiry),
            refresh_token_expiry: std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.refresh_token_expiry),
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86400;
        self
    }

    /// Check if using default secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }

    /// Reject configurations that cannot issue usable tokens
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("JWT secret must not be empty".to_string());
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err("token expiry must be positive".to_string());
        }
        if self.refresh_token_expiry <= self.access_token_expiry {
            return Err("refresh token must outlive the access token".to_string());
        }
        Ok(())
    }
}

/// Session lifecycle policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Timeout applied to every session store call, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Also sweep the whole refresh keyspace during mass revocation
    #[serde(default)]
    pub mass_revocation_scan: bool,

    /// Delete the user's access sessions when a refresh replay is detected
    #[serde(default = "default_true")]
    pub revoke_access_on_replay: bool,

    /// Prior failed logins at which the next failure locks the account
    #[serde(default = "default_lock_threshold")]
    pub lock_threshold: u32,

    /// Account lock duration in minutes
    #[serde(default = "default_lock_minutes")]
    pub lock_duration_minutes: i64,

    /// Run the periodic index cleanup task
    #[serde(default = "default_true")]
    pub cleanup_enabled: bool,

    /// Index cleanup interval in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout_ms(),
            mass_revocation_scan: false,
            revoke_access_on_replay: true,
            lock_threshold: default_lock_threshold(),
            lock_duration_minutes: default_lock_minutes(),
            cleanup_enabled: true,
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

fn default_secret() -> String {
    String::from(DEFAULT_SECRET)
}

fn default_access_expiry() -> i64 {
    3600 // 1 hour
}

fn default_refresh_expiry() -> i64 {
    30 * 86400 // 30 days
}

fn default_issuer() -> String {
    String::from("sessionguard")
}

fn default_audience() -> String {
    String::from("sessionguard-api")
}

fn default_store_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_lock_threshold() -> u32 {
    4
}

fn default_lock_minutes() -> i64 {
    30
}

fn default_cleanup_interval() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_config_default() {
        let config = JwtConfig::default();
        assert_eq!(config.access_token_expiry, 3600);
        assert_eq!(config.refresh_token_expiry, 2_592_000);
        assert!(config.is_using_default_secret());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_jwt_config_builder() {
        let config = JwtConfig::new("my-secret")
            .with_access_expiry_minutes(30)
            .with_refresh_expiry_days(14);

        assert_eq!(config.access_token_expiry, 1800);
        assert_eq!(config.refresh_token_expiry, 1_209_600);
        assert!(!config.is_using_default_secret());
    }

    #[test]
    fn test_jwt_config_rejects_inverted_expiry() {
        let config = JwtConfig::new("s")
            .with_access_expiry_minutes(60)
            .with_refresh_expiry_days(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.lock_threshold, 4);
        assert_eq!(config.lock_duration_minutes, 30);
        assert!(config.revoke_access_on_replay);
        assert!(!config.mass_revocation_scan);
    }

    #[test]
    fn test_session_config_partial_json() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"mass_revocation_scan": true}"#).unwrap();
        assert!(config.mass_revocation_scan);
        assert_eq!(config.store_timeout_ms, 2000);
    }
}
