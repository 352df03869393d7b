//! Configuration for the token service

use std::time::Duration;

use sg_shared::{CacheConfig, JwtConfig, SessionConfig};

use crate::domain::entities::token::{JWT_AUDIENCE, JWT_ISSUER};

/// Configuration for the token service
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// JWT issuer claim
    pub issuer: String,
    /// JWT audience claim
    pub audience: String,
    /// Access token expiry in seconds
    pub access_token_expiry_seconds: i64,
    /// Refresh token expiry in seconds
    pub refresh_token_expiry_seconds: i64,
    /// Namespace prepended to every store key
    pub key_prefix: String,
    /// Upper bound on any single store call
    pub store_timeout: Duration,
    /// Sweep the whole refresh keyspace during mass revocation
    pub mass_revocation_scan: bool,
    /// Delete access sessions too when a replay is detected
    pub revoke_access_on_replay: bool,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "development-secret-please-change-in-production".to_string(),
            issuer: JWT_ISSUER.to_string(),
            audience: JWT_AUDIENCE.to_string(),
            access_token_expiry_seconds: 3600,
            refresh_token_expiry_seconds: 30 * 86400,
            key_prefix: "session:".to_string(),
            store_timeout: Duration::from_millis(2000),
            mass_revocation_scan: false,
            revoke_access_on_replay: true,
        }
    }
}

impl TokenServiceConfig {
    /// Build from the shared application configuration sections
    pub fn from_settings(jwt: &JwtConfig, session: &SessionConfig, cache: &CacheConfig) -> Self {
        Self {
            jwt_secret: jwt.secret.clone(),
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
            access_token_expiry_seconds: jwt.access_token_expiry,
            refresh_token_expiry_seconds: jwt.refresh_token_expiry,
            key_prefix: cache.key_prefix.clone(),
            store_timeout: Duration::from_millis(session.store_timeout_ms),
            mass_revocation_scan: session.mass_revocation_scan,
            revoke_access_on_replay: session.revoke_access_on_replay,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_expiry_seconds.max(1) as u64)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expiry_seconds.max(1) as u64)
    }

    /// `{prefix}{jti}`
    pub fn access_key(&self, jti: &str) -> String {
        format!("{}{}", self.key_prefix, jti)
    }

    /// `{prefix}refresh:{digest}`
    pub fn refresh_key(&self, digest: &str) -> String {
        format!("{}{}", self.refresh_prefix(), digest)
    }

    pub fn refresh_prefix(&self) -> String {
        format!("{}refresh:", self.key_prefix)
    }

    /// Prefix shared by every per-user index key
    pub fn user_index_prefix(&self) -> String {
        format!("{}user:", self.key_prefix)
    }

    pub fn user_refresh_index(&self, user_id: i64) -> String {
        format!("{}{}:refresh", self.user_index_prefix(), user_id)
    }

    pub fn user_access_index(&self, user_id: i64) -> String {
        format!("{}{}:access", self.user_index_prefix(), user_id)
    }
}
