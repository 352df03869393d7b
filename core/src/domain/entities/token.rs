//! Token entities for JWT access sessions and opaque refresh tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default JWT issuer
pub const JWT_ISSUER: &str = "sessionguard";

/// Default JWT audience
pub const JWT_AUDIENCE: &str = "sessionguard-api";

/// Claims structure for JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Channel the session was issued for
    pub ch: i64,

    /// JWT ID (unique identifier for the token)
    pub jti: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,
}

impl Claims {
    /// Creates new claims for an access token
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user's numeric id
    /// * `channel_id` - The channel the user signed in through
    /// * `jti` - Unique token id, also the access session key
    /// * `issued_at` - Issuance instant
    /// * `ttl` - Token lifetime
    pub fn new_access_token(
        user_id: i64,
        channel_id: i64,
        jti: String,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        issuer: &str,
        audience: &str,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            ch: channel_id,
            jti,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
        }
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Gets the user ID from the subject claim
    pub fn user_id(&self) -> Result<i64, std::num::ParseIntError> {
        self.sub.parse()
    }
}

/// Server-side record backing one access token, keyed by its `jti`.
///
/// The presence of this record is what makes a correctly signed token valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSession {
    /// Owner of the session
    pub user_id: i64,

    /// Timestamp when the session was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the session expires
    pub expires_at: DateTime<Utc>,
}

impl AccessSession {
    pub fn new(user_id: i64, created_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            user_id,
            created_at,
            expires_at: created_at + ttl,
        }
    }
}

/// Lifecycle state of a refresh record at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// Usable for exactly one rotation
    Active,
    /// Past its expiry, whatever the revoked flag says
    Expired,
    /// Already rotated or revoked; presenting it again is a replay
    Revoked,
}

/// Refresh token record stored under the digest of the opaque token value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRecord {
    /// User ID this token belongs to
    pub user_id: i64,

    /// Channel the token was issued for
    pub channel_id: i64,

    /// Timestamp when the token was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the token expires
    pub expires_at: DateTime<Utc>,

    /// Whether the token has been revoked
    pub revoked: bool,

    /// Digest of the successor token when revoked by rotation
    pub replaced_by: Option<String>,

    /// Timestamp of the revocation
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshRecord {
    /// Creates a new, active refresh record
    pub fn new(user_id: i64, channel_id: i64, created_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            user_id,
            channel_id,
            created_at,
            expires_at: created_at + ttl,
            revoked: false,
            replaced_by: None,
            revoked_at: None,
        }
    }

    /// Checks if the refresh token has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Classifies the record. Expiry takes precedence over revocation.
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshState {
        if self.is_expired_at(now) {
            RefreshState::Expired
        } else if self.revoked {
            RefreshState::Revoked
        } else {
            RefreshState::Active
        }
    }

    /// Returns the record as it looks after being consumed by a rotation
    pub fn rotated(&self, successor: String, now: DateTime<Utc>) -> Self {
        Self {
            revoked: true,
            replaced_by: Some(successor),
            revoked_at: Some(now),
            ..self.clone()
        }
    }

    /// Time left until expiry, `None` once expired
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.expires_at - now)
            .to_std()
            .ok()
            .filter(|remaining| !remaining.is_zero())
    }
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// Opaque refresh token
    pub refresh_token: String,

    /// Id of the access session backing `access_token`
    pub jti: String,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,
}

/// Identity extracted from a validated access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub channel_id: i64,
    pub jti: String,
}
