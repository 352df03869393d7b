//! Login lockout for brute force protection
//!
//! Consecutive failed logins are counted per account in the session store.
//! A failure that arrives when `lock_threshold` failures are already on record
//! locks the account for `lock_duration`. With the defaults (4, 30 minutes)
//! the fifth consecutive failure locks the account.

use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use sg_shared::{CacheConfig, SessionConfig};

use crate::domain::entities::LoginAttemptRecord;
use crate::errors::{AuthError, DomainError, DomainResult};
use crate::repositories::session::bounded_call;
use crate::repositories::SessionStore;

/// Attempts at a compare-and-set update before giving up
const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Configuration for login lockout
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    /// Prior failures at which the next failure locks the account (default: 4)
    pub lock_threshold: u32,
    /// How long a lock lasts (default: 30 minutes)
    pub lock_duration: Duration,
    /// How long a failure count is remembered without activity (default: 24 hours)
    pub attempt_window: Duration,
    /// Prefix for attempt record keys
    pub key_prefix: String,
    /// Upper bound on any single store call
    pub store_timeout: std::time::Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            lock_threshold: 4,
            lock_duration: Duration::minutes(30),
            attempt_window: Duration::hours(24),
            key_prefix: "session:login:".to_string(),
            store_timeout: std::time::Duration::from_millis(2000),
        }
    }
}

impl LockoutConfig {
    pub fn from_settings(session: &SessionConfig, cache: &CacheConfig) -> Self {
        Self {
            lock_threshold: session.lock_threshold,
            lock_duration: Duration::minutes(session.lock_duration_minutes),
            key_prefix: cache.make_key("login:"),
            store_timeout: std::time::Duration::from_millis(session.store_timeout_ms),
            ..Default::default()
        }
    }
}

/// Service tracking failed logins and account locks
pub struct LoginLockout<S: SessionStore + ?Sized> {
    store: Arc<S>,
    config: LockoutConfig,
}

impl<S: SessionStore + ?Sized> LoginLockout<S> {
    /// Create a new lockout service
    pub fn new(store: Arc<S>, config: LockoutConfig) -> Self {
        Self { store, config }
    }

    /// Create a new lockout service with default configuration
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, LockoutConfig::default())
    }

    fn get_attempt_key(&self, account: &str) -> String {
        format!("{}{}", self.config.key_prefix, account)
    }

    fn record_ttl(&self) -> std::time::Duration {
        self.config
            .attempt_window
            .max(self.config.lock_duration)
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(86400))
    }

    /// Fails with `AccountLocked` while a lock is active
    ///
    /// # Arguments
    /// * `account` - Normalized login name
    pub async fn check(&self, account: &str) -> DomainResult<()> {
        let (_, record) = self.load(account).await?;
        match record.active_lock(Utc::now()) {
            Some(until) => {
                debug!(account, %until, "Login rejected, account locked");
                Err(AuthError::AccountLocked { until }.into())
            }
            None => Ok(()),
        }
    }

    /// Records one failed login and locks the account when the threshold is reached
    ///
    /// # Returns
    /// * `Ok(LoginAttemptRecord)` - The record as stored after this failure
    pub async fn record_failure(&self, account: &str) -> DomainResult<LoginAttemptRecord> {
        let key = self.get_attempt_key(account);

        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let (raw, current) = self.load(account).await?;
            let now = Utc::now();

            let prior = current.failed_count;
            let mut updated = LoginAttemptRecord {
                failed_count: prior.saturating_add(1),
                ..current
            };
            if prior >= self.config.lock_threshold {
                updated.locked_until = Some(now + self.config.lock_duration);
            }

            let value = serde_json::to_string(&updated).map_err(|e| DomainError::Internal {
                message: format!("Failed to serialize login attempts: {}", e),
            })?;

            let swapped = bounded_call(
                "compare_and_set",
                self.config.store_timeout,
                self.store.compare_and_set(&key, raw.as_deref(), &value, self.record_ttl()),
            )
            .await?;
            if swapped {
                warn!(
                    account,
                    attempts = updated.failed_count,
                    threshold = self.config.lock_threshold,
                    "Failed login attempt recorded"
                );
                if let (true, Some(until)) =
                    (prior >= self.config.lock_threshold, updated.locked_until)
                {
                    info!(account, %until, "Account locked due to failed login attempts");
                }
                return Ok(updated);
            }
        }

        Err(DomainError::Internal {
            message: "Login attempt record update contended".to_string(),
        })
    }

    /// Clears the failure count after a successful login
    pub async fn record_success(&self, account: &str) -> DomainResult<()> {
        let key = self.get_attempt_key(account);
        bounded_call("delete", self.config.store_timeout, self.store.delete(&key)).await?;
        Ok(())
    }

    /// Current lock expiry, if any
    pub async fn locked_until(&self, account: &str) -> DomainResult<Option<DateTime<Utc>>> {
        let (_, record) = self.load(account).await?;
        Ok(record.active_lock(Utc::now()))
    }

    /// Raw stored value (for compare-and-set) and its parsed record
    async fn load(&self, account: &str) -> DomainResult<(Option<String>, LoginAttemptRecord)> {
        let key = self.get_attempt_key(account);
        let raw = bounded_call("get", self.config.store_timeout, self.store.get(&key)).await?;
        let record = match raw.as_deref() {
            Some(value) => serde_json::from_str(value).unwrap_or_else(|e| {
                warn!(account, error = %e, "Unreadable login attempt record, starting over");
                LoginAttemptRecord::default()
            }),
            None => LoginAttemptRecord::default(),
        };
        Ok((raw, record))
    }
}
