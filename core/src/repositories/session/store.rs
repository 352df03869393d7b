//! Session store trait defining the key/value contract for session state.

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::StoreError;

/// Key/value store holding access sessions, refresh records and the per-user
/// indexes over them.
///
/// Keys expire automatically after their TTL. Apart from `compare_and_set`
/// and `set_indexed`, no operation is atomic across calls, and
/// `scan_prefix` may miss or repeat keys written concurrently.
///
/// # Security Considerations
/// - Refresh tokens are stored under their digest, never verbatim
/// - A missing access session means the token is revoked
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get the string value at `key`
    ///
    /// # Returns
    /// * `Ok(Some(value))` - Key present and not expired
    /// * `Ok(None)` - Key absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set `key` to `value`, replacing any previous value and TTL
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Delete `key`
    ///
    /// # Returns
    /// * `Ok(true)` - Key existed and was removed
    /// * `Ok(false)` - Key was already absent
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Check whether `key` is present and not expired
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Enumerate keys starting with `prefix`
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Atomically replace the value at `key` if it still equals `expected`
    ///
    /// `expected = None` means the key must be absent.
    ///
    /// # Returns
    /// * `Ok(true)` - Swap applied
    /// * `Ok(false)` - Current value differs, nothing written
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Write `key` and add it to the set at `index_key` in one atomic step.
    ///
    /// The index TTL is reset to `index_ttl`.
    async fn set_indexed(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        index_key: &str,
        index_ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Members of the set at `index_key`
    async fn index_members(&self, index_key: &str) -> Result<Vec<String>, StoreError>;

    /// Remove `member` from the set at `index_key`
    async fn index_remove(&self, index_key: &str, member: &str) -> Result<bool, StoreError>;

    /// Liveness check
    async fn ping(&self) -> Result<bool, StoreError>;
}
