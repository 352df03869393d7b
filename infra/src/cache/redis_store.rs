//! Redis session store implementation
//!
//! Implements `SessionStore` on a multiplexed Redis connection with retry
//! logic for transient failures. Compare-and-set runs as a Lua script and
//! indexed writes run in a `MULTI` pipeline, so both are atomic on the server.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult, Script};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use sg_core::errors::StoreError;
use sg_core::repositories::SessionStore;

use crate::cache::CacheConfig;
use crate::InfrastructureError;

/// Replace KEYS[1] with ARGV[3] (PX ARGV[4]) if it holds ARGV[2], or if it
/// is absent when ARGV[1] is "0".
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
    if current ~= ARGV[2] then
        return 0
    end
elseif current then
    return 0
end
redis.call('SET', KEYS[1], ARGV[3], 'PX', ARGV[4])
return 1
"#;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis-backed session store
///
/// Cheap to clone; all clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Server-side compare-and-set
    cas_script: Arc<Script>,
    /// Maximum number of attempts for idempotent operations
    max_retries: u32,
    /// Base delay between retries (exponential backoff)
    retry_delay_ms: u64,
}

impl RedisSessionStore {
    /// Connect to Redis using the store configuration
    ///
    /// The initial connection is retried with exponential backoff and the
    /// whole attempt is bounded by `connection_timeout`.
    pub async fn new(config: &CacheConfig) -> Result<Self, InfrastructureError> {
        info!(
            url = %mask_url(&config.url),
            max_retries = config.max_retries,
            "Creating Redis session store"
        );

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let max_retries = config.max_retries.max(1);
        let connection = tokio::time::timeout(
            Duration::from_secs(config.connection_timeout),
            Self::create_connection_with_retry(client, max_retries, config.retry_delay_ms),
        )
        .await
        .map_err(|_| {
            error!(
                timeout_secs = config.connection_timeout,
                "Timed out connecting to Redis"
            );
            InfrastructureError::General("Timed out connecting to Redis".to_string())
        })??;

        info!("Redis session store ready");

        Ok(Self {
            connection,
            cas_script: Arc::new(Script::new(COMPARE_AND_SET_SCRIPT)),
            max_retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: Client,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            match client.get_multiplexed_async_connection().await {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    // Exponential backoff with cap at 5 seconds
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// Execute an idempotent operation, retrying transient failures
    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        self.execute(self.max_retries, operation).await
    }

    /// Execute an operation exactly once
    ///
    /// Used for compare-and-set: a retry after an I/O error could observe
    /// its own earlier write and report a lost swap.
    async fn execute_once<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        self.execute(1, operation).await
    }

    async fn execute<F, T>(&self, max_attempts: u32, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay_ms;

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            match operation(conn).await {
                Ok(result) => return Ok(result),
                Err(e) if attempts < max_attempts && is_retriable_error(&e) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_attempts, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        debug!(key, "GET");
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            Box::pin(async move { conn.get::<_, Option<String>>(key).await })
        })
        .await
        .map_err(|e| store_error("get", key, e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let ttl_ms = ttl_millis(ttl);
        debug!(key, ttl_ms, "SET");
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            let value = value.to_string();
            Box::pin(async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl_ms)
                    .query_async::<_, ()>(&mut conn)
                    .await
            })
        })
        .await
        .map_err(|e| store_error("set", key, e))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        debug!(key, "DEL");
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            Box::pin(async move { conn.del::<_, u32>(key).await })
        })
        .await
        .map(|deleted| deleted > 0)
        .map_err(|e| store_error("delete", key, e))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        debug!(key, "EXISTS");
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            Box::pin(async move { conn.exists::<_, bool>(key).await })
        })
        .await
        .map_err(|e| store_error("exists", key, e))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let pattern = format!("{}*", escape_pattern(prefix));
        debug!(%pattern, "SCAN");
        self.execute_with_retry(|mut conn| {
            let pattern = pattern.clone();
            Box::pin(async move {
                let mut keys = Vec::new();
                let mut iter = conn.scan_match::<_, String>(pattern).await?;
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
                Ok::<_, RedisError>(keys)
            })
        })
        .await
        .map_err(|e| store_error("scan_prefix", prefix, e))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let ttl_ms = ttl_millis(ttl);
        debug!(key, ttl_ms, "compare-and-set");
        self.execute_once(|mut conn| {
            let script = self.cas_script.clone();
            let key = key.to_string();
            let guarded = if expected.is_some() { "1" } else { "0" };
            let expected = expected.unwrap_or_default().to_string();
            let value = value.to_string();
            Box::pin(async move {
                script
                    .key(key)
                    .arg(guarded)
                    .arg(expected)
                    .arg(value)
                    .arg(ttl_ms)
                    .invoke_async::<_, i64>(&mut conn)
                    .await
            })
        })
        .await
        .map(|applied| applied == 1)
        .map_err(|e| store_error("compare_and_set", key, e))
    }

    async fn set_indexed(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        index_key: &str,
        index_ttl: Duration,
    ) -> Result<(), StoreError> {
        let ttl_ms = ttl_millis(ttl);
        let index_ttl_ms = ttl_millis(index_ttl);
        debug!(key, index_key, ttl_ms, "SET + SADD");
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            let value = value.to_string();
            let index_key = index_key.to_string();
            Box::pin(async move {
                redis::pipe()
                    .atomic()
                    .cmd("SET")
                    .arg(&key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl_ms)
                    .ignore()
                    .cmd("SADD")
                    .arg(&index_key)
                    .arg(&key)
                    .ignore()
                    .cmd("PEXPIRE")
                    .arg(&index_key)
                    .arg(index_ttl_ms)
                    .ignore()
                    .query_async::<_, ()>(&mut conn)
                    .await
            })
        })
        .await
        .map_err(|e| store_error("set_indexed", key, e))
    }

    async fn index_members(&self, index_key: &str) -> Result<Vec<String>, StoreError> {
        debug!(index_key, "SMEMBERS");
        self.execute_with_retry(|mut conn| {
            let index_key = index_key.to_string();
            Box::pin(async move { conn.smembers::<_, Vec<String>>(index_key).await })
        })
        .await
        .map_err(|e| store_error("index_members", index_key, e))
    }

    async fn index_remove(&self, index_key: &str, member: &str) -> Result<bool, StoreError> {
        debug!(index_key, member, "SREM");
        self.execute_with_retry(|mut conn| {
            let index_key = index_key.to_string();
            let member = member.to_string();
            Box::pin(async move { conn.srem::<_, _, u32>(index_key, member).await })
        })
        .await
        .map(|removed| removed > 0)
        .map_err(|e| store_error("index_remove", index_key, e))
    }

    async fn ping(&self) -> Result<bool, StoreError> {
        debug!("Performing Redis health check");
        let response = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await
            .map_err(|e| store_error("ping", "", e))?;

        if response == "PONG" {
            Ok(true)
        } else {
            warn!("Redis health check returned unexpected response: {}", response);
            Ok(false)
        }
    }
}

/// Log a failed Redis call and map it to the store error surface
fn store_error(operation: &'static str, key: &str, error: RedisError) -> StoreError {
    error!(operation, key, error = %error, "Redis operation failed");
    StoreError::Unavailable {
        message: format!("{} failed: {}", operation, error),
    }
}

/// TTL in whole milliseconds, never below one
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Escape glob metacharacters so a key prefix matches literally in `SCAN MATCH`
pub(crate) fn escape_pattern(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Check if a Redis error is retriable
///
/// Determines if an error is transient and the operation should be retried.
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
