//! Session index cleanup service for periodic maintenance of per-user indexes
//!
//! Records expire by TTL on their own, but their entries in the per-user
//! index sets only go away when the whole set expires. This service prunes
//! members whose record is already gone so the indexes stay proportional to
//! live sessions.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::errors::DomainResult;
use crate::repositories::SessionStore;

/// Configuration for index cleanup service
#[derive(Debug, Clone)]
pub struct IndexCleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_seconds: u64,
    /// Prefix shared by all per-user index keys
    pub index_prefix: String,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for IndexCleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600, // Run every hour
            index_prefix: "session:user:".to_string(),
            enabled: true,
        }
    }
}

/// Service pruning stale members from per-user session indexes
pub struct SessionIndexCleanup<S: SessionStore + ?Sized + 'static> {
    store: Arc<S>,
    config: IndexCleanupConfig,
}

impl<S: SessionStore + ?Sized + 'static> SessionIndexCleanup<S> {
    /// Create a new index cleanup service
    pub fn new(store: Arc<S>, config: IndexCleanupConfig) -> Self {
        Self { store, config }
    }

    /// Run a single cleanup cycle
    ///
    /// A failure on one index is recorded in the result and the cycle moves
    /// on to the next index.
    pub async fn run_cleanup(&self) -> DomainResult<CleanupResult> {
        if !self.config.enabled {
            return Ok(CleanupResult::default());
        }

        info!("Starting session index cleanup cycle");

        let mut result = CleanupResult::default();
        let indexes = self.store.scan_prefix(&self.config.index_prefix).await?;

        for index_key in indexes {
            match self.prune_index(&index_key).await {
                Ok(removed) => {
                    result.indexes_scanned += 1;
                    result.stale_members_removed += removed;
                }
                Err(e) => {
                    error!(index = %index_key, "Failed to prune index: {}", e);
                    result.errors.push(format!("{}: {}", index_key, e));
                }
            }
        }

        info!(
            "Session index cleanup completed - Indexes: {}, Stale members: {}",
            result.indexes_scanned, result.stale_members_removed
        );

        Ok(result)
    }

    /// Removes members of `index_key` whose record has expired
    async fn prune_index(&self, index_key: &str) -> DomainResult<usize> {
        let mut removed = 0;
        for member in self.store.index_members(index_key).await? {
            if !self.store.exists(&member).await?
                && self.store.index_remove(index_key, &member).await?
            {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(index = %index_key, removed, "Pruned stale index members");
        }
        Ok(removed)
    }

    /// Start the cleanup service as a background task
    ///
    /// This spawns a tokio task that runs cleanup at regular intervals.
    /// Returns `None` when cleanup is disabled.
    pub fn start_background_task(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Session index cleanup is disabled");
            return None;
        }

        let interval = Duration::from_secs(self.config.interval_seconds.max(1));

        Some(tokio::spawn(async move {
            info!(
                "Session index cleanup started - will run every {} seconds",
                self.config.interval_seconds
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                match self.run_cleanup().await {
                    Ok(result) => {
                        if !result.errors.is_empty() {
                            warn!("Cleanup completed with errors: {:?}", result.errors);
                        }
                    }
                    Err(e) => {
                        error!("Session index cleanup cycle failed: {}", e);
                    }
                }
            }
        }))
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of index keys examined
    pub indexes_scanned: usize,
    /// Number of members pointing at expired records
    pub stale_members_removed: usize,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupResult {
    /// Check if the cleanup was successful (no errors)
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
