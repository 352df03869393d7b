//! Explicit wiring of the session services from configuration

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use sg_core::repositories::{InMemorySessionStore, SessionStore};
use sg_core::services::{
    AuthService, CredentialVerifier, IndexCleanupConfig, LockoutConfig, LoginLockout,
    SessionIndexCleanup, TokenService, TokenServiceConfig,
};
use sg_shared::config::{AppConfig, CacheConfig, StoreBackend};

use crate::cache::RedisSessionStore;
use crate::InfrastructureError;

/// Session store shared by every service
pub type SharedStore = Arc<dyn SessionStore>;

/// Fully wired session services over one store
pub struct SessionServices<V: CredentialVerifier + ?Sized> {
    /// The backing store
    pub store: SharedStore,
    /// Token issuance, validation, rotation and revocation
    pub tokens: Arc<TokenService<dyn SessionStore>>,
    /// Login, refresh and logout flows
    pub auth: Arc<AuthService<dyn SessionStore, V>>,
    /// Periodic index cleanup, if enabled
    pub cleanup: Option<JoinHandle<()>>,
}

impl<V: CredentialVerifier + ?Sized> SessionServices<V> {
    /// Stop background tasks
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.abort();
            info!("Session index cleanup stopped");
        }
    }
}

/// Create the configured session store
pub async fn build_store(config: &CacheConfig) -> Result<SharedStore, InfrastructureError> {
    match config.backend {
        StoreBackend::Redis => {
            let store = RedisSessionStore::new(config).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory session store; sessions are not shared between instances");
            Ok(Arc::new(InMemorySessionStore::new()))
        }
    }
}

/// Wire token, lockout and auth services over an existing store
///
/// Must be called from within a Tokio runtime when index cleanup is enabled.
pub fn build_session_services<V: CredentialVerifier + ?Sized>(
    config: &AppConfig,
    store: SharedStore,
    verifier: Arc<V>,
) -> Result<SessionServices<V>, InfrastructureError> {
    let token_config = TokenServiceConfig::from_settings(&config.jwt, &config.session, &config.cache);
    let index_prefix = token_config.user_index_prefix();
    let tokens = Arc::new(TokenService::new(store.clone(), token_config)?);

    let lockout = LoginLockout::new(
        store.clone(),
        LockoutConfig::from_settings(&config.session, &config.cache),
    );
    let auth = Arc::new(AuthService::new(tokens.clone(), lockout, verifier));

    let cleanup = Arc::new(SessionIndexCleanup::new(
        store.clone(),
        IndexCleanupConfig {
            interval_seconds: config.session.cleanup_interval_seconds,
            index_prefix,
            enabled: config.session.cleanup_enabled,
        },
    ))
    .start_background_task();

    info!(
        backend = ?config.cache.backend,
        environment = %config.environment,
        cleanup = cleanup.is_some(),
        "Session services initialized"
    );

    Ok(SessionServices {
        store,
        tokens,
        auth,
        cleanup,
    })
}

/// Load configuration, install tracing, connect the store and wire services
pub async fn start<V: CredentialVerifier + ?Sized>(verifier: Arc<V>) -> anyhow::Result<SessionServices<V>> {
    let config = crate::config::load_config().context("failed to load configuration")?;
    crate::telemetry::init_tracing(&config.logging).context("failed to initialize tracing")?;

    let store = build_store(&config.cache)
        .await
        .context("failed to connect session store")?;
    if !store.ping().await.context("session store health check failed")? {
        anyhow::bail!("session store did not answer PING");
    }

    build_session_services(&config, store, verifier).context("failed to wire session services")
}
