//! Main token service implementation

use std::future::Future;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::token::{
    AccessSession, AuthenticatedUser, Claims, RefreshRecord, RefreshState, TokenPair,
};
use crate::errors::{DomainError, DomainResult, StoreError, TokenError};
use crate::repositories::session::bounded_call;
use crate::repositories::SessionStore;

use super::config::TokenServiceConfig;
use super::signer::TokenSigner;

/// Bytes of OS randomness behind each refresh token
const REFRESH_TOKEN_BYTES: usize = 32;

/// Service for issuing, validating, rotating and revoking session tokens
pub struct TokenService<S: SessionStore + ?Sized> {
    pub(crate) store: Arc<S>,
    config: TokenServiceConfig,
    signer: TokenSigner,
}

impl<S: SessionStore + ?Sized> TokenService<S> {
    /// Creates a new token service instance
    ///
    /// # Arguments
    ///
    /// * `store` - Session store holding the allow-list
    /// * `config` - Token service configuration
    ///
    /// # Returns
    ///
    /// A new `TokenService` instance or error if the configuration cannot issue tokens
    pub fn new(store: Arc<S>, config: TokenServiceConfig) -> DomainResult<Self> {
        if config.jwt_secret.is_empty() {
            return Err(DomainError::Internal {
                message: "JWT secret must not be empty".to_string(),
            });
        }
        if config.access_token_expiry_seconds <= 0 || config.refresh_token_expiry_seconds <= 0 {
            return Err(DomainError::Internal {
                message: "Token expiry must be positive".to_string(),
            });
        }

        let signer = TokenSigner::new(config.jwt_secret.as_bytes(), &config.issuer, &config.audience);

        Ok(Self {
            store,
            config,
            signer,
        })
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Issues a fresh access/refresh pair and records both in the store
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - Both sessions persisted
    /// * `Err(TokenError::StoreUnavailable)` - Nothing usable was persisted
    pub async fn generate_token_pair(&self, user_id: i64, channel_id: i64) -> DomainResult<TokenPair> {
        let (pair, _) = self.issue_pair(user_id, channel_id).await?;
        info!(user_id, channel_id, jti = %pair.jti, "Issued token pair");
        Ok(pair)
    }

    /// Verifies an access token and checks that its session is still live
    ///
    /// # Returns
    ///
    /// * `Ok(AuthenticatedUser)` - Token valid and not revoked
    /// * `Err(TokenError::InvalidToken)` - Bad signature, claims or encoding
    /// * `Err(TokenError::TokenExpired)` - Past `exp`
    /// * `Err(TokenError::TokenRevoked)` - Session record gone
    /// * `Err(TokenError::StoreUnavailable)` - Store could not answer
    pub async fn validate_access_token(&self, token: &str) -> DomainResult<AuthenticatedUser> {
        let claims = self.signer.verify(token).map_err(|e| match e {
            TokenError::TokenExpired => TokenError::TokenExpired,
            other => {
                debug!(reason = %other, "Access token rejected");
                TokenError::InvalidToken
            }
        })?;
        let user_id = claims.user_id().map_err(|_| TokenError::InvalidToken)?;

        let key = self.config.access_key(&claims.jti);
        if !self.store_call("exists", self.store.exists(&key)).await? {
            debug!(user_id, jti = %claims.jti, "Access session not found");
            return Err(TokenError::TokenRevoked.into());
        }

        Ok(AuthenticatedUser {
            user_id,
            channel_id: claims.ch,
            jti: claims.jti,
        })
    }

    /// Deletes the access session for `jti`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Session existed and was removed
    /// * `Ok(false)` - Already absent
    pub async fn revoke_access_token(&self, jti: &str) -> DomainResult<bool> {
        let key = self.config.access_key(jti);
        let session = self.store_call("get", self.store.get(&key)).await?;
        let removed = self.store_call("delete", self.store.delete(&key)).await?;

        if let Some(session) = session.and_then(|raw| serde_json::from_str::<AccessSession>(&raw).ok()) {
            let index_key = self.config.user_access_index(session.user_id);
            if let Err(e) = self.store_call("index_remove", self.store.index_remove(&index_key, &key)).await {
                warn!(jti, error = %e, "Failed to unindex revoked access session");
            }
        }

        info!(jti, removed, "Access token revoked");
        Ok(removed)
    }

    /// Exchanges an active refresh token for a new pair, invalidating the old one
    ///
    /// A revoked token being presented again means it leaked; every refresh
    /// token of its owner is then revoked.
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - New pair; the presented token is spent
    /// * `Err(TokenError::InvalidRefreshToken)` - Unknown token
    /// * `Err(TokenError::RefreshTokenExpired)` - Past expiry, nothing changed
    /// * `Err(TokenError::ReplayDetected)` - Token already used
    /// * `Err(TokenError::StoreUnavailable)` - Store could not answer
    pub async fn rotate_refresh_token(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        let key = self.config.refresh_key(&hash_token(refresh_token));

        let raw = self
            .store_call("get", self.store.get(&key))
            .await?
            .ok_or(TokenError::InvalidRefreshToken)?;
        let record: RefreshRecord = serde_json::from_str(&raw).map_err(|e| {
            warn!(error = %e, "Unreadable refresh record");
            TokenError::InvalidRefreshToken
        })?;

        match record.state_at(Utc::now()) {
            RefreshState::Expired => {
                debug!(user_id = record.user_id, "Refresh token expired");
                return Err(TokenError::RefreshTokenExpired.into());
            }
            RefreshState::Revoked => return Err(self.handle_replay(record.user_id).await),
            RefreshState::Active => {}
        }

        // The successor is persisted before the old record is spent
        let (pair, new_digest) = self.issue_pair(record.user_id, record.channel_id).await?;

        let now = Utc::now();
        let Some(ttl) = record.remaining_ttl(now) else {
            // Lapsed while the successor was being written
            self.discard_pair(record.user_id, &pair.jti, &new_digest).await;
            self.store_call("delete", self.store.delete(&key)).await?;
            debug!(user_id = record.user_id, "Refresh token expired during rotation");
            return Err(TokenError::RefreshTokenExpired.into());
        };
        let rotated = serde_json::to_string(&record.rotated(new_digest.clone(), now))
            .map_err(|_| TokenError::TokenGenerationFailed)?;

        match self
            .store_call("compare_and_set", self.store.compare_and_set(&key, Some(&raw), &rotated, ttl))
            .await
        {
            Ok(true) => {
                info!(user_id = record.user_id, jti = %pair.jti, "Refresh token rotated");
                Ok(pair)
            }
            Ok(false) => {
                self.discard_pair(record.user_id, &pair.jti, &new_digest).await;
                Err(self.lost_swap(&key, record.user_id).await)
            }
            Err(e) => {
                self.discard_pair(record.user_id, &pair.jti, &new_digest).await;
                Err(e)
            }
        }
    }

    /// Classifies a rotation whose compare-and-set found the record changed.
    ///
    /// Only a record that is still present, unexpired and spent means the
    /// token was presented twice.
    async fn lost_swap(&self, key: &str, user_id: i64) -> DomainError {
        let current = match self.store_call("get", self.store.get(key)).await {
            Ok(current) => current,
            Err(e) => return e,
        };
        let state = current
            .and_then(|raw| serde_json::from_str::<RefreshRecord>(&raw).ok())
            .map(|record| record.state_at(Utc::now()));

        match state {
            None => {
                debug!(user_id, "Refresh token revoked during rotation");
                TokenError::InvalidRefreshToken.into()
            }
            Some(RefreshState::Expired) => {
                debug!(user_id, "Refresh token expired during rotation");
                TokenError::RefreshTokenExpired.into()
            }
            Some(_) => {
                warn!(user_id, "Refresh token consumed by a concurrent rotation");
                self.handle_replay(user_id).await
            }
        }
    }

    /// Deletes every refresh token belonging to `user_id`
    ///
    /// # Returns
    ///
    /// * `Ok(count)` - Number of refresh records removed
    pub async fn revoke_all_for_user(&self, user_id: i64) -> DomainResult<usize> {
        let index_key = self.config.user_refresh_index(user_id);
        let members = self
            .store_call("index_members", self.store.index_members(&index_key))
            .await?;

        let mut revoked = 0;
        for key in &members {
            if self.delete_owned_refresh(key, user_id).await? {
                revoked += 1;
            }
            // Members only; entries added since the read stay indexed
            self.store_call("index_remove", self.store.index_remove(&index_key, key))
                .await?;
        }

        if self.config.mass_revocation_scan {
            let keys = self
                .store_call("scan_prefix", self.store.scan_prefix(&self.config.refresh_prefix()))
                .await?;
            for key in &keys {
                if self.delete_owned_refresh(key, user_id).await? {
                    revoked += 1;
                }
            }
        }

        info!(user_id, revoked, "Revoked all refresh tokens for user");
        Ok(revoked)
    }

    /// Deletes every access session belonging to `user_id`
    pub async fn revoke_access_sessions(&self, user_id: i64) -> DomainResult<usize> {
        let index_key = self.config.user_access_index(user_id);
        let members = self
            .store_call("index_members", self.store.index_members(&index_key))
            .await?;

        let mut revoked = 0;
        for key in &members {
            let Some(raw) = self.store_call("get", self.store.get(key)).await? else {
                continue;
            };
            match serde_json::from_str::<AccessSession>(&raw) {
                Ok(session) if session.user_id == user_id => {
                    if self.store_call("delete", self.store.delete(key)).await? {
                        revoked += 1;
                    }
                }
                _ => debug!(user_id, key = %key, "Skipping access session of another owner"),
            }
            self.store_call("index_remove", self.store.index_remove(&index_key, key))
                .await?;
        }

        info!(user_id, revoked, "Revoked all access sessions for user");
        Ok(revoked)
    }

    /// Deletes a single refresh token
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Token existed and was removed
    /// * `Ok(false)` - Unknown token
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> DomainResult<bool> {
        let key = self.config.refresh_key(&hash_token(refresh_token));
        let record = self.store_call("get", self.store.get(&key)).await?;
        let removed = self.store_call("delete", self.store.delete(&key)).await?;

        if let Some(record) = record.and_then(|raw| serde_json::from_str::<RefreshRecord>(&raw).ok()) {
            let index_key = self.config.user_refresh_index(record.user_id);
            if let Err(e) = self.store_call("index_remove", self.store.index_remove(&index_key, &key)).await {
                warn!(user_id = record.user_id, error = %e, "Failed to unindex revoked refresh token");
            }
            info!(user_id = record.user_id, removed, "Refresh token revoked");
        }

        Ok(removed)
    }

    /// Deletes a refresh token only if it belongs to `user_id`
    pub async fn revoke_user_refresh_token(&self, user_id: i64, refresh_token: &str) -> DomainResult<bool> {
        let key = self.config.refresh_key(&hash_token(refresh_token));
        if !self.delete_owned_refresh(&key, user_id).await? {
            return Ok(false);
        }

        let index_key = self.config.user_refresh_index(user_id);
        if let Err(e) = self.store_call("index_remove", self.store.index_remove(&index_key, &key)).await {
            warn!(user_id, error = %e, "Failed to unindex revoked refresh token");
        }
        info!(user_id, "Refresh token revoked");
        Ok(true)
    }

    /// Signs a new access token and persists both halves of the pair.
    ///
    /// Returns the pair and the digest of its refresh token.
    async fn issue_pair(&self, user_id: i64, channel_id: i64) -> DomainResult<(TokenPair, String)> {
        let now = Utc::now();
        let jti = Uuid::new_v4().to_string();
        let claims = Claims::new_access_token(
            user_id,
            channel_id,
            jti.clone(),
            now,
            Duration::seconds(self.config.access_token_expiry_seconds),
            &self.config.issuer,
            &self.config.audience,
        );
        let access_token = self.signer.sign(&claims)?;

        let refresh_token = generate_refresh_value();
        let digest = hash_token(&refresh_token);

        let session = AccessSession::new(
            user_id,
            now,
            Duration::seconds(self.config.access_token_expiry_seconds),
        );
        let record = RefreshRecord::new(
            user_id,
            channel_id,
            now,
            Duration::seconds(self.config.refresh_token_expiry_seconds),
        );
        let session_json =
            serde_json::to_string(&session).map_err(|_| TokenError::TokenGenerationFailed)?;
        let record_json =
            serde_json::to_string(&record).map_err(|_| TokenError::TokenGenerationFailed)?;

        let access_key = self.config.access_key(&jti);
        let access_ttl = self.config.access_ttl();
        self.store_call(
            "set_indexed",
            self.store.set_indexed(
                &access_key,
                &session_json,
                access_ttl,
                &self.config.user_access_index(user_id),
                access_ttl,
            ),
        )
        .await?;

        let refresh_key = self.config.refresh_key(&digest);
        let refresh_ttl = self.config.refresh_ttl();
        let written = self
            .store_call(
                "set_indexed",
                self.store.set_indexed(
                    &refresh_key,
                    &record_json,
                    refresh_ttl,
                    &self.config.user_refresh_index(user_id),
                    refresh_ttl,
                ),
            )
            .await;

        if let Err(e) = written {
            self.discard_pair(user_id, &jti, &digest).await;
            return Err(e);
        }

        let pair = TokenPair {
            access_token,
            refresh_token,
            jti,
            access_expires_in: self.config.access_token_expiry_seconds,
            refresh_expires_in: self.config.refresh_token_expiry_seconds,
        };
        Ok((pair, digest))
    }

    /// Best-effort removal of a pair that must never reach a caller
    async fn discard_pair(&self, user_id: i64, jti: &str, digest: &str) {
        let access_key = self.config.access_key(jti);
        let refresh_key = self.config.refresh_key(digest);

        for key in [&access_key, &refresh_key] {
            if let Err(e) = self.store_call("delete", self.store.delete(key)).await {
                error!(user_id, jti, error = %e, "Failed to discard issued session; it will expire by TTL");
            }
        }

        let indexes = [
            (self.config.user_access_index(user_id), &access_key),
            (self.config.user_refresh_index(user_id), &refresh_key),
        ];
        for (index_key, member) in &indexes {
            if let Err(e) = self
                .store_call("index_remove", self.store.index_remove(index_key, member))
                .await
            {
                warn!(user_id, jti, error = %e, "Failed to unindex discarded session; cleanup will prune it");
            }
        }
    }

    /// Mass revocation after a spent refresh token was presented again
    async fn handle_replay(&self, user_id: i64) -> DomainError {
        warn!(user_id, "Refresh token replay detected, revoking all sessions");

        if let Err(e) = self.revoke_all_for_user(user_id).await {
            error!(user_id, error = %e, "Mass revocation after replay incomplete");
        }
        if self.config.revoke_access_on_replay {
            if let Err(e) = self.revoke_access_sessions(user_id).await {
                error!(user_id, error = %e, "Access session revocation after replay incomplete");
            }
        }

        TokenError::ReplayDetected.into()
    }

    /// Deletes the refresh record at `key` if it belongs to `user_id`
    async fn delete_owned_refresh(&self, key: &str, user_id: i64) -> DomainResult<bool> {
        let Some(raw) = self.store_call("get", self.store.get(key)).await? else {
            return Ok(false);
        };
        match serde_json::from_str::<RefreshRecord>(&raw) {
            Ok(record) if record.user_id == user_id => {
                self.store_call("delete", self.store.delete(key)).await
            }
            Ok(_) => Ok(false),
            Err(e) => {
                debug!(key, error = %e, "Skipping unreadable refresh record");
                Ok(false)
            }
        }
    }

    /// Runs one store call under the configured store timeout
    async fn store_call<T, F>(&self, operation: &'static str, call: F) -> DomainResult<T>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        bounded_call(operation, self.config.store_timeout, call).await
    }
}

/// Hashes a token for secure storage
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Opaque refresh token: 32 bytes from the OS CSPRNG, base64url without padding
fn generate_refresh_value() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
