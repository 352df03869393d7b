//! Main authentication service implementation

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::entities::token::{AuthenticatedUser, TokenPair};
use crate::errors::{AuthError, DomainResult};
use crate::repositories::SessionStore;
use crate::services::token::TokenService;

use super::account_lock::LoginLockout;

/// Identity returned by a successful credential check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedPrincipal {
    pub user_id: i64,
    pub channel_id: i64,
}

/// Checks a username/password pair against the user directory.
///
/// Implementations return `AuthError::InvalidCredentials` for a wrong
/// password, an unknown user or an inactive channel alike, and
/// `AuthError::CredentialServiceUnavailable` when the directory cannot answer.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> Result<VerifiedPrincipal, AuthError>;
}

/// Authentication service for the login, refresh and logout flows
pub struct AuthService<S, V>
where
    S: SessionStore + ?Sized,
    V: CredentialVerifier + ?Sized,
{
    /// Token service for session management
    token_service: Arc<TokenService<S>>,
    /// Failed login accounting
    lockout: LoginLockout<S>,
    /// External credential check
    verifier: Arc<V>,
}

impl<S, V> AuthService<S, V>
where
    S: SessionStore + ?Sized,
    V: CredentialVerifier + ?Sized,
{
    /// Create a new authentication service
    ///
    /// # Arguments
    ///
    /// * `token_service` - Service for token issuance and revocation
    /// * `lockout` - Failed login accounting, usually over the same store
    /// * `verifier` - Credential check against the user directory
    pub fn new(
        token_service: Arc<TokenService<S>>,
        lockout: LoginLockout<S>,
        verifier: Arc<V>,
    ) -> Self {
        Self {
            token_service,
            lockout,
            verifier,
        }
    }

    pub fn token_service(&self) -> &Arc<TokenService<S>> {
        &self.token_service
    }

    /// Log a user in and issue a token pair
    ///
    /// This method:
    /// 1. Rejects the attempt while the account is locked
    /// 2. Verifies the credentials
    /// 3. Counts a failure, or clears the failure count on success
    /// 4. Issues a token pair for the verified user and channel
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - Login succeeded
    /// * `Err(AuthError::AccountLocked)` - Too many recent failures
    /// * `Err(AuthError::InvalidCredentials)` - Wrong username or password
    pub async fn login(&self, username: &str, password: &str) -> DomainResult<TokenPair> {
        let account = normalize_account(username);

        // Step 1: Lock check before touching the credentials
        self.lockout.check(&account).await?;

        // Step 2: Verify credentials
        let principal = match self.verifier.verify(username, password).await {
            Ok(principal) => principal,
            Err(AuthError::InvalidCredentials) => {
                // Step 3a: Count the failure
                self.lockout.record_failure(&account).await?;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => {
                warn!(error = %e, "Credential verification unavailable");
                return Err(e.into());
            }
        };

        // Step 3b: Reset the failure count
        if let Err(e) = self.lockout.record_success(&account).await {
            warn!(user_id = principal.user_id, error = %e, "Failed to reset login attempts");
        }

        // Step 4: Issue tokens
        let pair = self
            .token_service
            .generate_token_pair(principal.user_id, principal.channel_id)
            .await?;

        info!(user_id = principal.user_id, channel_id = principal.channel_id, "User logged in");
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair
    pub async fn refresh(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        self.token_service.rotate_refresh_token(refresh_token).await
    }

    /// End the session behind `access_token`
    ///
    /// The access token must still be valid. When the client also hands in
    /// its refresh token, that token is deleted as well, provided it belongs
    /// to the same user.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The access session was removed
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> DomainResult<bool> {
        let user = self.token_service.validate_access_token(access_token).await?;
        let removed = self.token_service.revoke_access_token(&user.jti).await?;

        if let Some(refresh_token) = refresh_token {
            self.token_service
                .revoke_user_refresh_token(user.user_id, refresh_token)
                .await?;
        }

        info!(user_id = user.user_id, jti = %user.jti, "User logged out");
        Ok(removed)
    }

    /// Resolve the caller behind an access token
    pub async fn authenticate(&self, access_token: &str) -> DomainResult<AuthenticatedUser> {
        self.token_service.validate_access_token(access_token).await
    }
}

/// Lockout key for a login name
fn normalize_account(username: &str) -> String {
    username.trim().to_lowercase()
}
