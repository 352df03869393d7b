//! Mock implementations for testing authentication service

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::AuthError;
use crate::repositories::InMemorySessionStore;
use crate::services::auth::{AuthService, CredentialVerifier, LoginLockout, VerifiedPrincipal};
use crate::services::token::tests::mocks::FailingStore;
use crate::services::token::{TokenService, TokenServiceConfig};

/// Credential verifier backed by a fixed user table
pub struct MockCredentialVerifier {
    users: HashMap<String, (String, VerifiedPrincipal)>,
    pub unavailable: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockCredentialVerifier {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            unavailable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_user(mut self, username: &str, password: &str, user_id: i64, channel_id: i64) -> Self {
        self.users.insert(
            username.to_string(),
            (password.to_string(), VerifiedPrincipal { user_id, channel_id }),
        );
        self
    }
}

#[async_trait]
impl CredentialVerifier for MockCredentialVerifier {
    async fn verify(&self, username: &str, password: &str) -> Result<VerifiedPrincipal, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::CredentialServiceUnavailable);
        }
        match self.users.get(username) {
            Some((expected, principal)) if expected == password => Ok(*principal),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

pub type TestAuthService = AuthService<InMemorySessionStore, MockCredentialVerifier>;

pub fn auth_service() -> (Arc<InMemorySessionStore>, Arc<MockCredentialVerifier>, TestAuthService) {
    let store = Arc::new(InMemorySessionStore::new());
    let verifier = Arc::new(
        MockCredentialVerifier::new()
            .with_user("alice@example.com", "correct-horse", 42, 1)
            .with_user("bob@example.com", "battery-staple", 7, 2),
    );
    let config = TokenServiceConfig {
        jwt_secret: "auth-test-secret".to_string(),
        ..Default::default()
    };
    let tokens = Arc::new(TokenService::new(store.clone(), config).unwrap());
    let lockout = LoginLockout::with_defaults(store.clone());
    let service = AuthService::new(tokens, lockout, verifier.clone());
    (store, verifier, service)
}

pub type FailingAuthService = AuthService<FailingStore, MockCredentialVerifier>;

pub fn failing_auth_service() -> (Arc<FailingStore>, FailingAuthService) {
    let store = Arc::new(FailingStore::new());
    let verifier = Arc::new(MockCredentialVerifier::new().with_user("alice@example.com", "correct-horse", 42, 1));
    let config = TokenServiceConfig {
        jwt_secret: "auth-test-secret".to_string(),
        ..Default::default()
    };
    let tokens = Arc::new(TokenService::new(store.clone(), config).unwrap());
    let lockout = LoginLockout::with_defaults(store.clone());
    let service = AuthService::new(tokens, lockout, verifier);
    (store, service)
}
