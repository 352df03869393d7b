//! Unit tests for authentication service

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::errors::{AuthError, DomainError, TokenError};

use super::mocks::{auth_service, failing_auth_service};

#[tokio::test]
async fn test_login_success() {
    let (_, _, service) = auth_service();

    let pair = service.login("alice@example.com", "correct-horse").await.unwrap();
    let user = service.authenticate(&pair.access_token).await.unwrap();
    assert_eq!(user.user_id, 42);
    assert_eq!(user.channel_id, 1);
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let (_, _, service) = auth_service();

    let err = service.login("alice@example.com", "wrong").await.unwrap_err();
    assert_eq!(err, DomainError::Auth(AuthError::InvalidCredentials));

    let err = service.login("nobody@example.com", "whatever").await.unwrap_err();
    assert_eq!(err, DomainError::Auth(AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_fifth_failed_login_locks_account() {
    let (_, verifier, service) = auth_service();

    for _ in 0..5 {
        let err = service.login("alice@example.com", "wrong").await.unwrap_err();
        assert_eq!(err, DomainError::Auth(AuthError::InvalidCredentials));
    }

    // Correct password no longer helps, and the verifier is not consulted
    let calls_before = verifier.calls.load(Ordering::SeqCst);
    let err = service.login("alice@example.com", "correct-horse").await.unwrap_err();
    assert!(matches!(err, DomainError::Auth(AuthError::AccountLocked { .. })));
    assert_eq!(verifier.calls.load(Ordering::SeqCst), calls_before);

    // Other accounts are unaffected
    assert!(service.login("bob@example.com", "battery-staple").await.is_ok());
}

#[tokio::test]
async fn test_lockout_key_is_case_insensitive() {
    let (_, _, service) = auth_service();

    for _ in 0..5 {
        let _ = service.login(" Alice@Example.com", "wrong").await;
    }
    let err = service.login("alice@example.com", "correct-horse").await.unwrap_err();
    assert!(matches!(err, DomainError::Auth(AuthError::AccountLocked { .. })));
}

#[tokio::test]
async fn test_successful_login_resets_failures() {
    let (_, _, service) = auth_service();

    for _ in 0..4 {
        let _ = service.login("alice@example.com", "wrong").await;
    }
    service.login("alice@example.com", "correct-horse").await.unwrap();
    for _ in 0..4 {
        let _ = service.login("alice@example.com", "wrong").await;
    }
    assert!(service.login("alice@example.com", "correct-horse").await.is_ok());
}

#[tokio::test]
async fn test_verifier_outage_is_not_counted() {
    let (_, verifier, service) = auth_service();
    verifier.unavailable.store(true, Ordering::SeqCst);

    for _ in 0..6 {
        let err = service.login("alice@example.com", "wrong").await.unwrap_err();
        assert_eq!(err, DomainError::Auth(AuthError::CredentialServiceUnavailable));
    }

    verifier.unavailable.store(false, Ordering::SeqCst);
    assert!(service.login("alice@example.com", "correct-horse").await.is_ok());
}

#[tokio::test]
async fn test_refresh_and_replay() {
    let (_, _, service) = auth_service();
    let first = service.login("alice@example.com", "correct-horse").await.unwrap();

    let second = service.refresh(&first.refresh_token).await.unwrap();
    assert!(service.authenticate(&second.access_token).await.is_ok());

    let err = service.refresh(&first.refresh_token).await.unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::ReplayDetected));
}

#[tokio::test]
async fn test_logout() {
    let (_, _, service) = auth_service();
    let pair = service.login("alice@example.com", "correct-horse").await.unwrap();

    assert!(service.logout(&pair.access_token, Some(&pair.refresh_token)).await.unwrap());

    let err = service.authenticate(&pair.access_token).await.unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::TokenRevoked));
    let err = service.refresh(&pair.refresh_token).await.unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::InvalidRefreshToken));

    // A second logout with the same token is rejected
    let err = service.logout(&pair.access_token, None).await.unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::TokenRevoked));
}

#[tokio::test]
async fn test_logout_keeps_refresh_token_of_other_user() {
    let (_, _, service) = auth_service();
    let alice = service.login("alice@example.com", "correct-horse").await.unwrap();
    let bob = service.login("bob@example.com", "battery-staple").await.unwrap();

    service.logout(&alice.access_token, Some(&bob.refresh_token)).await.unwrap();
    assert!(service.refresh(&bob.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_logout_without_refresh_token_keeps_it() {
    let (_, _, service) = auth_service();
    let pair = service.login("alice@example.com", "correct-horse").await.unwrap();

    service.logout(&pair.access_token, None).await.unwrap();
    assert!(service.refresh(&pair.refresh_token).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_login_does_not_hang_on_stalled_store() {
    let (store, service) = failing_auth_service();
    store.hang(true);

    let outcome = tokio::time::timeout(
        Duration::from_secs(60),
        service.login("alice@example.com", "correct-horse"),
    )
    .await
    .expect("login must give up within the store timeout");
    assert_eq!(
        outcome.unwrap_err(),
        DomainError::Token(TokenError::StoreUnavailable)
    );
}

#[tokio::test]
async fn test_login_fails_closed_when_store_down() {
    let (store, service) = failing_auth_service();
    store.fail_all(true);

    let err = service.login("alice@example.com", "correct-horse").await.unwrap_err();
    assert!(err.is_retryable());
}
