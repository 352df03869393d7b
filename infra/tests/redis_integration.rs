//! Integration tests for the Redis session store
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p sg_infra --test redis_integration -- --ignored

use std::sync::Arc;
use std::time::Duration;

use sg_core::{DomainError, SessionStore, TokenError, TokenService, TokenServiceConfig};
use sg_infra::cache::{CacheConfig, RedisSessionStore};

fn redis_config() -> CacheConfig {
    // Unique namespace per run so parallel tests never see each other's keys
    CacheConfig::new(
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
    )
    .with_prefix(format!("sg-test-{}", uuid::Uuid::new_v4()))
}

async fn store(config: &CacheConfig) -> RedisSessionStore {
    RedisSessionStore::new(config).await.expect("Redis must be running")
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_set_get_delete() {
    let config = redis_config();
    let store = store(&config).await;
    let key = config.make_key("plain");

    assert!(store.ping().await.unwrap());
    store.set(&key, "value", Duration::from_secs(60)).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), Some("value".to_string()));
    assert!(store.exists(&key).await.unwrap());

    assert!(store.delete(&key).await.unwrap());
    assert!(!store.delete(&key).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_expiry() {
    let config = redis_config();
    let store = store(&config).await;
    let key = config.make_key("short");

    store.set(&key, "value", Duration::from_millis(200)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_compare_and_set() {
    let config = redis_config();
    let store = store(&config).await;
    let key = config.make_key("cas");
    let ttl = Duration::from_secs(60);

    assert!(store.compare_and_set(&key, None, "v1", ttl).await.unwrap());
    assert!(!store.compare_and_set(&key, None, "v2", ttl).await.unwrap());
    assert!(!store.compare_and_set(&key, Some("stale"), "v2", ttl).await.unwrap());
    assert!(store.compare_and_set(&key, Some("v1"), "v2", ttl).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap(), Some("v2".to_string()));

    store.delete(&key).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_index_and_scan() {
    let config = redis_config();
    let store = store(&config).await;
    let index = config.make_key("user:1:refresh");
    let ttl = Duration::from_secs(60);

    let a = config.make_key("refresh:a");
    let b = config.make_key("refresh:b");
    store.set_indexed(&a, "1", ttl, &index, ttl).await.unwrap();
    store.set_indexed(&b, "2", ttl, &index, ttl).await.unwrap();

    let mut members = store.index_members(&index).await.unwrap();
    members.sort();
    assert_eq!(members, vec![a.clone(), b.clone()]);

    let mut scanned = store.scan_prefix(&config.make_key("refresh:")).await.unwrap();
    scanned.sort();
    assert_eq!(scanned, vec![a.clone(), b.clone()]);

    assert!(store.index_remove(&index, &a).await.unwrap());
    assert!(!store.index_remove(&index, &a).await.unwrap());
    assert!(store.index_remove(&index, &b).await.unwrap());
    assert!(!store.exists(&index).await.unwrap());

    store.delete(&a).await.unwrap();
    store.delete(&b).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_rotation_and_replay_against_redis() {
    let config = redis_config();
    let store = Arc::new(store(&config).await);
    let service = TokenService::new(
        store.clone(),
        TokenServiceConfig {
            jwt_secret: "redis-integration-secret".to_string(),
            key_prefix: config.key_prefix.clone(),
            ..Default::default()
        },
    )
    .unwrap();

    let first = service.generate_token_pair(42, 1).await.unwrap();
    let second = service.rotate_refresh_token(&first.refresh_token).await.unwrap();

    let err = service.rotate_refresh_token(&first.refresh_token).await.unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::ReplayDetected));

    let err = service.validate_access_token(&second.access_token).await.unwrap_err();
    assert_eq!(err, DomainError::Token(TokenError::TokenRevoked));

    service.revoke_all_for_user(42).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_concurrent_rotation_single_winner() {
    let config = redis_config();
    let store = Arc::new(store(&config).await);
    let service = Arc::new(
        TokenService::new(
            store,
            TokenServiceConfig {
                jwt_secret: "redis-integration-secret".to_string(),
                key_prefix: config.key_prefix.clone(),
                ..Default::default()
            },
        )
        .unwrap(),
    );

    let pair = service.generate_token_pair(7, 2).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let token = pair.refresh_token.clone();
        handles.push(tokio::spawn(async move {
            service.rotate_refresh_token(&token).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    service.revoke_all_for_user(7).await.unwrap();
}
