//! Tests for JWT signing and verification

use chrono::{Duration, Utc};

use crate::domain::entities::token::Claims;
use crate::errors::TokenError;
use crate::services::token::TokenSigner;

const SECRET: &[u8] = b"signer-test-secret";

fn claims_at(offset: Duration, ttl: Duration) -> Claims {
    Claims::new_access_token(
        42,
        1,
        "jti-1".to_string(),
        Utc::now() + offset,
        ttl,
        "sessionguard",
        "sessionguard-api",
    )
}

fn signer() -> TokenSigner {
    TokenSigner::new(SECRET, "sessionguard", "sessionguard-api")
}

#[test]
fn test_sign_verify_roundtrip() {
    let signer = signer();
    let claims = claims_at(Duration::zero(), Duration::hours(1));

    let token = signer.sign(&claims).unwrap();
    assert_eq!(signer.verify(&token).unwrap(), claims);
}

#[test]
fn test_expired_token() {
    let signer = signer();
    let token = signer
        .sign(&claims_at(Duration::hours(-2), Duration::hours(1)))
        .unwrap();
    assert_eq!(signer.verify(&token), Err(TokenError::TokenExpired));
}

#[test]
fn test_zero_leeway() {
    let signer = signer();
    let token = signer
        .sign(&claims_at(Duration::seconds(-61), Duration::seconds(60)))
        .unwrap();
    assert_eq!(signer.verify(&token), Err(TokenError::TokenExpired));
}

#[test]
fn test_wrong_secret() {
    let token = signer()
        .sign(&claims_at(Duration::zero(), Duration::hours(1)))
        .unwrap();
    let other = TokenSigner::new(b"different", "sessionguard", "sessionguard-api");
    assert_eq!(other.verify(&token), Err(TokenError::InvalidSignature));
}

#[test]
fn test_wrong_issuer_and_audience() {
    let token = signer()
        .sign(&claims_at(Duration::zero(), Duration::hours(1)))
        .unwrap();

    let other_issuer = TokenSigner::new(SECRET, "someone-else", "sessionguard-api");
    assert_eq!(other_issuer.verify(&token), Err(TokenError::InvalidSignature));

    let other_audience = TokenSigner::new(SECRET, "sessionguard", "another-api");
    assert_eq!(other_audience.verify(&token), Err(TokenError::InvalidSignature));
}

#[test]
fn test_malformed_token() {
    let signer = signer();
    assert_eq!(signer.verify("garbage"), Err(TokenError::MalformedToken));
    assert_eq!(signer.verify("a.b.c"), Err(TokenError::MalformedToken));
}
