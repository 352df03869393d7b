//! Authentication service module
//!
//! This module provides the login-facing flows built on the token service:
//! - Username/password login through an external credential verifier
//! - Failed login accounting and temporary account locks
//! - Token refresh, logout and request authentication

mod account_lock;
mod service;

#[cfg(test)]
mod tests;

pub use account_lock::{LockoutConfig, LoginLockout};
pub use service::{AuthService, CredentialVerifier, VerifiedPrincipal};
