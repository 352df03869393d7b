//! Token service module for session credential management
//!
//! This module handles all token-related operations including:
//! - JWT access token signing and verification
//! - Opaque refresh token issuance and single-use rotation
//! - Replay detection with mass revocation
//! - Background pruning of per-user session indexes

mod cleanup;
mod config;
mod service;
mod signer;

#[cfg(test)]
pub(crate) mod tests;

pub use cleanup::{CleanupResult, IndexCleanupConfig, SessionIndexCleanup};
pub use config::TokenServiceConfig;
pub use service::TokenService;
pub use signer::TokenSigner;
