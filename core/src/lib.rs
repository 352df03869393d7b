//! # SessionGuard Core
//!
//! Core token lifecycle logic for SessionGuard.
//! This crate contains the session entities, the token and authentication
//! services, the session store interface with its in-memory implementation,
//! and the error types shared by every layer above it.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod errors;

// Re-export commonly used types for convenience
pub use domain::*;
pub use services::*;
pub use repositories::*;
pub use errors::*;
