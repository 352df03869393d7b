//! Domain layer containing session entities.

pub mod entities;

// Re-export commonly used domain types
pub use entities::{
    AccessSession, AuthenticatedUser, Claims, LoginAttemptRecord, RefreshRecord, RefreshState,
    TokenPair,
};
