//! Domain entities representing session credentials.

pub mod login_attempt;
pub mod token;

// Re-export commonly used types
pub use login_attempt::LoginAttemptRecord;
pub use token::{
    AccessSession, AuthenticatedUser, Claims, RefreshRecord, RefreshState, TokenPair,
    JWT_AUDIENCE, JWT_ISSUER,
};
