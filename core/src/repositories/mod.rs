//! Storage abstractions for session state.

pub mod session;

pub use session::{InMemorySessionStore, SessionStore};
