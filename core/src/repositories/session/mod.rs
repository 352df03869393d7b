mod memory;
mod store;

pub use memory::InMemorySessionStore;
pub use store::SessionStore;

use std::future::Future;
use std::time::Duration;
use tracing::error;

use crate::errors::{DomainError, DomainResult, StoreError, TokenError};

/// Runs one store call under `timeout`.
///
/// Every failure, including the timeout, surfaces as `StoreUnavailable`.
pub(crate) async fn bounded_call<T, F>(operation: &'static str, timeout: Duration, call: F) -> DomainResult<T>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            millis: timeout.as_millis() as u64,
        }),
    };

    result.map_err(|e| {
        error!(operation, error = %e, "Session store call failed");
        DomainError::Token(TokenError::StoreUnavailable)
    })
}
