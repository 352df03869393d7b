//! Failed login accounting entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Consecutive failed login attempts for one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    /// Failures since the last successful login
    pub failed_count: u32,

    /// End of the current lock, if any
    pub locked_until: Option<DateTime<Utc>>,
}

impl LoginAttemptRecord {
    /// Returns the lock expiry when the account is locked at `now`
    pub fn active_lock(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.locked_until.filter(|until| *until > now)
    }
}
