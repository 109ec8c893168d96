//! Retry backoff for failed background syncs.

use std::time::Duration;

use serde::Serialize;

/// Delay after the first failure.
pub const BACKOFF_BASE: Duration = Duration::from_secs(30);
/// Upper bound on any retry delay.
pub const BACKOFF_MAX: Duration = Duration::from_secs(5 * 60);

/// Delay before retry number `attempts` (1-based): base doubled per extra
/// attempt, capped at [`BACKOFF_MAX`].
pub fn backoff_delay(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(16);
    let delay = BACKOFF_BASE.saturating_mul(1u32 << exponent);
    delay.min(BACKOFF_MAX)
}

// == Failure Record ==
/// A failing endpoint waiting for its next retry.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub endpoint: String,
    pub attempts: u32,
    pub last_error: String,
    /// Unix milliseconds
    pub next_retry_at: u64,
}

impl FailureRecord {
    pub fn first(endpoint: &str, error: String, now: u64) -> Self {
        let mut record = Self {
            endpoint: endpoint.to_string(),
            attempts: 0,
            last_error: String::new(),
            next_retry_at: now,
        };
        record.fail(error, now);
        record
    }

    /// Registers another failure and pushes the retry time out.
    pub fn fail(&mut self, error: String, now: u64) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_error = error;
        self.next_retry_at = now + backoff_delay(self.attempts).as_millis() as u64;
    }

    pub fn is_due(&self, now: u64) -> bool {
        now >= self.next_retry_at
    }
}
