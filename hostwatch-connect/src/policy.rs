//! How hard to try reaching the collector at startup.

use std::time::Duration;

/// Whether the check gives up eventually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// Retry this many times after the first attempt, then fail.
    Finite(u32),
    /// Retry until the endpoint answers or the check is cancelled.
    Infinite,
}

/// Retry configuration for the startup connectivity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Negative means retry forever.
    pub retries: i32,
    /// Upper bound for a single attempt.
    pub attempt_timeout: Duration,
    /// First wait after a failed attempt.
    pub min_backoff: Duration,
    /// Longest wait between attempts.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn mode(&self) -> RetryMode {
        match u32::try_from(self.retries) {
            Ok(retries) => RetryMode::Finite(retries),
            Err(_) => RetryMode::Infinite,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 6,
            attempt_timeout: Duration::from_secs(10),
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}
