//! Exponential back-off between connectivity attempts.

use std::time::Duration;

/// Tracks the wait between consecutive failed attempts.
///
/// Each call to [`next_wait`](Self::next_wait) returns the current wait and
/// doubles it for the next call, capped at `max_wait`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_wait: Duration,
    current_wait: Duration,
}

impl ExponentialBackoff {
    /// Create a new back-off tracker. `max_wait` below `init_wait` is raised
    /// to `init_wait`.
    pub fn new(init_wait: Duration, max_wait: Duration) -> Self {
        Self {
            max_wait: max_wait.max(init_wait),
            current_wait: init_wait,
        }
    }

    /// Return the next wait duration and advance the schedule.
    pub fn next_wait(&mut self) -> Duration {
        let wait = self.current_wait;
        self.current_wait = self.current_wait.saturating_mul(2).min(self.max_wait);
        wait
    }
}
