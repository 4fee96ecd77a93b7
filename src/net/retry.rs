//! Linear backoff schedule for failed requests.

use std::time::Duration;

/// How many times to retry and how long to wait in between.
///
/// The wait before retry `n` (1-based) is `base_delay * n`, so with
/// `max_retries = 3` and a one second base the waits are 1s, 2s, 3s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before the next attempt when `retries_left` retries remain.
    pub fn delay_for(&self, retries_left: u32) -> Duration {
        let retry_number = self.max_retries.saturating_sub(retries_left) + 1;
        self.base_delay * retry_number
    }

    /// Every wait the policy can produce, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries)
            .rev()
            .map(|retries_left| self.delay_for(retries_left))
            .collect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}
