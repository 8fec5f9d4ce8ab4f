//! Retry with exponential backoff for calls to the AI service
//!
//! Only errors classified as transient (`PlannerError::is_retryable`) are
//! retried. Everything else fails on the first attempt.

use std::time::Duration;

use crate::error::PlannerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// Entry point for the AI caller, which lives outside this crate and builds
/// its policy with [`crate::config::Config::retry_policy`].
///
/// `op` receives the 0-based attempt number. `sleep` is called between
/// attempts; pass `std::thread::sleep` outside of tests.
pub fn retry_with<T, F, S>(policy: &RetryPolicy, mut op: F, mut sleep: S) -> Result<T, PlannerError>
where
    F: FnMut(u32) -> Result<T, PlannerError>,
    S: FnMut(Duration),
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "Attempt {}/{} failed: {}. Retrying in {}ms",
                    attempt + 1,
                    attempts,
                    err,
                    delay.as_millis()
                );
                sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
