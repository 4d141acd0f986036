//! Retry policy with exponential backoff and jitter.
//!
//! One policy object is injected into both the page fetcher and the
//! crawl policy checker; retry behavior lives here and nowhere else.

use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 500;
const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retries).
    pub max_attempts: u32,
    /// Base delay for exponential backoff, milliseconds.
    pub base_delay_ms: u64,
    /// Cap on the backoff delay, milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }

    /// A policy that never retries; useful in tests.
    pub fn none() -> Self {
        Self::new(1, 0)
    }

    /// Backoff before retry number `attempt` (1-indexed retries):
    /// `min(base * 2^(attempt-1), max)` plus up to 20% jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.max_delay_ms);
        let jitter = if capped > 0 { fastrand::u64(0..=capped / 5) } else { 0 };
        Duration::from_millis(capped.saturating_add(jitter))
    }

    /// Whether another attempt is allowed after `attempt` attempts
    /// have already failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(5, 1000);
        let first = policy.backoff(1);
        assert!(first >= Duration::from_millis(1000));
        assert!(first <= Duration::from_millis(1200));

        // Far past the cap
        let late = policy.backoff(30);
        assert!(late <= Duration::from_millis(12_000));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::new(3, 10);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_none_never_retries() {
        let policy = RetryPolicy::none();
        assert!(!policy.should_retry(1));
    }
}
