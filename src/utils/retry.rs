//! Retry policy with exponential backoff
//!
//! The attempt budget for one logical request, plus the delay applied
//! between attempts. Jitter spreads concurrent retries apart.

use rand::Rng;
use std::time::Duration;

/// Attempts used by the client when no budget is given explicitly
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts for one logical request, including the first.
    /// Zero is treated as one.
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries (caps exponential growth)
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (typically 2.0)
    pub multiplier: f64,

    /// Whether to add jitter to delays
    pub use_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Attempt budget with the "at least one attempt" rule applied
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (0-indexed)
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(retry as i32);
        let delay_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        // Random value between 0 and delay on top of the base delay
        let delay_ms = if self.use_jitter && delay_ms > 0.0 {
            delay_ms + rand::thread_rng().gen_range(0.0..delay_ms)
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Retry policy presets for different use cases
pub mod presets {
    use super::*;

    /// One attempt, no retries
    pub fn single_attempt() -> RetryPolicy {
        RetryPolicy::new().with_max_attempts(1)
    }

    /// Retries without sleeping, for tests and latency-sensitive callers
    pub fn immediate(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(max_attempts)
            .with_initial_delay(Duration::ZERO)
            .with_max_delay(Duration::ZERO)
            .with_jitter(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(policy.initial_delay, Duration::from_millis(250));
        assert!(policy.use_jitter);
    }

    #[test]
    fn test_policy_builder() {
        let policy = RetryPolicy::new()
            .with_max_attempts(5)
            .with_initial_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(30))
            .with_multiplier(3.0)
            .with_jitter(false);

        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(200));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.multiplier, 3.0);
        assert!(!policy.use_jitter);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new().with_max_attempts(0).effective_attempts(), 1);
        assert_eq!(RetryPolicy::new().with_max_attempts(4).effective_attempts(), 4);
    }

    #[test]
    fn test_calculate_delay_without_jitter() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(10))
            .with_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(400));
    }

    #[test]
    fn test_calculate_delay_respects_max() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_jitter(false);

        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(300));
        assert_eq!(policy.calculate_delay(10), Duration::from_millis(300));
    }

    #[test]
    fn test_calculate_delay_with_jitter() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_jitter(true);

        let delay = policy.calculate_delay(0);
        assert!(delay >= Duration::from_millis(100));
        assert!(delay <= Duration::from_millis(200));
    }

    #[test]
    fn test_zero_delay_with_jitter_does_not_panic() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::ZERO)
            .with_jitter(true);
        assert_eq!(policy.calculate_delay(3), Duration::ZERO);
    }

    #[test]
    fn test_presets() {
        assert_eq!(presets::single_attempt().max_attempts, 1);

        let immediate = presets::immediate(4);
        assert_eq!(immediate.max_attempts, 4);
        assert_eq!(immediate.calculate_delay(2), Duration::ZERO);
    }
}
