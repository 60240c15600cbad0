//! Retry policy for individual steps.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry configuration attached to a step.
///
/// Supports exponential backoff with optional jitter to avoid thundering
/// herd when many steps retry at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial one). Always >= 1.
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[serde(with = "duration_millis")]
    pub base_interval: Duration,

    /// Multiplier applied to the interval after each attempt.
    pub exponential_base: f64,

    /// Jitter factor in [0.0, 1.0]; a value of 0.1 means +/-10% randomness.
    #[serde(default)]
    pub jitter: f64,

    /// Exit codes that are eligible for retry. `None` means any non-zero
    /// exit code is retryable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable_exit_codes: Option<Vec<i32>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}

impl RetryPolicy {
    /// Exponential backoff with sensible defaults: 3 attempts, 1s base
    /// interval, 2x exponential base, 10% jitter.
    pub fn exponential() -> Self {
        Self {
            max_attempts: 3,
            base_interval: Duration::from_secs(1),
            exponential_base: 2.0,
            jitter: 0.1,
            retryable_exit_codes: None,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_interval: Duration::ZERO,
            exponential_base: 1.0,
            jitter: 0.0,
            retryable_exit_codes: None,
        }
    }

    /// Fixed-interval retries (no backoff growth).
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_interval: interval,
            exponential_base: 1.0,
            jitter: 0.0,
            retryable_exit_codes: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    pub fn with_exponential_base(mut self, base: f64) -> Self {
        self.exponential_base = base;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn with_retryable_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.retryable_exit_codes = Some(codes);
        self
    }

    /// The invariant spec.md §3 requires: attempts and interval are finite.
    pub fn is_valid(&self) -> bool {
        self.max_attempts >= 1
            && self.base_interval.as_secs_f64().is_finite()
            && self.exponential_base.is_finite()
            && self.exponential_base >= 1.0
    }

    /// Delay before the given attempt (1-based; attempt 1 is the initial try).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let retry_num = (attempt - 1) as i32 - 1;
        let base = self.base_interval.as_secs_f64() * self.exponential_base.powi(retry_num.max(0));
        let jittered = if self.jitter > 0.0 {
            let mut rng = rand::thread_rng();
            let range = base * self.jitter;
            (base + rng.gen_range(-range..=range)).max(0.0)
        } else {
            base
        };
        Duration::from_secs_f64(jittered)
    }

    pub fn has_attempts_remaining(&self, current_attempt: u32) -> bool {
        current_attempt < self.max_attempts
    }

    /// Whether an exit code should trigger a retry.
    pub fn should_retry_exit_code(&self, code: i32) -> bool {
        match &self.retryable_exit_codes {
            Some(codes) => codes.contains(&code),
            None => code != 0,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_grows() {
        let policy = RetryPolicy::exponential().with_jitter(0.0);
        let d1 = policy.delay_for_attempt(2);
        let d2 = policy.delay_for_attempt(3);
        assert!(d2 > d1);
    }

    #[test]
    fn no_retry_has_one_attempt() {
        let policy = RetryPolicy::no_retry();
        assert!(!policy.has_attempts_remaining(1));
    }

    #[test]
    fn exit_code_retryable_set_restricts() {
        let policy = RetryPolicy::exponential().with_retryable_exit_codes(vec![1, 2]);
        assert!(policy.should_retry_exit_code(1));
        assert!(!policy.should_retry_exit_code(3));
    }

    #[test]
    fn default_retryable_is_any_nonzero() {
        let policy = RetryPolicy::exponential();
        assert!(policy.should_retry_exit_code(7));
        assert!(!policy.should_retry_exit_code(0));
    }
}
