use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff policy for the batch writer.
///
/// Attempt `n` (1-based) that fails transiently waits
/// `base_delay * n + jitter`, unless the store suggested its own
/// retry-after interval, which always wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    /// Fixed amount added to every computed delay.
    #[serde(with = "duration_ms")]
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(7),
            jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| {
            self.base_delay.saturating_mul(attempt.max(1)) + self.jitter
        })
    }

    /// Whether another attempt is allowed after `attempt` failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delays_grow_with_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1, None), Duration::from_millis(7_500));
        assert_eq!(policy.delay_for(2, None), Duration::from_millis(14_500));
        assert_eq!(policy.delay_for(3, None), Duration::from_millis(21_500));
    }

    #[test]
    fn retry_after_wins() {
        let policy = RetryPolicy::default();
        let hint = Duration::from_millis(250);
        assert_eq!(policy.delay_for(2, Some(hint)), hint);
    }

    #[test]
    fn attempt_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!RetryPolicy::no_retry().should_retry(1));
    }

    #[test]
    fn deserializes_millis_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"base_delay": 10}"#).unwrap();
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.jitter, Duration::from_millis(500));
    }
}
