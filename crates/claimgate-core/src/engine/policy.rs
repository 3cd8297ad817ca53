//! Numeric policy for one run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeout, throttle, and retry knobs supplied by the claim producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPolicy {
    /// Silence budget: elapsed time without progress before the
    /// retry-or-fail decision.
    pub timeout: Duration,

    /// Maximum concurrently outstanding (sent, unanswered) claims. The only
    /// backpressure mechanism; bounds memory and load on the authority.
    pub throttle: usize,

    /// Maximum retry passes per run.
    pub retry: u32,
}

impl RunPolicy {
    /// A throttle below 1 would make the run unable to send anything; it is
    /// raised to 1.
    pub fn new(timeout: Duration, throttle: usize, retry: u32) -> Self {
        Self {
            timeout,
            throttle: throttle.max(1),
            retry,
        }
    }
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            throttle: 100,
            retry: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_service_defaults() {
        let policy = RunPolicy::default();
        assert_eq!(policy.timeout, Duration::from_secs(600));
        assert_eq!(policy.throttle, 100);
        assert_eq!(policy.retry, 3);
    }

    #[test]
    fn zero_throttle_is_raised_to_one() {
        let policy = RunPolicy::new(Duration::from_secs(1), 0, 0);
        assert_eq!(policy.throttle, 1);
    }
}
