//! Retry policy for node execution failures.

use std::time::Duration;

/// How `CompiledStateGraph::invoke` should retry a failing node.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// Never retry; the first error is returned.
    None,
    /// Retry up to `max_attempts` times with exponentially increasing backoff.
    Exponential {
        /// Total attempts including the first, e.g. 3 means up to 2 retries.
        max_attempts: u32,
        /// Delay before the first retry.
        base_delay: Duration,
        /// Upper bound on the delay between retries.
        max_delay: Duration,
        /// Factor the delay is multiplied by after each attempt.
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::None
    }
}

impl RetryPolicy {
    /// Builds an exponential backoff policy.
    pub fn exponential(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    ) -> Self {
        RetryPolicy::Exponential {
            max_attempts,
            base_delay,
            max_delay,
            multiplier,
        }
    }

    /// Delay before the given retry attempt (0-indexed: 0 is the first retry).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::None => Duration::ZERO,
            RetryPolicy::Exponential {
                base_delay,
                max_delay,
                multiplier,
                ..
            } => {
                let scaled = base_delay.as_secs_f64() * multiplier.powi(attempt as i32);
                Duration::from_secs_f64(scaled).min(*max_delay)
            }
        }
    }

    /// Total attempts allowed (including the first try).
    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryPolicy::None => 1,
            RetryPolicy::Exponential { max_attempts, .. } => *max_attempts,
        }
    }
}
