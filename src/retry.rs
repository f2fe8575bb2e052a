//! Backoff policy for retrying throttled listing pages.

use std::time::Duration;

/// Bounded exponential backoff: attempts, base delay, growth factor, cap.
/// Delays are deterministic so retry behavior can be asserted exactly.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub growth: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            growth: 2,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy with no sleeping, for deterministic tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            growth: 2,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry `attempt` (1-based): base * growth^(attempt-1),
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.growth.max(1).saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
