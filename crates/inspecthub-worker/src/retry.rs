//! Backoff between failed attempts.

use std::time::Duration;

use inspecthub_core::config::WorkerConfig;

/// Exponential backoff: `base * 2^(retry_count - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base: Duration,
    max: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Failed jobs become eligible again immediately.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Policy from the worker settings.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            Duration::from_secs(config.retry_base_delay_seconds),
            Duration::from_secs(config.retry_max_delay_seconds),
        )
    }

    /// Delay before the next attempt, given the failure count after the
    /// attempt that just failed (1 for the first failure).
    pub fn delay_for(&self, retry_count: i32) -> Duration {
        let exponent = retry_count.saturating_sub(1).clamp(0, 31) as u32;
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}
