// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Retry budget for remote fetches. Backoff doubles per attempt and is
/// clamped to `max_backoff_ms`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

pub trait BackoffPolicy {
    fn delay_for_attempt(&self, attempt: usize) -> Duration;
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 120,
            max_backoff_ms: 5_000,
        }
    }
}

impl BackoffPolicy for RetryPolicy {
    /// `attempt` is 1-based; attempt 0 waits nothing.
    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let Some(exponent) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };
        let factor = u32::try_from(exponent)
            .ok()
            .and_then(|e| 1_u64.checked_shl(e))
            .unwrap_or(u64::MAX);
        let ms = self
            .base_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}
