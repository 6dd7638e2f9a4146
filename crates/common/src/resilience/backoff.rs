//! Exponential backoff without jitter.
//!
//! `delay(n) = min(base * multiplier^n, max)`. Jitter is intentionally absent
//! so that delays never decrease as `n` grows.

use std::time::Duration;

/// Maximum exponent applied before the cap takes over.
pub const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Capped exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    base: Duration,
    multiplier: f64,
    max: Duration,
}

impl ExponentialBackoff {
    /// Build a schedule. A multiplier below 1.0 is raised to 1.0 and a cap
    /// below the base is raised to the base.
    pub fn new(base: Duration, multiplier: f64, max: Duration) -> Self {
        let multiplier = if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 };
        Self { base, multiplier, max: max.max(base) }
    }

    pub fn from_millis(base_ms: u64, multiplier: f64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), multiplier, Duration::from_millis(max_ms))
    }

    /// Delay before the next attempt after `retry_count` failures.
    pub fn delay(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(MAX_BACKOFF_EXPONENT);
        let factor = self.multiplier.powi(exponent as i32);
        let base_ms = self.base.as_millis() as f64;
        let max_ms = self.max.as_millis() as f64;
        let delay_ms = (base_ms * factor).min(max_ms);
        Duration::from_millis(delay_ms as u64)
    }

    pub fn max_delay(&self) -> Duration {
        self.max
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 2.0, Duration::from_secs(60))
    }
}
