//! Exponential backoff for delivery retries and queue reconnection

use std::time::Duration;

use rand::Rng;

use crate::config::QueueConfig;

/// Exponential backoff configuration
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential growth
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 5_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter_factor: 0.1, // 10% jitter
        }
    }
}

impl BackoffConfig {
    /// Retry schedule from the queue settings
    pub fn from_queue(config: &QueueConfig) -> Self {
        Self {
            initial_delay_ms: config.backoff_initial_ms,
            max_delay_ms: config.backoff_max_ms,
            multiplier: config.backoff_multiplier,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based): `initial * multiplier^(retry-1)`,
    /// capped at the maximum, with jitter applied.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        self.with_jitter(base.min(self.max_delay_ms as f64))
    }

    fn with_jitter(&self, delay_ms: f64) -> Duration {
        let final_delay = if self.jitter_factor > 0.0 && delay_ms > 0.0 {
            let jitter_range = delay_ms * self.jitter_factor;
            let jitter = rand::rng().random_range(-jitter_range..jitter_range);
            (delay_ms + jitter).max(1.0) as u64
        } else {
            delay_ms.max(1.0) as u64
        };

        Duration::from_millis(final_delay)
    }
}

/// Exponential backoff calculator with jitter
pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with custom configuration
    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Get the next delay duration
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;
        self.config.delay_for_retry(self.attempt)
    }

    /// Reset the backoff to initial state
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Get the current attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
