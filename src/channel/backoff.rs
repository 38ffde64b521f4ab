//! Bounded exponential backoff for transport retries.
//!
//! Retrying is opt-in: with the default `max_attempts = 1` every dispatch is
//! a single send, and a failure goes straight to `Failed`.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Delay sequence for one dispatch attempt
pub struct Backoff {
    config: RetryConfig,
    current_delay_ms: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        let initial = config.initial_delay_ms;
        Self {
            config,
            current_delay_ms: initial,
            attempt: 1,
        }
    }

    /// Total attempts allowed, never less than one
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// The attempt about to run (1-based)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt, or `None` once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts() {
            return None;
        }
        self.attempt += 1;

        let base = self.current_delay_ms as f64;
        let capped = base.min(self.config.max_delay_ms as f64);

        let delay = if self.config.jitter_factor > 0.0 && capped > 0.0 {
            let range = capped * self.config.jitter_factor;
            let jitter = rand::rng().random_range(-range..range);
            (capped + jitter).max(1.0) as u64
        } else {
            capped.max(1.0) as u64
        };

        self.current_delay_ms = ((self.current_delay_ms as f64) * self.config.multiplier)
            .min(self.config.max_delay_ms as f64) as u64;

        Some(Duration::from_millis(delay))
    }
}
