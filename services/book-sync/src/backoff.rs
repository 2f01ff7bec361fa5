//! Capped exponential backoff for upstream failures

use std::time::Duration;

use crate::config::BackoffConfig;

/// Delay sequence `initial, initial*m, initial*m², …` capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        let initial = config.initial_delay().min(config.max_delay());
        Self {
            initial,
            max: config.max_delay(),
            multiplier: config.multiplier.max(1.0),
            current: initial,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt; grows the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(self.multiplier).min(self.max);
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Back to the initial delay, after a successful sync.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempts = 0;
    }

    /// Consecutive failures since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
