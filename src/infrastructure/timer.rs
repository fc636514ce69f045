use crate::types::constants::{
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY, RECONNECT_JITTER, RECONNECT_MAX_DELAY,
};
use rand::Rng;
use std::time::Duration;

/// Reconnection backoff with a bounded attempt counter.
///
/// `delay = min(base * 2^attempts, max) + uniform(0, jitter)`. The counter
/// increments on every scheduled retry and is only reset by a successful open
/// or an external trigger (manual connect, network back online).
#[derive(Debug, Clone)]
pub struct ReconnectScheduler {
    attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Duration,
    max_attempts: u32,
}

impl ReconnectScheduler {
    pub fn new(base_delay: Duration, max_delay: Duration, jitter: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            base_delay,
            max_delay,
            jitter,
            max_attempts,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Deterministic part of the delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Upper bound of any delay this scheduler hands out
    pub fn ceiling(&self) -> Duration {
        self.max_delay + self.jitter
    }

    /// Get the next delay and count the attempt, `None` once the bound is hit
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        let delay = self.backoff(self.attempts) + self.sample_jitter();
        self.attempts += 1;
        Some(delay)
    }

    /// Reset the attempt counter
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    fn sample_jitter(&self) -> Duration {
        let window = self.jitter.as_millis() as u64;
        if window == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=window))
    }
}

impl Default for ReconnectScheduler {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(RECONNECT_BASE_DELAY),
            Duration::from_millis(RECONNECT_MAX_DELAY),
            Duration::from_millis(RECONNECT_JITTER),
            MAX_RECONNECT_ATTEMPTS,
        )
    }
}
