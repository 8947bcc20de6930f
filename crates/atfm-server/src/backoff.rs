//! Exponential retry delay for background pollers.
//!
//! Keeps a failing backend from being hammered every interval and keeps the
//! log to one error per attempt.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    retry_at: Instant,
    jitter_ratio: f64,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            current: base,
            retry_at: Instant::now(),
            jitter_ratio: 0.2,
            failures: 0,
        }
    }

    pub fn ready(&self) -> bool {
        Instant::now() >= self.retry_at
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.current = self.base;
        self.retry_at = Instant::now();
        self.failures = 0;
    }

    /// Record a failure and return how long to wait before the next attempt.
    pub fn fail(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.current = self.current.saturating_mul(2).min(self.max);
        let delay = jittered(self.current, self.jitter_ratio);
        self.retry_at = Instant::now() + delay;
        delay
    }
}

fn jittered(delay: Duration, ratio: f64) -> Duration {
    let max_extra_ms = (delay.as_millis() as f64 * ratio.clamp(0.0, 1.0)) as u64;
    if max_extra_ms == 0 {
        return delay;
    }
    let noise = (uuid::Uuid::new_v4().as_u128() & u128::from(u64::MAX)) as u64;
    delay + Duration::from_millis(noise % (max_extra_ms + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_backoff_is_ready() {
        let backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1));
        assert!(backoff.ready());
        assert_eq!(backoff.failures(), 0);
    }

    #[test]
    fn failure_delays_until_reset() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1));
        let delay = backoff.fail();
        assert!(delay >= Duration::from_millis(200));
        assert!(!backoff.ready());
        assert_eq!(backoff.failures(), 1);

        backoff.reset();
        assert!(backoff.ready());
        assert_eq!(backoff.failures(), 0);
    }

    #[test]
    fn delay_is_capped() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_millis(20));
        for _ in 0..5 {
            let delay = backoff.fail();
            assert!(delay >= Duration::from_millis(20));
            assert!(delay <= Duration::from_millis(24));
        }
    }
}
