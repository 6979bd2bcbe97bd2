//! Shared backoff policy for retryable operations (§5 retry policy, §7
//! propagation policy): 3 attempts, exponential backoff base 1s cap 30s,
//! jitter ±20%.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub cap: Duration,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given attempt (1-indexed). `jitter_unit` must be in
    /// `[-1.0, 1.0]`, scaled by `jitter`; callers supply it (e.g. from an
    /// injected RNG or a deterministic test value) so this function stays pure.
    pub fn delay_for(&self, attempt: u32, jitter_unit: f64) -> Duration {
        let exp = self.base.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1) as i32);
        let capped = exp.min(self.cap.as_secs_f64());
        let jittered = capped * (1.0 + self.jitter * jitter_unit.clamp(-1.0, 1.0));
        Duration::from_secs_f64(jittered.max(0.0))
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(1, 0.0), Duration::from_secs(1));
        assert_eq!(p.delay_for(2, 0.0), Duration::from_secs(2));
        assert_eq!(p.delay_for(3, 0.0), Duration::from_secs(4));
        // base*2^(attempt-1) at attempt 6 is 32s, capped to 30s.
        assert_eq!(p.delay_for(6, 0.0), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_twenty_percent() {
        let p = RetryPolicy::default();
        let base = p.delay_for(2, 0.0).as_secs_f64();
        let high = p.delay_for(2, 1.0).as_secs_f64();
        let low = p.delay_for(2, -1.0).as_secs_f64();
        assert!((high - base - base * 0.2).abs() < 1e-6);
        assert!((base - low - base * 0.2).abs() < 1e-6);
    }

    #[test]
    fn retry_exhausts_after_three_attempts() {
        let p = RetryPolicy::default();
        assert!(p.should_retry(1));
        assert!(p.should_retry(2));
        assert!(!p.should_retry(3));
    }
}
