//! Retry + circuit-breaker wrapper for external backend calls (§5). Each
//! NLP/search call site runs through a `BackendGuard` instead of calling
//! the backend trait directly, so a struggling backend fails fast via the
//! breaker and the caller's existing degrade-on-error path takes over once
//! retries are exhausted — callers never need to know retries happened.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use orchestrator_core::circuit_breaker::CircuitBreaker;
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::retry::RetryPolicy;
use orchestrator_core::traits::Clock;

pub struct BackendGuard {
    breaker: Mutex<CircuitBreaker>,
    retry: RetryPolicy,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl BackendGuard {
    pub fn new(
        breaker: CircuitBreaker,
        retry: RetryPolicy,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            breaker: Mutex::new(breaker),
            retry,
            timeout,
            clock,
        }
    }

    /// Per-backend defaults: §5's 10s-per-call/3-retries/threshold-5 table.
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            CircuitBreaker::default(),
            RetryPolicy::default(),
            Duration::from_secs(10),
            clock,
        )
    }

    /// Runs `op`, retrying transient failures per the retry policy and
    /// recording every outcome against the breaker. Fails fast with
    /// `CircuitOpen` without calling `op` at all once the breaker trips.
    /// Jitter is fixed at zero: the policy's delay math is exercised and
    /// tested for determinism in `core::retry`, and nothing here needs an
    /// injected RNG to vary it further.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let now = self.clock.now();
            if !self.breaker.lock().unwrap().allow_request(now) {
                return Err(OrchestratorError::CircuitOpen(
                    "backend breaker is open".to_string(),
                ));
            }

            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(inner) => inner,
                Err(_) => Err(OrchestratorError::Transient(
                    "backend call timed out".to_string(),
                )),
            };

            let now = self.clock.now();
            match result {
                Ok(value) => {
                    self.breaker.lock().unwrap().record_success(now);
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempt) => {
                    self.breaker.lock().unwrap().record_failure(now);
                    tokio::time::sleep(self.retry.delay_for(attempt, 0.0)).await;
                }
                Err(e) => {
                    self.breaker.lock().unwrap().record_failure(now);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_mocks::TestClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let guard = BackendGuard::with_defaults(Arc::new(TestClock::default()));
        let result = guard.call(|| async { Ok::<_, OrchestratorError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let guard = BackendGuard::new(
            CircuitBreaker::default(),
            RetryPolicy {
                max_attempts: 3,
                base: Duration::from_millis(1),
                cap: Duration::from_millis(5),
                jitter: 0.0,
            },
            Duration::from_secs(10),
            Arc::new(TestClock::default()),
        );
        let calls = AtomicU32::new(0);
        let result = guard
            .call(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(OrchestratorError::Transient("flaky".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_surfaces_immediately() {
        let guard = BackendGuard::with_defaults(Arc::new(TestClock::default()));
        let calls = AtomicU32::new(0);
        let result = guard
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(OrchestratorError::Validation("bad input".to_string()))
            })
            .await;
        assert!(matches!(result, Err(OrchestratorError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn breaker_opens_after_repeated_failure_and_fails_fast() {
        let guard = BackendGuard::new(
            CircuitBreaker::new(1, 30, 3),
            RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
            Duration::from_secs(10),
            Arc::new(TestClock::default()),
        );
        let first = guard
            .call(|| async { Err::<(), _>(OrchestratorError::Transient("down".to_string())) })
            .await;
        assert!(matches!(first, Err(OrchestratorError::Transient(_))));

        let second = guard.call(|| async { Ok::<_, OrchestratorError>(1) }).await;
        assert!(matches!(second, Err(OrchestratorError::CircuitOpen(_))));
    }
}
