use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Circuit breaker guarding calls to an external backend (NLP, search,
/// notification transport) per §5's concurrency and resource model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout_secs: i64,
    half_open_trial_limit: u32,
    state: CircuitState,
    failure_count: u32,
    half_open_successes: u32,
    half_open_attempts: u32,
    opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Defaults from §5: threshold 5, recovery timeout 30s, half-open trial limit 3.
impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, 30, 3)
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout_secs: i64, half_open_trial_limit: u32) -> Self {
        Self {
            failure_threshold,
            recovery_timeout_secs,
            half_open_trial_limit,
            state: CircuitState::Closed,
            failure_count: 0,
            half_open_successes: 0,
            half_open_attempts: 0,
            opened_at: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Whether a call may be attempted right now. Transitions `open` ->
    /// `half_open` once the recovery timeout has elapsed.
    pub fn allow_request(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|t| (now - t).num_seconds())
                    .unwrap_or(0);
                if elapsed >= self.recovery_timeout_secs {
                    self.state = CircuitState::HalfOpen;
                    self.half_open_successes = 0;
                    self.half_open_attempts = 0;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => self.half_open_attempts < self.half_open_trial_limit,
        }
    }

    pub fn record_success(&mut self, now: DateTime<Utc>) {
        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                self.half_open_attempts += 1;
                self.half_open_successes += 1;
                if self.half_open_successes >= self.half_open_trial_limit {
                    self.close();
                }
            }
            CircuitState::Open => {
                // A success while open should not normally happen; treat as recovery.
                let _ = now;
                self.close();
            }
        }
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= self.failure_threshold {
                    self.open(now);
                }
            }
            CircuitState::HalfOpen => {
                self.half_open_attempts += 1;
                self.open(now);
            }
            CircuitState::Open => {}
        }
    }

    fn open(&mut self, now: DateTime<Utc>) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.half_open_successes = 0;
        self.half_open_attempts = 0;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.opened_at = None;
        self.half_open_successes = 0;
        self.half_open_attempts = 0;
    }
}
