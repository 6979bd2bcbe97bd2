use thiserror::Error;

/// Result type alias used throughout the orchestration core.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Error taxonomy for the Task Orchestration Core.
///
/// Each variant maps to a stable error code (`code()`), carries a
/// human-readable message, and records whether the engine should retry it
/// internally or surface it immediately (`is_retryable()`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    /// Input failed schema or policy validation. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller lacks permission for the requested operation. Never retried.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Operation illegal in the entity's current state.
    #[error("invalid state: {code}: {message}")]
    InvalidState { code: String, message: String },

    /// Entity missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Concurrent modification detected (version mismatch).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Timeout, throttling, or transient network failure.
    #[error("transient error: {0}")]
    Transient(String),

    /// The circuit breaker protecting a backend is open.
    #[error("circuit open: {0}")]
    CircuitOpen(String),

    /// A sensitivity scan could not complete; callers must fail closed.
    #[error("sensitivity scan failed: {cause}")]
    SensitivityScanFailed { cause: String },

    /// Unexpected internal error, logged with a correlation id and surfaced opaque.
    #[error("internal error ({correlation_id}): {message}")]
    Internal {
        message: String,
        correlation_id: String,
    },
}

impl OrchestratorError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound(format!("{entity} '{id}' not found"))
    }

    pub fn invalid_state(code: &str, message: impl Into<String>) -> Self {
        Self::InvalidState {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn dependencies_not_satisfied(todo_id: &str) -> Self {
        Self::invalid_state(
            "dependencies_not_satisfied",
            format!("todo '{todo_id}' has unmet dependencies"),
        )
    }

    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::invalid_state(
            "invalid_status_transition",
            format!("cannot transition from {from} to {to}"),
        )
    }

    pub fn conflict(entity: &str, id: &str) -> Self {
        Self::Conflict(format!("{entity} '{id}' was modified concurrently"))
    }

    pub fn internal(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            correlation_id: correlation_id.into(),
        }
    }

    /// Stable error code surfaced to callers (§7 "user-visible behavior").
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "validation_error",
            OrchestratorError::Authorization(_) => "authorization_error",
            OrchestratorError::InvalidState { .. } => "invalid_state_error",
            OrchestratorError::NotFound(_) => "not_found",
            OrchestratorError::Conflict(_) => "conflict",
            OrchestratorError::Transient(_) => "transient_error",
            OrchestratorError::CircuitOpen(_) => "circuit_open",
            OrchestratorError::SensitivityScanFailed { .. } => "sensitivity_scan_failed",
            OrchestratorError::Internal { .. } => "internal_error",
        }
    }

    /// Retryable errors: timeouts, throttling, transient network errors, and
    /// conflicts (engine retries those internally up to 3 times, §7).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Transient(_) | OrchestratorError::Conflict(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OrchestratorError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, OrchestratorError::Validation(_))
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, OrchestratorError::CircuitOpen(_))
    }

    /// HTTP-status-equivalent, useful for any edge layer placed in front of the core.
    pub fn status_code(&self) -> u16 {
        match self {
            OrchestratorError::Validation(_) => 400,
            OrchestratorError::Authorization(_) => 403,
            OrchestratorError::InvalidState { .. } => 422,
            OrchestratorError::NotFound(_) => 404,
            OrchestratorError::Conflict(_) => 409,
            OrchestratorError::Transient(_) => 503,
            OrchestratorError::CircuitOpen(_) => 503,
            OrchestratorError::SensitivityScanFailed { .. } => 502,
            OrchestratorError::Internal { .. } => 500,
        }
    }
}
