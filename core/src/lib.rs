//! Orchestrator Core Library
//!
//! Foundational domain models, error taxonomy, validation, circuit breaking,
//! and the trait interfaces for every external capability the Task
//! Orchestration Core consumes. The `engine` crate builds the six
//! cooperating components (Sensitivity Gate, Knowledge & Workgroup
//! Resolver, Analysis Pipeline, Todo Graph Engine, Deliverable Quality
//! Machine, Conversation Orchestrator) on top of these types.
//!
//! # Architecture
//!
//! - [`models`] - domain entities (`WorkTask`, `TodoItem`, `Deliverable`, `Session`, ...)
//! - [`error`] - the error taxonomy and `Result` alias
//! - [`traits`] - external interface contracts (`TaskStore`, `SessionStore`, ...)
//! - [`validation`] - field and state-transition validation
//! - [`circuit_breaker`] - breaker state machine for backend calls
//! - [`retry`] - shared backoff policy

pub mod circuit_breaker;
pub mod error;
pub mod models;
pub mod retry;
pub mod traits;
pub mod validation;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use error::{OrchestratorError, Result};
pub use retry::RetryPolicy;
pub use validation::Validator;

/// Current version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
