//! Test doubles for the orchestration core's external interfaces (§6).
//!
//! In-memory stores follow the teacher's mock-repository idiom: thread-safe
//! interior mutability, error injection, and call-history tracking for
//! verification in tests.

pub mod backends;
pub mod clock;
pub mod session_store;
pub mod task_store;

pub use backends::{
    StubKms, StubNlpBackend, StubNotificationTransport, StubObjectStore, StubRulesEngine,
    StubSearchBackend,
};
pub use clock::TestClock;
pub use session_store::InMemorySessionStore;
pub use task_store::{InMemoryTaskStore, SharedTaskStore};
