//! SQLite-backed persistence for the orchestration core's `TaskStore` and
//! `SessionStore` contracts.
//!
//! - SQLite with WAL mode for concurrent readers
//! - Migrations applied via `sqlx::migrate!`
//! - Each entity is stored as a JSON blob (`data`) alongside the indexed
//!   columns its query methods filter on, so adding a field to a model
//!   never requires a migration
//!
//! # Usage
//!
//! ```rust,no_run
//! use database::SqliteTaskStore;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteTaskStore::new(":memory:").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

mod common;
mod sqlite;

pub use sqlite::{SqliteSessionStore, SqliteTaskStore};
