//! # TaskDB
//!
//! **Persistent Task lifecycle store for a cluster-level job orchestrator.**
//!
//! Clients submit Tasks for execution on worker nodes ("cells"). This crate
//! is the authoritative system of record for each Task's state, its binding
//! to a cell, and its terminal outcome, while multiple orchestrator
//! processes read and mutate the store concurrently and cells asynchronously
//! report progress and completion.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use taskdb::prelude::*;
//!
//! # async fn example() -> Result<(), TaskDbError> {
//! let store = InMemoryStore::new();
//! let sm = StateMachine::new(store, SystemClock);
//!
//! let definition = TaskDefinition {
//!     command: "run-build".to_string(),
//!     env: vec![],
//!     cpu_weight: 1,
//!     memory_mb: 256,
//!     disk_mb: 512,
//! };
//! sm.desire_task(definition, "task-1", "domain-a").await?;
//! sm.start_task("task-1", "cell-a").await?;
//! sm.complete_task("task-1", "cell-a", false, "", "done").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`Repository` trait**: CRUD + filtered listing + guarded transactional locking over the `tasks` relation
//! - **`StateMachine`**: the eight guarded lifecycle operations (Desire, Start, Cancel, Complete, Fail, Resolving, Delete, plus listing)
//! - **`Codec`**: opaque binary serialization of `TaskDefinition`
//! - **`Clock`**: injected nanosecond time source, faked in tests

// Core modules
pub mod clock;
pub mod codec;
pub mod error;
pub mod error_map;
pub mod prelude;
pub mod repository;
pub mod schema;
pub mod state_machine;
pub mod types;

// Durable storage backends
#[cfg(feature = "in-memory")]
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Parity test suite (shared across all backends)
#[cfg(test)]
#[allow(dead_code)]
pub(crate) mod parity_tests;

// Re-exports for convenience
pub use clock::{Clock, SystemClock};
pub use error::TaskDbError;
#[cfg(feature = "in-memory")]
pub use in_memory::{InMemoryConfig, InMemoryStore};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresConfig, PostgresStore};
pub use repository::{Repository, TransitionGuard};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConfig, SqliteStore};
pub use state_machine::StateMachine;
pub use types::{Filter, Task, TaskDefinition, TaskRow, TaskState, MAX_FIELD_LEN};

/// Create a default in-memory state machine for development and testing.
#[cfg(feature = "in-memory")]
pub fn create_default_state_machine() -> StateMachine<InMemoryStore, SystemClock> {
    StateMachine::new(InMemoryStore::new(), SystemClock)
}
