//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use taskdb::prelude::*;
//! ```

pub use crate::clock::{Clock, FakeClock, SystemClock};
pub use crate::codec::{marshal, unmarshal, CodecError};
pub use crate::error::TaskDbError;
#[cfg(feature = "in-memory")]
pub use crate::in_memory::{InMemoryConfig, InMemoryStore};
#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresConfig, PostgresStore};
pub use crate::repository::{Repository, TransitionGuard};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConfig, SqliteStore};
pub use crate::state_machine::StateMachine;
pub use crate::types::{Filter, Task, TaskDefinition, TaskRow, TaskState, MAX_FIELD_LEN};
