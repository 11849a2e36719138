//! The closed error taxonomy for TaskDB operations.
//!
//! Mirrors the pattern the teacher crate uses for its own storage errors: a
//! single `thiserror` enum, no class hierarchy, `From` impls bridging
//! backend error types at the crate boundary. ErrorMap (`error_map.rs`)
//! builds on top of this for translations that need extra context (a guid,
//! a cell id) the bare `From` impl below doesn't have access to.

use crate::types::TaskState;

/// Unified error type for every TaskDB operation.
#[derive(Debug, thiserror::Error)]
pub enum TaskDbError {
    #[error("task not found: {0}")]
    ResourceNotFound(String),

    #[error("task already exists: {0}")]
    ResourceExists(String),

    #[error("failed to deserialize task definition for {guid}: {detail}")]
    Deserialize { guid: String, detail: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: TaskState, to: TaskState },

    #[error("Running on cell {actual} not {requested}")]
    RunningOnDifferentCell { actual: String, requested: String },

    #[error("unrecoverable store error: {0}")]
    UnrecoverableStore(String),
}

#[cfg(any(feature = "sqlite", feature = "postgres"))]
impl From<sqlx::Error> for TaskDbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => TaskDbError::ResourceNotFound(String::new()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                TaskDbError::ResourceExists(db_err.message().to_string())
            }
            _ => TaskDbError::UnrecoverableStore(err.to_string()),
        }
    }
}
