//! ErrorMap: translates low-level storage / codec errors into the closed
//! domain taxonomy. Callers in `repository.rs`, `sqlite.rs`, `postgres.rs`,
//! and `in_memory.rs` funnel every fallible layer through these functions
//! rather than constructing `TaskDbError` variants ad hoc.

use crate::codec::CodecError;
use crate::error::TaskDbError;

/// A codec failure while reading back a row's `task_definition`.
pub fn deserialize_error(guid: &str, err: CodecError) -> TaskDbError {
    TaskDbError::Deserialize {
        guid: guid.to_string(),
        detail: err.to_string(),
    }
}

/// A unique-key violation on Insert.
pub fn resource_exists(guid: &str) -> TaskDbError {
    TaskDbError::ResourceExists(guid.to_string())
}

/// Absence where a row was required.
pub fn resource_not_found(guid: &str) -> TaskDbError {
    TaskDbError::ResourceNotFound(guid.to_string())
}

/// Any storage error not otherwise classified. Backend-specific `From<sqlx::Error>`
/// already catches unique-violation and row-not-found; this is the fallback
/// for everything else (connection loss, constraint errors on unrelated
/// columns, timeouts).
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub fn store_error(err: sqlx::Error) -> TaskDbError {
    TaskDbError::from(err)
}
