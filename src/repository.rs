//! Repository: CRUD and filtered listing over the `tasks` relation.
//!
//! Each backend (`sqlite.rs`, `postgres.rs`, `in_memory.rs`) implements
//! this trait directly on its Store type, the same way the teacher crate's
//! backend modules implement `TaskStorage` directly on their storage
//! structs rather than splitting connection management and CRUD into two
//! separate types.
//!
//! `lock` is the primitive StateMachine uses for every guarded transition:
//! it opens a transaction, performs a locking read of `guid`, and returns a
//! `TransitionGuard` the caller must resolve with exactly one of
//! `commit_write`, `commit_delete`, or `release`. This is what makes two
//! concurrent transitions against the same guid serialize through the
//! backing store instead of racing in application code.

use async_trait::async_trait;

use crate::error::TaskDbError;
use crate::types::{Filter, TaskRow};

#[async_trait]
pub trait Repository: Send + Sync {
    /// Insert a new row. Fails with `ResourceExists` if `guid` is already present.
    async fn insert(&self, row: TaskRow) -> Result<(), TaskDbError>;

    /// Fetch a row by guid without taking any lock. Used by `Tasks`/`TaskByGuid`,
    /// which are plain reads, not guarded transitions.
    async fn select_by_guid(&self, guid: &str) -> Result<Option<TaskRow>, TaskDbError>;

    /// Fetch every row matching `filter`. Unordered.
    async fn select_all(&self, filter: &Filter) -> Result<Vec<TaskRow>, TaskDbError>;

    /// Open a transaction, take a locking read of `guid`, and return a guard
    /// representing that held lock. The guard's `current()` reflects the
    /// row as of the locking read; `None` if absent.
    async fn lock(&self, guid: &str) -> Result<Box<dyn TransitionGuard>, TaskDbError>;
}

/// A held row-level lock (and its surrounding transaction) obtained via
/// `Repository::lock`. Exactly one of the three consuming methods must be
/// called to end the transaction; dropping the guard without doing so
/// aborts it (rolls back, releasing the lock) as a safety net, but callers
/// should always resolve it explicitly.
#[async_trait]
pub trait TransitionGuard: Send {
    /// The row as observed by the locking read, or `None` if `guid` doesn't exist.
    fn current(&self) -> Option<&TaskRow>;

    /// Write `row` back and commit.
    async fn commit_write(self: Box<Self>, row: TaskRow) -> Result<(), TaskDbError>;

    /// Delete the locked row and commit.
    async fn commit_delete(self: Box<Self>) -> Result<(), TaskDbError>;

    /// No mutation is needed (a guard failure, or an idempotent no-op).
    /// Ends the transaction without writing anything.
    async fn release(self: Box<Self>) -> Result<(), TaskDbError>;
}
