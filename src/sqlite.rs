//! SQLite Store + Repository backend.
//!
//! Production-ready SQLite backend for persistent task storage. Ideal for
//! single-instance deployments requiring data persistence across restarts.
//!
//! Row-level serialization is obtained via `begin_with("BEGIN IMMEDIATE")`:
//! SQLite upgrades this to a reserved lock immediately rather than on first
//! write, so a second `lock()` against the same or a different guid blocks
//! until the first transaction commits or rolls back. `sqlx`'s plain
//! `.begin()` only issues a deferred `BEGIN`, which would not provide that
//! guarantee. Holding the lock as a real `sqlx::Transaction` (rather than
//! raw `BEGIN`/`COMMIT`/`ROLLBACK` queries over a bare connection) means a
//! guard dropped without being resolved — a panic, or the calling future
//! being cancelled mid-await — rolls back via `Transaction`'s own `Drop`
//! instead of leaking an open transaction back into the pool.

use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

static MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

use crate::error::TaskDbError;
use crate::error_map;
use crate::repository::{Repository, TransitionGuard};
use crate::schema::{SQLITE_CREATE_TABLE, SQLITE_INDEXES};
use crate::types::{Filter, TaskRow, TaskState};

/// Configuration for the SQLite backend.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file path (use ":memory:" for in-memory).
    pub database_path: PathBuf,
    /// Maximum number of database connections in the pool.
    pub max_connections: u32,
    /// Maximum number of tasks to store (0 = unlimited).
    pub max_tasks: usize,
    /// Create the database file if it doesn't exist.
    pub create_database_if_missing: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("taskdb.sqlite"),
            max_connections: 10,
            max_tasks: 0,
            create_database_if_missing: true,
        }
    }
}

/// SQLite-backed Store + Repository implementation.
pub struct SqliteStore {
    pool: SqlitePool,
    config: SqliteConfig,
}

fn row_to_task_row(row: &sqlx::sqlite::SqliteRow) -> Result<TaskRow, TaskDbError> {
    let state_i32: i32 = row.get("state");
    let state = TaskState::try_from(state_i32)
        .map_err(|v| TaskDbError::UnrecoverableStore(format!("unknown state code {v}")))?;
    let failed_i64: i64 = row.get("failed");

    Ok(TaskRow {
        guid: row.get("guid"),
        domain: row.get("domain"),
        state,
        cell_id: row.get("cell_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        first_completed_at: row.get("first_completed_at"),
        failed: failed_i64 != 0,
        failure_reason: row.get("failure_reason"),
        result: row.get("result"),
        task_definition: row.get("task_definition"),
    })
}

impl SqliteStore {
    pub async fn new() -> Result<Self, TaskDbError> {
        Self::with_config(SqliteConfig::default()).await
    }

    pub async fn with_config(config: SqliteConfig) -> Result<Self, TaskDbError> {
        info!(path = ?config.database_path, "initializing sqlite store");

        let db_path_str = config.database_path.to_string_lossy();
        let is_memory = db_path_str == ":memory:";

        if !is_memory {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        TaskDbError::UnrecoverableStore(format!(
                            "failed to create database directory: {e}"
                        ))
                    })?;
                }
            }
        }

        let pool = if is_memory {
            let unique_name = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let uri = format!("file:taskdb-{unique_name}?mode=memory&cache=shared");
            SqlitePool::connect(&uri)
                .await
                .map_err(TaskDbError::from)?
        } else {
            let connect_options = SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(config.create_database_if_missing);
            SqlitePool::connect_with(connect_options)
                .await
                .map_err(TaskDbError::from)?
        };

        let store = Self { pool, config };
        store.ensure_schema().await?;
        info!("sqlite store initialized");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), TaskDbError> {
        debug!("ensuring sqlite schema");
        sqlx::query(SQLITE_CREATE_TABLE)
            .execute(&self.pool)
            .await?;
        for index_sql in SQLITE_INDEXES {
            sqlx::query(index_sql).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for SqliteStore {
    async fn insert(&self, row: TaskRow) -> Result<(), TaskDbError> {
        if self.config.max_tasks > 0 {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
                .fetch_one(&self.pool)
                .await?;
            if count as usize >= self.config.max_tasks {
                return Err(TaskDbError::UnrecoverableStore(format!(
                    "maximum tasks limit reached: {}",
                    self.config.max_tasks
                )));
            }
        }

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (guid, domain, state, cell_id, created_at, updated_at,
                                first_completed_at, failed, failure_reason, result, task_definition)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.guid)
        .bind(&row.domain)
        .bind(row.state.as_i32())
        .bind(&row.cell_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.first_completed_at)
        .bind(row.failed as i64)
        .bind(&row.failure_reason)
        .bind(&row.result)
        .bind(&row.task_definition)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(error_map::resource_exists(&row.guid))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn select_by_guid(&self, guid: &str) -> Result<Option<TaskRow>, TaskDbError> {
        let row = sqlx::query(
            r#"SELECT guid, domain, state, cell_id, created_at, updated_at,
                      first_completed_at, failed, failure_reason, result, task_definition
               FROM tasks WHERE guid = ?"#,
        )
        .bind(guid)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_task_row).transpose()
    }

    async fn select_all(&self, filter: &Filter) -> Result<Vec<TaskRow>, TaskDbError> {
        let rows = sqlx::query(
            r#"SELECT guid, domain, state, cell_id, created_at, updated_at,
                      first_completed_at, failed, failure_reason, result, task_definition
               FROM tasks
               WHERE (?1 IS NULL OR domain = ?1)
                 AND (?2 IS NULL OR cell_id = ?2)"#,
        )
        .bind(&filter.domain)
        .bind(&filter.cell_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_task_row).collect()
    }

    async fn lock(&self, guid: &str) -> Result<Box<dyn TransitionGuard>, TaskDbError> {
        let mut tx: Transaction<'static, Sqlite> =
            self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let row = sqlx::query(
            r#"SELECT guid, domain, state, cell_id, created_at, updated_at,
                      first_completed_at, failed, failure_reason, result, task_definition
               FROM tasks WHERE guid = ?"#,
        )
        .bind(guid)
        .fetch_optional(&mut *tx)
        .await?;

        let current = row.as_ref().map(row_to_task_row).transpose()?;

        Ok(Box::new(SqliteGuard {
            tx,
            guid: guid.to_string(),
            current,
        }))
    }
}

struct SqliteGuard {
    tx: Transaction<'static, Sqlite>,
    guid: String,
    current: Option<TaskRow>,
}

#[async_trait]
impl TransitionGuard for SqliteGuard {
    fn current(&self) -> Option<&TaskRow> {
        self.current.as_ref()
    }

    async fn commit_write(mut self: Box<Self>, row: TaskRow) -> Result<(), TaskDbError> {
        sqlx::query(
            r#"
            UPDATE tasks SET
                domain = ?, state = ?, cell_id = ?, created_at = ?, updated_at = ?,
                first_completed_at = ?, failed = ?, failure_reason = ?, result = ?,
                task_definition = ?
            WHERE guid = ?
            "#,
        )
        .bind(&row.domain)
        .bind(row.state.as_i32())
        .bind(&row.cell_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.first_completed_at)
        .bind(row.failed as i64)
        .bind(&row.failure_reason)
        .bind(&row.result)
        .bind(&row.task_definition)
        .bind(&self.guid)
        .execute(&mut *self.tx)
        .await?;

        self.tx.commit().await?;
        Ok(())
    }

    async fn commit_delete(mut self: Box<Self>) -> Result<(), TaskDbError> {
        sqlx::query("DELETE FROM tasks WHERE guid = ?")
            .bind(&self.guid)
            .execute(&mut *self.tx)
            .await?;
        self.tx.commit().await?;
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), TaskDbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
