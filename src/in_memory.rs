//! In-memory Store + Repository backend.
//!
//! Suitable for development, testing, and fast deterministic unit tests of
//! the state machine itself. Tasks are stored in a `HashMap` behind a
//! `tokio::sync::Mutex`; the single mutex is the local analog of the
//! relational store's row-level lock — taking it for the duration of a
//! guarded transition serializes concurrent transitions the same way a
//! `SELECT ... FOR UPDATE` would (see the design note on row-level
//! serialization; this backend is explicitly single-process-only, which is
//! why a process-local mutex is an acceptable substitute here and nowhere
//! else in this crate).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::TaskDbError;
use crate::error_map;
use crate::repository::{Repository, TransitionGuard};
use crate::types::{Filter, TaskRow};

/// Configuration for the in-memory backend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfig {
    /// Maximum number of tasks to store (0 = unlimited).
    pub max_tasks: usize,
}

/// In-memory Store + Repository implementation.
#[derive(Clone)]
pub struct InMemoryStore {
    tasks: Arc<Mutex<HashMap<String, TaskRow>>>,
    config: InMemoryConfig,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(InMemoryConfig::default())
    }

    pub fn with_config(config: InMemoryConfig) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryStore {
    async fn insert(&self, row: TaskRow) -> Result<(), TaskDbError> {
        let mut tasks = self.tasks.lock().await;

        if self.config.max_tasks > 0 && tasks.len() >= self.config.max_tasks {
            return Err(TaskDbError::UnrecoverableStore(format!(
                "maximum tasks limit reached: {}",
                self.config.max_tasks
            )));
        }

        if tasks.contains_key(&row.guid) {
            return Err(error_map::resource_exists(&row.guid));
        }

        tasks.insert(row.guid.clone(), row);
        Ok(())
    }

    async fn select_by_guid(&self, guid: &str) -> Result<Option<TaskRow>, TaskDbError> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.get(guid).cloned())
    }

    async fn select_all(&self, filter: &Filter) -> Result<Vec<TaskRow>, TaskDbError> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.values().filter(|row| filter.matches(row)).cloned().collect())
    }

    async fn lock(&self, guid: &str) -> Result<Box<dyn TransitionGuard>, TaskDbError> {
        let guard = self.tasks.clone().lock_owned().await;
        let current = guard.get(guid).cloned();
        Ok(Box::new(InMemoryGuard {
            tasks: guard,
            guid: guid.to_string(),
            current,
        }))
    }
}

struct InMemoryGuard {
    tasks: OwnedMutexGuard<HashMap<String, TaskRow>>,
    guid: String,
    current: Option<TaskRow>,
}

#[async_trait]
impl TransitionGuard for InMemoryGuard {
    fn current(&self) -> Option<&TaskRow> {
        self.current.as_ref()
    }

    async fn commit_write(mut self: Box<Self>, row: TaskRow) -> Result<(), TaskDbError> {
        self.tasks.insert(self.guid.clone(), row);
        Ok(())
    }

    async fn commit_delete(mut self: Box<Self>) -> Result<(), TaskDbError> {
        self.tasks.remove(&self.guid);
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), TaskDbError> {
        Ok(())
    }
}
