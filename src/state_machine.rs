//! StateMachine: guarded transitions over the Task lifecycle.
//!
//! Every public method here is one of the eight operations from the
//! specification. Each validates its inputs, takes a `Repository::lock` on
//! the target guid (opening the underlying transaction and locking read in
//! one step), inspects the current row, and either commits a new row,
//! commits a deletion, or releases the lock untouched. No method recovers
//! internally: any error path releases the lock first and the row is left
//! bit-exactly as it was.

use crate::clock::Clock;
use crate::codec;
use crate::error::TaskDbError;
use crate::error_map;
use crate::repository::Repository;
use crate::types::{Filter, Task, TaskDefinition, TaskRow, TaskState, MAX_FIELD_LEN};

fn check_len(field: &str, value: &str) -> Result<(), TaskDbError> {
    if value.len() > MAX_FIELD_LEN {
        return Err(TaskDbError::BadRequest(format!(
            "{field} exceeds {MAX_FIELD_LEN} bytes"
        )));
    }
    Ok(())
}

fn check_non_empty(field: &str, value: &str) -> Result<(), TaskDbError> {
    if value.is_empty() {
        return Err(TaskDbError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

fn to_task(row: TaskRow) -> Result<Task, TaskDbError> {
    let definition = codec::unmarshal(&row.task_definition)
        .map_err(|err| error_map::deserialize_error(&row.guid, err))?;
    Ok(Task {
        guid: row.guid,
        domain: row.domain,
        state: row.state,
        cell_id: row.cell_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
        first_completed_at: row.first_completed_at,
        failed: row.failed,
        failure_reason: row.failure_reason,
        result: row.result,
        definition,
    })
}

/// The eight guarded operations exposed to upstream handlers, generic over
/// the Repository backend and the injected Clock.
pub struct StateMachine<R, C> {
    repository: R,
    clock: C,
}

impl<R, C> StateMachine<R, C>
where
    R: Repository,
    C: Clock,
{
    pub fn new(repository: R, clock: C) -> Self {
        Self { repository, clock }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// DesireTask: creates a new Task in `Pending`.
    pub async fn desire_task(
        &self,
        definition: TaskDefinition,
        guid: &str,
        domain: &str,
    ) -> Result<(), TaskDbError> {
        check_non_empty("guid", guid)?;
        check_len("guid", guid)?;
        check_non_empty("domain", domain)?;
        check_len("domain", domain)?;

        let now = self.clock.now();
        let row = TaskRow {
            guid: guid.to_string(),
            domain: domain.to_string(),
            state: TaskState::Pending,
            cell_id: String::new(),
            created_at: now,
            updated_at: now,
            first_completed_at: 0,
            failed: false,
            failure_reason: String::new(),
            result: None,
            task_definition: codec::marshal(&definition),
        };

        tracing::debug!(guid, domain, "desiring task");
        self.repository.insert(row).await
    }

    /// Tasks: fail-fast listing. A corrupt payload aborts the whole call.
    pub async fn tasks(&self, filter: &Filter) -> Result<Vec<Task>, TaskDbError> {
        let rows = self.repository.select_all(filter).await?;
        rows.into_iter().map(to_task).collect()
    }

    /// Best-effort listing: corrupt rows are logged and skipped instead of
    /// aborting the call. Not part of the default contract — see the design
    /// note on listing under corruption.
    pub async fn tasks_best_effort(&self, filter: &Filter) -> Result<Vec<Task>, TaskDbError> {
        let rows = self.repository.select_all(filter).await?;
        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            let guid = row.guid.clone();
            match to_task(row) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    tracing::warn!(guid, error = %err, "skipping corrupt task in best-effort listing");
                }
            }
        }
        Ok(tasks)
    }

    /// TaskByGuid.
    pub async fn task_by_guid(&self, guid: &str) -> Result<Task, TaskDbError> {
        let row = self
            .repository
            .select_by_guid(guid)
            .await?
            .ok_or_else(|| error_map::resource_not_found(guid))?;
        to_task(row)
    }

    /// StartTask: `true` on a fresh Pending->Running transition, `false` on
    /// an idempotent retry from the same cell.
    pub async fn start_task(&self, guid: &str, cell_id: &str) -> Result<bool, TaskDbError> {
        check_non_empty("cell_id", cell_id)?;
        check_len("cell_id", cell_id)?;

        let now = self.clock.now();
        let guard = self.repository.lock(guid).await?;
        let current = match guard.current().cloned() {
            Some(row) => row,
            None => {
                guard.release().await?;
                return Err(error_map::resource_not_found(guid));
            }
        };

        match current.state {
            TaskState::Pending => {
                let mut row = current;
                row.state = TaskState::Running;
                row.cell_id = cell_id.to_string();
                row.updated_at = now;
                tracing::debug!(guid, cell_id, "starting task");
                guard.commit_write(row).await?;
                Ok(true)
            }
            TaskState::Running if current.cell_id == cell_id => {
                guard.release().await?;
                Ok(false)
            }
            TaskState::Running => {
                guard.release().await?;
                Err(TaskDbError::InvalidStateTransition {
                    from: TaskState::Running,
                    to: TaskState::Running,
                })
            }
            other => {
                guard.release().await?;
                Err(TaskDbError::InvalidStateTransition {
                    from: other,
                    to: TaskState::Running,
                })
            }
        }
    }

    /// CancelTask: returns the post-image and the pre-image's cell_id.
    pub async fn cancel_task(&self, guid: &str) -> Result<(Task, String), TaskDbError> {
        let now = self.clock.now();
        let guard = self.repository.lock(guid).await?;
        let current = match guard.current().cloned() {
            Some(row) => row,
            None => {
                guard.release().await?;
                return Err(error_map::resource_not_found(guid));
            }
        };

        match current.state {
            TaskState::Pending | TaskState::Running => {
                let previous_cell_id = current.cell_id.clone();
                let mut row = current;
                row.state = TaskState::Completed;
                row.failed = true;
                row.failure_reason = "task was cancelled".to_string();
                row.result = None;
                row.cell_id = String::new();
                row.first_completed_at = now;
                row.updated_at = now;
                tracing::debug!(guid, "cancelling task");
                guard.commit_write(row.clone()).await?;
                Ok((to_task(row)?, previous_cell_id))
            }
            other => {
                guard.release().await?;
                Err(TaskDbError::InvalidStateTransition {
                    from: other,
                    to: TaskState::Completed,
                })
            }
        }
    }

    /// CompleteTask: only the cell currently bound to the Task may complete it.
    #[allow(clippy::too_many_arguments)]
    pub async fn complete_task(
        &self,
        guid: &str,
        cell_id: &str,
        failed: bool,
        failure_reason: &str,
        result: &str,
    ) -> Result<Task, TaskDbError> {
        check_len("failure_reason", failure_reason)?;

        let now = self.clock.now();
        let guard = self.repository.lock(guid).await?;
        let current = match guard.current().cloned() {
            Some(row) => row,
            None => {
                guard.release().await?;
                return Err(error_map::resource_not_found(guid));
            }
        };

        match current.state {
            TaskState::Running if current.cell_id == cell_id => {
                let mut row = current;
                row.state = TaskState::Completed;
                row.cell_id = String::new();
                row.failed = failed;
                row.failure_reason = failure_reason.to_string();
                row.result = if failed {
                    None
                } else {
                    Some(result.to_string())
                };
                row.first_completed_at = now;
                row.updated_at = now;
                tracing::debug!(guid, cell_id, failed, "completing task");
                guard.commit_write(row.clone()).await?;
                to_task(row)
            }
            TaskState::Running => {
                let actual = current.cell_id.clone();
                guard.release().await?;
                Err(TaskDbError::RunningOnDifferentCell {
                    actual,
                    requested: cell_id.to_string(),
                })
            }
            other => {
                guard.release().await?;
                Err(TaskDbError::InvalidStateTransition {
                    from: other,
                    to: TaskState::Completed,
                })
            }
        }
    }

    /// FailTask: cell-agnostic failure path (e.g. scheduler-initiated).
    pub async fn fail_task(&self, guid: &str, failure_reason: &str) -> Result<Task, TaskDbError> {
        check_len("failure_reason", failure_reason)?;

        let now = self.clock.now();
        let guard = self.repository.lock(guid).await?;
        let current = match guard.current().cloned() {
            Some(row) => row,
            None => {
                guard.release().await?;
                return Err(error_map::resource_not_found(guid));
            }
        };

        match current.state {
            TaskState::Pending | TaskState::Running => {
                let mut row = current;
                row.state = TaskState::Completed;
                row.failed = true;
                row.failure_reason = failure_reason.to_string();
                row.result = None;
                row.cell_id = String::new();
                row.first_completed_at = now;
                row.updated_at = now;
                tracing::debug!(guid, "failing task");
                guard.commit_write(row.clone()).await?;
                to_task(row)
            }
            other => {
                guard.release().await?;
                Err(TaskDbError::InvalidStateTransition {
                    from: other,
                    to: TaskState::Completed,
                })
            }
        }
    }

    /// ResolvingTask: hands the completion outcome off to a consumer.
    pub async fn resolving_task(&self, guid: &str) -> Result<(), TaskDbError> {
        let now = self.clock.now();
        let guard = self.repository.lock(guid).await?;
        let current = match guard.current().cloned() {
            Some(row) => row,
            None => {
                guard.release().await?;
                return Err(error_map::resource_not_found(guid));
            }
        };

        match current.state {
            TaskState::Completed => {
                let mut row = current;
                row.state = TaskState::Resolving;
                row.updated_at = now;
                tracing::debug!(guid, "resolving task");
                guard.commit_write(row).await?;
                Ok(())
            }
            other => {
                guard.release().await?;
                Err(TaskDbError::InvalidStateTransition {
                    from: other,
                    to: TaskState::Resolving,
                })
            }
        }
    }

    /// DeleteTask: only permitted from Resolving.
    pub async fn delete_task(&self, guid: &str) -> Result<(), TaskDbError> {
        let guard = self.repository.lock(guid).await?;
        let current = match guard.current().cloned() {
            Some(row) => row,
            None => {
                guard.release().await?;
                return Err(error_map::resource_not_found(guid));
            }
        };

        match current.state {
            TaskState::Resolving => {
                tracing::debug!(guid, "deleting task");
                guard.commit_delete().await
            }
            other => {
                guard.release().await?;
                Err(TaskDbError::InvalidStateTransition {
                    from: other,
                    to: TaskState::Resolving,
                })
            }
        }
    }
}
