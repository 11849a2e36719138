//! Shared parity assertions for the StateMachine's eight operations.
//!
//! Each function takes a `&StateMachine<R, C>` so the same assertions run
//! against every backend. Backend-specific test modules (`in_memory.rs`,
//! `sqlite.rs`, `postgres.rs`) construct their own store + `FakeClock` and
//! call these functions; backend-only concerns (max_tasks enforcement,
//! connection setup) stay in those modules.
//!
//! This module is `pub(crate)` and only compiled in test builds.

use crate::clock::Clock;
use crate::error::TaskDbError;
use crate::repository::Repository;
use crate::state_machine::StateMachine;
use crate::types::{Filter, TaskDefinition, TaskRow, TaskState};

pub fn sample_definition() -> TaskDefinition {
    TaskDefinition {
        command: "run-build".to_string(),
        env: vec![("STAGE".to_string(), "prod".to_string())],
        cpu_weight: 1,
        memory_mb: 256,
        disk_mb: 512,
    }
}

/// Scenario 1: Desire then read back.
pub async fn desire_then_read_back<R: Repository, C: Clock>(sm: &StateMachine<R, C>) {
    sm.desire_task(sample_definition(), "parity-t1", "parity-d1")
        .await
        .unwrap();

    let tasks = sm.tasks(&Filter::default()).await.unwrap();
    let task = tasks
        .iter()
        .find(|t| t.guid == "parity-t1")
        .expect("task should be present");
    assert_eq!(task.domain, "parity-d1");
    assert_eq!(task.state, TaskState::Pending);
    assert_eq!(task.cell_id, "");
    assert_eq!(task.created_at, task.updated_at);
    assert_eq!(task.first_completed_at, 0);
}

/// Scenario 2: double Desire on the same guid is rejected, original row untouched.
pub async fn double_desire_rejected<R: Repository, C: Clock>(sm: &StateMachine<R, C>) {
    sm.desire_task(sample_definition(), "parity-t2", "parity-d1")
        .await
        .unwrap();

    let err = sm
        .desire_task(sample_definition(), "parity-t2", "parity-d2")
        .await
        .unwrap_err();
    assert!(matches!(err, TaskDbError::ResourceExists(_)));

    let task = sm.task_by_guid("parity-t2").await.unwrap();
    assert_eq!(task.domain, "parity-d1");
}

/// Scenario 3: Start / Start same cell / Start different cell.
pub async fn start_idempotent_then_conflict<R: Repository, C: Clock>(sm: &StateMachine<R, C>) {
    sm.desire_task(sample_definition(), "parity-t3", "parity-d1")
        .await
        .unwrap();

    assert!(sm.start_task("parity-t3", "cell-A").await.unwrap());
    let after_first = sm.task_by_guid("parity-t3").await.unwrap();

    assert!(!sm.start_task("parity-t3", "cell-A").await.unwrap());
    let after_retry = sm.task_by_guid("parity-t3").await.unwrap();
    assert_eq!(after_first, after_retry);

    let err = sm.start_task("parity-t3", "cell-B").await.unwrap_err();
    assert!(matches!(err, TaskDbError::InvalidStateTransition { .. }));
    let after_conflict = sm.task_by_guid("parity-t3").await.unwrap();
    assert_eq!(after_first, after_conflict);
}

/// Scenario 4: CompleteTask invoked by a cell other than the bound one.
pub async fn complete_on_wrong_cell_rejected<R: Repository, C: Clock>(sm: &StateMachine<R, C>) {
    sm.desire_task(sample_definition(), "parity-t4", "parity-d1")
        .await
        .unwrap();
    sm.start_task("parity-t4", "the-cell").await.unwrap();

    let before = sm.task_by_guid("parity-t4").await.unwrap();
    let err = sm
        .complete_task("parity-t4", "a-different-cell", true, "x", "y")
        .await
        .unwrap_err();
    match err {
        TaskDbError::RunningOnDifferentCell { actual, requested } => {
            assert_eq!(actual, "the-cell");
            assert_eq!(requested, "a-different-cell");
        }
        other => panic!("expected RunningOnDifferentCell, got {other:?}"),
    }
    let after = sm.task_by_guid("parity-t4").await.unwrap();
    assert_eq!(before, after);
}

/// Scenario 5: CancelTask from Running releases the cell and marks cancellation.
pub async fn cancel_from_running<R: Repository, C: Clock>(sm: &StateMachine<R, C>) {
    sm.desire_task(sample_definition(), "parity-t5", "parity-d1")
        .await
        .unwrap();
    sm.start_task("parity-t5", "the-cell").await.unwrap();

    let (task, previous_cell_id) = sm.cancel_task("parity-t5").await.unwrap();
    assert_eq!(task.state, TaskState::Completed);
    assert!(task.failed);
    assert_eq!(task.failure_reason, "task was cancelled");
    assert_eq!(task.result, None);
    assert_eq!(task.cell_id, "");
    assert_eq!(previous_cell_id, "the-cell");
}

/// Scenario 6: full happy path from Desire through Delete; a sibling task is unaffected.
pub async fn full_happy_path_to_deletion<R: Repository, C: Clock>(sm: &StateMachine<R, C>) {
    sm.desire_task(sample_definition(), "parity-t6a", "parity-d1")
        .await
        .unwrap();
    sm.desire_task(sample_definition(), "parity-t6b", "parity-d1")
        .await
        .unwrap();

    sm.start_task("parity-t6a", "cell-a").await.unwrap();
    sm.complete_task("parity-t6a", "cell-a", false, "", "some-result")
        .await
        .unwrap();
    sm.resolving_task("parity-t6a").await.unwrap();
    sm.delete_task("parity-t6a").await.unwrap();

    let err = sm.task_by_guid("parity-t6a").await.unwrap_err();
    assert!(matches!(err, TaskDbError::ResourceNotFound(_)));

    sm.start_task("parity-t6b", "cell-b").await.unwrap();
    sm.resolving_task("parity-t6b").await.unwrap_err(); // still Running
    sm.fail_task("parity-t6b", "boom").await.unwrap();
    sm.resolving_task("parity-t6b").await.unwrap();
    let sibling = sm.task_by_guid("parity-t6b").await.unwrap();
    assert_eq!(sibling.state, TaskState::Resolving);
}

/// Scenario 7: filters combine with logical AND.
pub async fn filters_combine_with_and<R: Repository, C: Clock>(sm: &StateMachine<R, C>) {
    sm.desire_task(sample_definition(), "parity-t7a", "d1")
        .await
        .unwrap();
    sm.desire_task(sample_definition(), "parity-t7b", "d2")
        .await
        .unwrap();
    sm.desire_task(sample_definition(), "parity-t7c", "d2")
        .await
        .unwrap();
    sm.start_task("parity-t7a", "c1").await.unwrap();
    sm.start_task("parity-t7b", "c2").await.unwrap();
    sm.start_task("parity-t7c", "c1").await.unwrap();

    let by_domain = sm
        .tasks(&Filter {
            domain: Some("d1".to_string()),
            cell_id: None,
        })
        .await
        .unwrap();
    assert!(by_domain.iter().any(|t| t.guid == "parity-t7a"));
    assert!(!by_domain.iter().any(|t| t.guid == "parity-t7b"));

    let by_both = sm
        .tasks(&Filter {
            domain: Some("d2".to_string()),
            cell_id: Some("c1".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(by_both.len(), 1);
    assert_eq!(by_both[0].guid, "parity-t7c");
}

/// Scenario 8: a corrupt stored payload is a fatal Deserialize error for reads.
pub async fn corrupt_payload_is_fatal_for_reads<R: Repository, C: Clock>(sm: &StateMachine<R, C>) {
    let row = TaskRow {
        guid: "parity-corrupt".to_string(),
        domain: "parity-d1".to_string(),
        state: TaskState::Pending,
        cell_id: String::new(),
        created_at: 0,
        updated_at: 0,
        first_completed_at: 0,
        failed: false,
        failure_reason: String::new(),
        result: None,
        task_definition: b"not a valid frame".to_vec(),
    };
    sm.repository().insert(row).await.unwrap();

    let err = sm.task_by_guid("parity-corrupt").await.unwrap_err();
    assert!(matches!(err, TaskDbError::Deserialize { .. }));

    let err = sm.tasks(&Filter::default()).await.unwrap_err();
    assert!(matches!(err, TaskDbError::Deserialize { .. }));
}

/// `tasks_best_effort` skips a corrupt row and still returns the valid ones.
pub async fn best_effort_listing_skips_corrupt_rows<R: Repository, C: Clock>(
    sm: &StateMachine<R, C>,
) {
    sm.desire_task(sample_definition(), "parity-be-good", "parity-d1")
        .await
        .unwrap();

    let row = TaskRow {
        guid: "parity-be-bad".to_string(),
        domain: "parity-d1".to_string(),
        state: TaskState::Pending,
        cell_id: String::new(),
        created_at: 0,
        updated_at: 0,
        first_completed_at: 0,
        failed: false,
        failure_reason: String::new(),
        result: None,
        task_definition: b"not a valid frame".to_vec(),
    };
    sm.repository().insert(row).await.unwrap();

    let err = sm.tasks(&Filter::default()).await.unwrap_err();
    assert!(matches!(err, TaskDbError::Deserialize { .. }));

    let tasks = sm.tasks_best_effort(&Filter::default()).await.unwrap();
    assert!(tasks.iter().any(|t| t.guid == "parity-be-good"));
    assert!(!tasks.iter().any(|t| t.guid == "parity-be-bad"));
}

/// Universal invariant check over the full result of `tasks`.
pub async fn universal_invariants_hold<R: Repository, C: Clock>(sm: &StateMachine<R, C>) {
    for task in sm.tasks(&Filter::default()).await.unwrap() {
        assert!(matches!(
            task.state,
            TaskState::Pending | TaskState::Running | TaskState::Completed | TaskState::Resolving
        ));
        assert_eq!(
            task.first_completed_at == 0,
            matches!(task.state, TaskState::Pending | TaskState::Running)
        );
        if matches!(task.state, TaskState::Completed | TaskState::Resolving) {
            assert_eq!(task.cell_id, "");
        }
        if task.failed {
            assert_eq!(task.state, TaskState::Completed);
        }
        assert!(task.created_at <= task.updated_at);
    }
}
