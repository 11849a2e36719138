//! Core data model: the persisted row shape, the API-facing `Task`, the
//! opaque `TaskDefinition` payload, and the listing filter.

use serde::{Deserialize, Serialize};

/// Upper bound, in bytes, on every bounded string field (`guid`, `domain`,
/// `cell_id`, `failure_reason`). Enforced explicitly at the StateMachine
/// boundary rather than left to backend column limits.
pub const MAX_FIELD_LEN: usize = 255;

/// A Task's position in its lifecycle. Mirrors the `state` column, stored
/// as a 32-bit signed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TaskState {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Resolving = 3,
}

impl TaskState {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for TaskState {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TaskState::Pending),
            1 => Ok(TaskState::Running),
            2 => Ok(TaskState::Completed),
            3 => Ok(TaskState::Resolving),
            other => Err(other),
        }
    }
}

/// The immutable, opaque payload describing how to run a Task. Marshalled
/// to bytes by the codec at Desire time and never touched again by the
/// state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub command: String,
    pub env: Vec<(String, String)>,
    pub cpu_weight: u32,
    pub memory_mb: u32,
    pub disk_mb: u32,
}

/// The persisted row shape, as Repository reads and writes it. `result` is
/// nullable per the schema; every other bounded field carries its "unset"
/// state as an empty string rather than a null, matching the reference
/// scenarios in the specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub guid: String,
    pub domain: String,
    pub state: TaskState,
    pub cell_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub first_completed_at: i64,
    pub failed: bool,
    pub failure_reason: String,
    pub result: Option<String>,
    pub task_definition: Vec<u8>,
}

/// The API-facing view of a Task: identical to `TaskRow` except the opaque
/// `task_definition` bytes have been unmarshalled into a `TaskDefinition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub guid: String,
    pub domain: String,
    pub state: TaskState,
    pub cell_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub first_completed_at: i64,
    pub failed: bool,
    pub failure_reason: String,
    pub result: Option<String>,
    pub definition: TaskDefinition,
}

/// Recognized listing filter. An absent field matches every value; present
/// fields combine with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub domain: Option<String>,
    pub cell_id: Option<String>,
}

impl Filter {
    pub fn matches(&self, row: &TaskRow) -> bool {
        if let Some(domain) = &self.domain {
            if &row.domain != domain {
                return false;
            }
        }
        if let Some(cell_id) = &self.cell_id {
            if &row.cell_id != cell_id {
                return false;
            }
        }
        true
    }
}
