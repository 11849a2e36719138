//! Schema: declares the single `tasks` relation used by every backend.
//!
//! Column types differ slightly between SQLite and PostgreSQL (`INTEGER`
//! vs `BIGINT`, `BLOB` vs `BYTEA`), so each backend keeps its own DDL
//! string here rather than forcing a lowest-common-denominator type.

pub const SQLITE_CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    guid                TEXT PRIMARY KEY,
    domain              TEXT NOT NULL,
    state               INTEGER NOT NULL,
    cell_id             TEXT NOT NULL DEFAULT '',
    created_at          INTEGER NOT NULL,
    updated_at          INTEGER NOT NULL,
    first_completed_at  INTEGER NOT NULL DEFAULT 0,
    failed              INTEGER NOT NULL DEFAULT 0,
    failure_reason      TEXT NOT NULL DEFAULT '',
    result              TEXT,
    task_definition     BLOB NOT NULL
)
"#;

pub const SQLITE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_tasks_domain ON tasks (domain)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_cell_id ON tasks (cell_id)",
];

pub const POSTGRES_CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    guid                TEXT PRIMARY KEY,
    domain              TEXT NOT NULL,
    state               INTEGER NOT NULL,
    cell_id             TEXT NOT NULL DEFAULT '',
    created_at          BIGINT NOT NULL,
    updated_at          BIGINT NOT NULL,
    first_completed_at  BIGINT NOT NULL DEFAULT 0,
    failed              BOOLEAN NOT NULL DEFAULT FALSE,
    failure_reason      TEXT NOT NULL DEFAULT '',
    result              TEXT,
    task_definition     BYTEA NOT NULL
)
"#;

pub const POSTGRES_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_tasks_domain ON tasks (domain)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_cell_id ON tasks (cell_id)",
];
