//! Database layer for prime-counter
//!
//! Handles SQLite persistence for task bookkeeping, so job status survives a
//! restart of the API process.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`tasks`] - Task record CRUD and the [`JobStore`](crate::store::JobStore) impl

use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

use crate::error::DatabaseError;
use crate::types::{TaskId, TaskRecord, TaskState};
use crate::{Error, Result};

mod migrations;
mod tasks;

/// Task row as stored in the `tasks` table
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    /// Task UUID in hyphenated form
    pub id: String,
    /// Parent task UUID, if any
    pub parent_id: Option<String>,
    /// JSON-encoded [`TaskKind`](crate::types::TaskKind)
    pub kind: String,
    /// Raw state ("PENDING", "STARTED", "SUCCESS", "FAILURE")
    pub state: String,
    /// JSON-encoded [`TaskMeta`](crate::types::TaskMeta)
    pub meta: Option<String>,
    /// JSON-encoded [`TaskOutput`](crate::types::TaskOutput)
    pub output: Option<String>,
    /// Failure text
    pub info: Option<String>,
    /// Unix timestamp in milliseconds when the task was created
    pub created_at: i64,
    /// Unix timestamp in milliseconds when the task became terminal
    pub finished_at: Option<i64>,
}

impl TaskRow {
    fn corrupt(&self, reason: impl std::fmt::Display) -> Error {
        Error::Database(DatabaseError::CorruptRecord {
            id: self.id.clone(),
            reason: reason.to_string(),
        })
    }

    fn timestamp(&self, millis: i64) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| self.corrupt(format!("timestamp {} out of range", millis)))
    }
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = Error;

    fn try_from(row: TaskRow) -> Result<Self> {
        let id: TaskId = row.id.parse().map_err(|e| row.corrupt(e))?;
        let parent = row
            .parent_id
            .as_deref()
            .map(str::parse::<TaskId>)
            .transpose()
            .map_err(|e| row.corrupt(e))?;
        let kind = serde_json::from_str(&row.kind).map_err(|e| row.corrupt(e))?;
        let state = TaskState::parse(&row.state)
            .ok_or_else(|| row.corrupt(format!("unknown state {}", row.state)))?;
        let meta = row
            .meta
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| row.corrupt(e))?;
        let output = row
            .output
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| row.corrupt(e))?;
        let created_at = row.timestamp(row.created_at)?;
        let finished_at = row.finished_at.map(|ms| row.timestamp(ms)).transpose()?;

        Ok(TaskRecord {
            id,
            parent,
            kind,
            state,
            meta,
            output,
            info: row.info,
            created_at,
            finished_at,
        })
    }
}

/// Database handle for prime-counter
pub struct Database {
    pool: SqlitePool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
