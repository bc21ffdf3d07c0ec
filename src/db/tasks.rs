//! Task record CRUD operations.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::store::JobStore;
use crate::types::{TaskId, TaskKind, TaskOutcome, TaskRecord, TaskState};
use crate::{Error, Result};

use super::{Database, TaskRow};

const SELECT_TASK: &str = r#"
    SELECT id, parent_id, kind, state, meta, output, info, created_at, finished_at
    FROM tasks
"#;

impl Database {
    /// Insert a batch of task records in one transaction
    ///
    /// Parents must come before their children in `records`.
    pub async fn insert_tasks(&self, records: &[TaskRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        for record in records {
            let meta = record.meta.as_ref().map(serde_json::to_string).transpose()?;
            let output = record
                .output
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT INTO tasks (
                    id, parent_id, kind, chunk_index, state,
                    meta, output, info, created_at, finished_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.id.to_string())
            .bind(record.parent.map(|p| p.to_string()))
            .bind(serde_json::to_string(&record.kind)?)
            .bind(record.kind.chunk_index().map(i64::from))
            .bind(record.state.as_str())
            .bind(meta)
            .bind(output)
            .bind(&record.info)
            .bind(record.created_at.timestamp_millis())
            .bind(record.finished_at.map(|t| t.timestamp_millis()))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let unique = e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation());
                if unique {
                    Error::Database(DatabaseError::ConstraintViolation(format!(
                        "task {} already exists",
                        record.id
                    )))
                } else {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to insert task: {}",
                        e
                    )))
                }
            })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit tasks: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get a task by ID
    pub async fn get_task(&self, id: TaskId) -> Result<Option<TaskRecord>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("{} WHERE id = ?", SELECT_TASK))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get task: {}",
                    e
                )))
            })?;

        row.map(TaskRecord::try_from).transpose()
    }

    /// List the children of a task, ordered by chunk index
    pub async fn list_children(&self, parent: TaskId) -> Result<Vec<TaskRecord>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "{} WHERE parent_id = ? ORDER BY chunk_index ASC, created_at ASC",
            SELECT_TASK
        ))
        .bind(parent.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list child tasks: {}",
                e
            )))
        })?;

        rows.into_iter().map(TaskRecord::try_from).collect()
    }

    /// List join tasks that are not yet terminal, oldest first
    pub async fn list_unfinished_joins(&self) -> Result<Vec<TaskRecord>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "{} WHERE kind = ? AND state IN ('PENDING', 'STARTED') ORDER BY created_at ASC",
            SELECT_TASK
        ))
        .bind(serde_json::to_string(&TaskKind::Aggregate)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list unfinished joins: {}",
                e
            )))
        })?;

        rows.into_iter().map(TaskRecord::try_from).collect()
    }

    /// Move a pending task to started
    pub async fn start_task(&self, id: TaskId) -> Result<()> {
        let result =
            sqlx::query("UPDATE tasks SET state = 'STARTED' WHERE id = ? AND state = 'PENDING'")
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to start task: {}",
                        e
                    )))
                })?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.get_task(id).await? {
            None => Err(Error::JobNotFound(id)),
            Some(record) if record.state == TaskState::Started => Ok(()),
            Some(record) => Err(Error::InvalidTransition {
                id,
                from: record.state,
                to: TaskState::Started,
            }),
        }
    }

    /// Record the terminal outcome of a task
    ///
    /// Only non-terminal rows are updated, so a finished task keeps its first
    /// outcome even with concurrent writers.
    pub async fn finish_task(&self, id: TaskId, outcome: TaskOutcome) -> Result<()> {
        let to = outcome.state();
        let (output, info) = match outcome {
            TaskOutcome::Success(output) => (Some(serde_json::to_string(&output)?), None),
            TaskOutcome::Failure(info) => (None, Some(info)),
        };
        let now = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET state = ?, output = ?, info = ?, finished_at = ?
            WHERE id = ? AND state IN ('PENDING', 'STARTED')
            "#,
        )
        .bind(to.as_str())
        .bind(output)
        .bind(info)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to finish task: {}",
                e
            )))
        })?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.get_task(id).await? {
            None => Err(Error::JobNotFound(id)),
            Some(record) => Err(Error::InvalidTransition {
                id,
                from: record.state,
                to,
            }),
        }
    }

    /// Count tasks in a given raw state
    #[cfg(test)]
    pub(crate) async fn count_tasks_in_state(&self, state: TaskState) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE state = ?")
            .bind(state.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count tasks: {}",
                    e
                )))
            })?;

        Ok(count)
    }
}

#[async_trait]
impl JobStore for Database {
    async fn insert_tasks(&self, records: &[TaskRecord]) -> Result<()> {
        Database::insert_tasks(self, records).await
    }

    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>> {
        self.get_task(id).await
    }

    async fn children_of(&self, id: TaskId) -> Result<Vec<TaskRecord>> {
        self.list_children(id).await
    }

    async fn unfinished_joins(&self) -> Result<Vec<TaskRecord>> {
        self.list_unfinished_joins().await
    }

    async fn mark_started(&self, id: TaskId) -> Result<()> {
        self.start_task(id).await
    }

    async fn finish(&self, id: TaskId, outcome: TaskOutcome) -> Result<()> {
        self.finish_task(id, outcome).await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
