//! In-memory job store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::JobStore;
use crate::error::{DatabaseError, Error, Result};
use crate::types::{TaskId, TaskKind, TaskOutcome, TaskOutput, TaskRecord, TaskState};

#[derive(Default)]
struct Tables {
    tasks: HashMap<TaskId, TaskRecord>,
    children: HashMap<TaskId, Vec<TaskId>>,
}

/// Job store backed by a process-local map
///
/// All state is lost when the process exits, and finished jobs are never
/// evicted while it runs. Both maps live behind a single
/// lock so a batch insert is seen either entirely or not at all.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of task records held
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.tables.read().await.tasks.len()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_tasks(&self, records: &[TaskRecord]) -> Result<()> {
        let mut tables = self.tables.write().await;

        if let Some(dup) = records.iter().find(|r| tables.tasks.contains_key(&r.id)) {
            return Err(Error::Database(DatabaseError::ConstraintViolation(format!(
                "task {} already exists",
                dup.id
            ))));
        }

        for record in records {
            if let Some(parent) = record.parent {
                tables.children.entry(parent).or_default().push(record.id);
            }
            tables.tasks.insert(record.id, record.clone());
        }

        Ok(())
    }

    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn children_of(&self, id: TaskId) -> Result<Vec<TaskRecord>> {
        let tables = self.tables.read().await;
        let mut children: Vec<TaskRecord> = tables
            .children
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|child| tables.tasks.get(child).cloned())
                    .collect()
            })
            .unwrap_or_default();
        children.sort_by_key(|c| c.kind.chunk_index());
        Ok(children)
    }

    async fn unfinished_joins(&self) -> Result<Vec<TaskRecord>> {
        let tables = self.tables.read().await;
        let mut joins: Vec<TaskRecord> = tables
            .tasks
            .values()
            .filter(|r| r.kind == TaskKind::Aggregate && !r.state.is_terminal())
            .cloned()
            .collect();
        joins.sort_by_key(|r| r.created_at);
        Ok(joins)
    }

    async fn mark_started(&self, id: TaskId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let record = tables.tasks.get_mut(&id).ok_or(Error::JobNotFound(id))?;

        match record.state {
            TaskState::Pending => {
                record.state = TaskState::Started;
                Ok(())
            }
            TaskState::Started => Ok(()),
            from => Err(Error::InvalidTransition {
                id,
                from,
                to: TaskState::Started,
            }),
        }
    }

    async fn finish(&self, id: TaskId, outcome: TaskOutcome) -> Result<()> {
        let mut tables = self.tables.write().await;
        let record = tables.tasks.get_mut(&id).ok_or(Error::JobNotFound(id))?;

        if record.state.is_terminal() {
            return Err(Error::InvalidTransition {
                id,
                from: record.state,
                to: outcome.state(),
            });
        }

        record.state = outcome.state();
        record.finished_at = Some(chrono::Utc::now());
        match outcome {
            TaskOutcome::Success(output) => record.output = Some(output),
            TaskOutcome::Failure(info) => record.info = Some(info),
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

/// Shorthand used by tests across the crate
#[cfg(test)]
pub(crate) fn count_output(record: &TaskRecord) -> Option<u64> {
    match record.output {
        Some(TaskOutput::Count(c)) => Some(c),
        _ => None,
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskMeta;

    fn chunk(parent: TaskId, index: u32) -> TaskRecord {
        TaskRecord::new(
            TaskId::new(),
            TaskKind::Chunk {
                index,
                start: u64::from(index) * 10 + 1,
                end: u64::from(index + 1) * 10,
                total: 3,
            },
        )
        .with_parent(parent)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let barrier = TaskId::new();
        let record = TaskRecord::new(barrier, TaskKind::Aggregate).with_meta(TaskMeta {
            total: 3,
            completed: 0,
            n: 30,
        });
        store.insert_tasks(&[record.clone()]).await.unwrap();

        assert_eq!(store.get(barrier).await.unwrap(), Some(record));
        assert_eq!(store.get(TaskId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_children_come_back_in_chunk_order() {
        let store = MemoryStore::new();
        let barrier = TaskId::new();
        let records = vec![
            TaskRecord::new(barrier, TaskKind::Aggregate),
            chunk(barrier, 2),
            chunk(barrier, 0),
            chunk(barrier, 1),
        ];
        store.insert_tasks(&records).await.unwrap();

        let children = store.children_of(barrier).await.unwrap();
        let order: Vec<_> = children.iter().map(|c| c.kind.chunk_index()).collect();
        assert_eq!(order, vec![Some(0), Some(1), Some(2)]);
        assert!(store.children_of(children[0].id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected_atomically() {
        let store = MemoryStore::new();
        let barrier = TaskId::new();
        let existing = chunk(barrier, 0);
        store.insert_tasks(&[existing.clone()]).await.unwrap();

        let fresh = chunk(barrier, 1);
        let err = store
            .insert_tasks(&[fresh.clone(), existing])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Database(DatabaseError::ConstraintViolation(_))
        ));
        assert_eq!(store.get(fresh.id).await.unwrap(), None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_start_then_finish() {
        let store = MemoryStore::new();
        let record = chunk(TaskId::new(), 0);
        let id = record.id;
        store.insert_tasks(&[record]).await.unwrap();

        store.mark_started(id).await.unwrap();
        store.mark_started(id).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().unwrap().state, TaskState::Started);

        store
            .finish(id, TaskOutcome::Success(TaskOutput::Count(4)))
            .await
            .unwrap();
        let done = store.get(id).await.unwrap().unwrap();
        assert_eq!(done.state, TaskState::Success);
        assert_eq!(count_output(&done), Some(4));
        assert!(done.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_terminal_records_are_immutable() {
        let store = MemoryStore::new();
        let record = chunk(TaskId::new(), 0);
        let id = record.id;
        store.insert_tasks(&[record]).await.unwrap();
        store
            .finish(id, TaskOutcome::Failure("boom".into()))
            .await
            .unwrap();

        let err = store
            .finish(id, TaskOutcome::Success(TaskOutput::Count(1)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: TaskState::Failure,
                to: TaskState::Success,
                ..
            }
        ));
        assert!(store.mark_started(id).await.is_err());

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.info.as_deref(), Some("boom"));
        assert_eq!(record.output, None);
    }

    #[tokio::test]
    async fn test_unfinished_joins_skips_terminal_and_non_join_tasks() {
        let store = MemoryStore::new();
        let open = TaskRecord::new(TaskId::new(), TaskKind::Aggregate);
        let done = TaskRecord::new(TaskId::new(), TaskKind::Aggregate);
        let dispatch = TaskRecord::new(TaskId::new(), TaskKind::Dispatch);
        store
            .insert_tasks(&[open.clone(), done.clone(), dispatch])
            .await
            .unwrap();
        store
            .finish(done.id, TaskOutcome::Failure("x".into()))
            .await
            .unwrap();

        let joins = store.unfinished_joins().await.unwrap();
        assert_eq!(joins, vec![open]);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let store = MemoryStore::new();
        let id = TaskId::new();
        assert!(matches!(
            store.mark_started(id).await,
            Err(Error::JobNotFound(_))
        ));
        assert!(matches!(
            store.finish(id, TaskOutcome::Failure("x".into())).await,
            Err(Error::JobNotFound(_))
        ));
    }
}
