//! Job store: per-task bookkeeping shared by the orchestrator, the executor
//! and the status resolver.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`] - process-local, for tests and throwaway runs
//! - [`Database`](crate::db::Database) - SQLite via sqlx

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{TaskId, TaskOutcome, TaskRecord};

mod memory;

pub use memory::MemoryStore;

/// Trait for the task state store
///
/// The contract every implementation keeps:
/// - `insert_tasks` is all-or-nothing.
/// - Terminal records (`Success`/`Failure`) never change again, so a job's
///   result is written at most once.
/// - Reads never mutate anything.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a batch of task records atomically
    ///
    /// # Errors
    ///
    /// Fails without persisting anything if any id already exists or the
    /// backend is unavailable.
    async fn insert_tasks(&self, records: &[TaskRecord]) -> Result<()>;

    /// Fetch a single task record
    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>>;

    /// Tasks whose parent is `id`, ordered by chunk index
    async fn children_of(&self, id: TaskId) -> Result<Vec<TaskRecord>>;

    /// Join tasks that have not reached a terminal state, oldest first
    ///
    /// Used on startup to pick up jobs interrupted by a restart.
    async fn unfinished_joins(&self) -> Result<Vec<TaskRecord>>;

    /// Move a task from `Pending` to `Started`
    ///
    /// Starting an already started task is a no-op, so redelivered work is
    /// harmless.
    ///
    /// # Errors
    ///
    /// `JobNotFound` for unknown ids, `InvalidTransition` for terminal tasks.
    async fn mark_started(&self, id: TaskId) -> Result<()>;

    /// Move a task to its terminal state
    ///
    /// # Errors
    ///
    /// `JobNotFound` for unknown ids, `InvalidTransition` if the task is
    /// already terminal.
    async fn finish(&self, id: TaskId, outcome: TaskOutcome) -> Result<()>;

    /// Human-readable backend name for logging
    fn name(&self) -> &'static str;

    /// Release backend resources. Later calls may fail.
    async fn close(&self) {}
}
