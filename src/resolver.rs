//! Turning raw task bookkeeping into one externally visible job status.
//!
//! [`derive_status`] is a pure function over a record and its children; the
//! [`StatusResolver`] only fetches those from the job store. Nothing here
//! writes, so polling is idempotent and safe from any number of callers.

use crate::error::{DatabaseError, Error, Result};
use crate::registry::TaskRegistry;
use crate::types::{
    JobId, JobResult, JobResultRef, JobState, JobStatus, Progress, TaskOutput, TaskRecord,
    TaskState,
};

/// Error text reported for failed jobs that carry no message
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Resolves job ids to [`JobStatus`] snapshots
#[derive(Clone, Debug)]
pub struct StatusResolver {
    registry: TaskRegistry,
}

impl StatusResolver {
    /// Create a resolver reading through `registry`
    pub fn new(registry: TaskRegistry) -> Self {
        Self { registry }
    }

    /// Current status of a job
    ///
    /// # Errors
    ///
    /// [`Error::JobNotFound`] if the id was never issued, or store errors.
    pub async fn resolve(&self, job_id: JobId) -> Result<JobStatus> {
        let store = self.registry.store();
        let mut record = store.get(job_id).await?.ok_or(Error::JobNotFound(job_id))?;

        let barrier = match (record.state, &record.output) {
            (TaskState::Success, Some(TaskOutput::Job(JobResultRef::Indirect(barrier)))) => {
                Some(barrier.task_id())
            }
            _ => None,
        };

        if let Some(barrier) = barrier {
            record = store.get(barrier).await?.ok_or_else(|| {
                Error::Database(DatabaseError::CorruptRecord {
                    id: job_id.to_string(),
                    reason: format!("join task {} is missing", barrier),
                })
            })?;
        }

        let children = store.children_of(record.id).await?;
        let status = derive_status(&record, &children);

        tracing::debug!(job_id = %job_id, state = ?status.state, "Resolved job status");
        Ok(status)
    }
}

/// Derive a job status from a (possibly unwrapped) record and its children
pub fn derive_status(record: &TaskRecord, children: &[TaskRecord]) -> JobStatus {
    let declared_total = record.meta.map(|m| m.total).unwrap_or(0);
    let completed = children.iter().filter(|c| c.state.is_terminal()).count() as u32;

    let (mut progress, total) = if !children.is_empty() {
        let total = children.len() as u32;
        (Some(Progress { completed, total }), total)
    } else if declared_total > 0 {
        (
            Some(Progress {
                completed: 0,
                total: declared_total,
            }),
            declared_total,
        )
    } else {
        (None, 0)
    };

    let state = derive_state(record.state, completed, total);

    let mut status = JobStatus {
        state,
        progress,
        result: None,
        error: None,
    };

    match state {
        JobState::Success => {
            if let Some(p) = progress.as_mut() {
                p.completed = p.total;
            }
            status.progress = progress;
            status.result = direct_result(record);
        }
        JobState::Failure => {
            status.error = Some(
                record
                    .info
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            );
        }
        _ => {}
    }

    status
}

/// State precedence, first match wins
///
/// 1. raw `SUCCESS` → `SUCCESS`
/// 2. raw `FAILURE` → `FAILURE`
/// 3. some but not all children terminal → `PROGRESS`
/// 4. every child terminal, not yet `SUCCESS` → `STARTED`
/// 5. raw `PENDING` → `PENDING`
/// 6. otherwise → `STARTED`
pub fn derive_state(raw: TaskState, completed: u32, total: u32) -> JobState {
    match raw {
        TaskState::Success => JobState::Success,
        TaskState::Failure => JobState::Failure,
        _ if completed > 0 && completed < total => JobState::Progress,
        _ if total > 0 && completed == total => JobState::Started,
        TaskState::Pending => JobState::Pending,
        TaskState::Started => JobState::Started,
    }
}

fn direct_result(record: &TaskRecord) -> Option<JobResult> {
    match &record.output {
        Some(TaskOutput::Job(JobResultRef::Direct(result))) => Some(result.clone()),
        _ => None,
    }
}
