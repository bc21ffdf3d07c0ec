//! Startup restore and shutdown coordination.

use crate::error::{Error, Result};
use crate::executor::{ChunkTask, ScheduledJoin};
use crate::resolver::UNKNOWN_ERROR;
use crate::types::{Job, SubRange, TaskKind, TaskOutcome, TaskOutput, TaskRecord, TaskState};

use super::PrimeCounter;

impl PrimeCounter {
    /// Gracefully shut down the service
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new jobs (submissions fail with `ShuttingDown`)
    /// 2. Stops the executor and waits for in-flight jobs, bounded by
    ///    `orchestrator.shutdown_timeout`
    /// 3. Closes the job store
    ///
    /// Jobs still running when the timeout expires are picked up again on the
    /// next start when the SQLite store is used.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.orchestrator.stop_accepting();
        tracing::info!("Stopped accepting new jobs");

        let timeout = self.config.orchestrator.shutdown_timeout;
        if self.executor.shutdown(timeout).await {
            tracing::info!("All in-flight jobs completed");
        } else {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                active_joins = self.executor.active_count().await,
                "Timeout waiting for jobs to complete, proceeding with shutdown"
            );
        }

        self.registry.store().close().await;

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Reschedule joins left unfinished by a previous run
    ///
    /// Chunks that already succeeded keep their counts; the rest run again.
    /// A job with a failed chunk is closed as failed without rerunning
    /// anything. Returns the number of jobs rescheduled.
    pub(crate) async fn restore_unfinished_jobs(&self) -> Result<usize> {
        let store = self.registry.store();
        let joins = store.unfinished_joins().await?;

        if joins.is_empty() {
            tracing::debug!("No unfinished jobs to restore");
            return Ok(0);
        }

        let mut restored = 0;
        for barrier in joins {
            let children = store.children_of(barrier.id).await?;
            match plan_restore(&barrier, &children) {
                Ok(join) => {
                    tracing::info!(
                        barrier = %barrier.id,
                        remaining = join.chunks.len(),
                        reused = join.completed.len(),
                        "Restoring unfinished job"
                    );
                    self.registry
                        .joins()
                        .send(join)
                        .await
                        .map_err(|_| Error::Scheduling("executor is not running".into()))?;
                    restored += 1;
                }
                Err(info) => {
                    tracing::warn!(barrier = %barrier.id, error = %info, "Closing unrecoverable job");
                    if let Err(e) = store.finish(barrier.id, TaskOutcome::Failure(info)).await {
                        tracing::error!(barrier = %barrier.id, error = %e, "Failed to close job");
                    }
                }
            }
        }

        tracing::info!(restored, "Restored unfinished jobs");
        Ok(restored)
    }
}

/// Rebuild the join for an interrupted job, or explain why it cannot run
fn plan_restore(
    barrier: &TaskRecord,
    children: &[TaskRecord],
) -> std::result::Result<ScheduledJoin, String> {
    let meta = barrier
        .meta
        .ok_or_else(|| "job metadata missing after restart".to_string())?;

    if let Some(failed) = children.iter().find(|c| c.state == TaskState::Failure) {
        return Err(format!(
            "chunk {} failed: {}",
            failed.kind.chunk_index().unwrap_or_default(),
            failed.info.as_deref().unwrap_or(UNKNOWN_ERROR)
        ));
    }

    let mut chunks = Vec::new();
    let mut completed = Vec::new();
    for child in children {
        let TaskKind::Chunk {
            index, start, end, ..
        } = child.kind
        else {
            continue;
        };
        match (child.state, &child.output) {
            (TaskState::Success, Some(TaskOutput::Count(count))) => completed.push((index, *count)),
            _ => chunks.push(ChunkTask {
                id: child.id,
                range: SubRange { index, start, end },
            }),
        }
    }

    if chunks.len() + completed.len() != meta.total as usize {
        return Err(format!(
            "expected {} chunks after restart, found {}",
            meta.total,
            chunks.len() + completed.len()
        ));
    }

    Ok(ScheduledJoin {
        barrier: barrier.id,
        // The dispatch id is not linked from the join; the barrier id stands in
        job: Job {
            id: barrier.id,
            n: meta.n,
            chunk_count: meta.total,
            submitted_at: barrier.created_at,
        },
        chunks,
        completed,
    })
}
