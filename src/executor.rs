//! Executor: runs scheduled joins on the worker pool.
//!
//! The orchestrator hands each accepted job to the executor as a
//! [`ScheduledJoin`]. A single processor loop receives joins and spawns one
//! join task per job. The join task:
//! 1. Runs every chunk concurrently, bounded by a semaphore shared across jobs
//! 2. Records each chunk's outcome in the job store as it finishes
//! 3. Fails the barrier on the first chunk failure, or
//! 4. Aggregates once every chunk succeeded and records the result on the barrier
//!
//! The barrier is only ever written by its own join task, and the store
//! refuses to overwrite a terminal record, so aggregation runs at most once.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::aggregate;
use crate::registry::TaskRegistry;
use crate::types::{Job, JobResultRef, SubRange, TaskId, TaskOutcome, TaskOutput};

/// Interval between checks while waiting for in-flight joins to drain
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One chunk of a scheduled job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTask {
    /// Task id of the chunk record
    pub id: TaskId,
    /// Range the chunk counts in
    pub range: SubRange,
}

/// A job's fan-out together with the join that closes it
#[derive(Debug, Clone)]
pub struct ScheduledJoin {
    /// Task id of the join; carries the job result once aggregated
    pub barrier: TaskId,
    /// The job being counted
    pub job: Job,
    /// Chunk tasks still to run, in declaration order
    pub chunks: Vec<ChunkTask>,
    /// `(index, count)` of chunks that already succeeded in an earlier run
    pub completed: Vec<(u32, u64)>,
}

/// Outcome of one chunk as seen by its join
#[derive(Debug)]
struct ChunkReport {
    index: u32,
    result: std::result::Result<u64, String>,
}

/// Background executor for scheduled joins
pub struct Executor {
    cancel: CancellationToken,
    processor: Mutex<Option<JoinHandle<()>>>,
    active_joins: Arc<Mutex<HashSet<TaskId>>>,
}

impl Executor {
    /// Start the processor loop
    ///
    /// Spawns a background task that continuously:
    /// 1. Waits for the next scheduled join
    /// 2. Spawns a join task for it
    /// 3. Repeats until shutdown, then drains whatever is still queued
    ///
    /// `worker_concurrency` caps the number of chunks counted at the same
    /// time across all jobs.
    pub fn start(
        registry: TaskRegistry,
        mut joins: mpsc::Receiver<ScheduledJoin>,
        worker_concurrency: usize,
    ) -> Self {
        let cancel = CancellationToken::new();
        let active_joins = Arc::new(Mutex::new(HashSet::new()));
        let limiter = Arc::new(Semaphore::new(worker_concurrency.max(1)));

        let loop_cancel = cancel.clone();
        let loop_active = Arc::clone(&active_joins);

        let processor = tokio::spawn(async move {
            let mut closing = false;
            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled(), if !closing => {
                        // Stop taking new joins but run the ones already queued
                        joins.close();
                        closing = true;
                        tracing::debug!("Executor closing, draining queued joins");
                    }
                    next = joins.recv() => {
                        let Some(join) = next else { break };
                        let barrier = join.barrier;

                        loop_active.lock().await.insert(barrier);

                        let registry = registry.clone();
                        let limiter = Arc::clone(&limiter);
                        let active = Arc::clone(&loop_active);
                        tokio::spawn(async move {
                            run_join(registry, limiter, join).await;
                            active.lock().await.remove(&barrier);
                        });
                    }
                }
            }
            tracing::debug!("Executor processor loop stopped");
        });

        Self {
            cancel,
            processor: Mutex::new(Some(processor)),
            active_joins,
        }
    }

    /// Number of joins currently running
    pub async fn active_count(&self) -> usize {
        self.active_joins.lock().await.len()
    }

    /// Stop the processor loop and wait for in-flight joins
    ///
    /// Returns `true` if every join finished within `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.cancel.cancel();
        let processor = self.processor.lock().await.take();

        let drain = async {
            if let Some(handle) = processor
                && let Err(e) = handle.await
            {
                tracing::warn!(error = %e, "Executor processor loop ended abnormally");
            }
            loop {
                let active_count = self.active_count().await;
                if active_count == 0 {
                    return;
                }
                tracing::debug!(active_count, "Waiting for active joins to complete");
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, drain).await.is_ok()
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Run every chunk of a job, then close its barrier exactly once
async fn run_join(registry: TaskRegistry, limiter: Arc<Semaphore>, join: ScheduledJoin) {
    let ScheduledJoin {
        barrier,
        job,
        chunks,
        completed,
    } = join;
    let total = chunks.len() + completed.len();

    tracing::info!(
        job_id = %job.id,
        barrier = %barrier,
        n = job.n,
        chunks = total,
        "Dispatched chunk tasks"
    );

    let mut pending: FuturesUnordered<_> = chunks
        .into_iter()
        .map(|chunk| run_chunk(&registry, Arc::clone(&limiter), job.id, total, chunk))
        .collect();

    let mut counts: Vec<Option<u64>> = vec![None; total];
    for (index, count) in completed {
        if let Some(slot) = counts.get_mut(index as usize) {
            *slot = Some(count);
        }
    }
    let mut failed = false;

    while let Some(report) = pending.next().await {
        match report.result {
            Ok(count) => {
                if let Some(slot) = counts.get_mut(report.index as usize) {
                    *slot = Some(count);
                }
            }
            Err(reason) if !failed => {
                failed = true;
                let info = format!("chunk {} failed: {}", report.index, reason);
                tracing::warn!(job_id = %job.id, barrier = %barrier, error = %info, "Job failed");
                close_barrier(&registry, barrier, TaskOutcome::Failure(info)).await;
            }
            Err(_) => {}
        }
    }

    if failed {
        tracing::debug!(job_id = %job.id, "Skipping aggregation for failed job");
        return;
    }

    let Some(counts) = counts.into_iter().collect::<Option<Vec<u64>>>() else {
        let info = "chunk results missing at aggregation".to_string();
        tracing::error!(job_id = %job.id, barrier = %barrier, "{}", info);
        close_barrier(&registry, barrier, TaskOutcome::Failure(info)).await;
        return;
    };

    let result = aggregate(&counts, job.n, job.submitted_at);
    tracing::info!(
        job_id = %job.id,
        prime_count = result.prime_count,
        n = result.n,
        duration_sec = result.duration_sec,
        "Aggregation complete"
    );

    close_barrier(
        &registry,
        barrier,
        TaskOutcome::Success(TaskOutput::Job(JobResultRef::Direct(result))),
    )
    .await;
}

async fn close_barrier(registry: &TaskRegistry, barrier: TaskId, outcome: TaskOutcome) {
    if let Err(e) = registry.store().finish(barrier, outcome).await {
        tracing::error!(barrier = %barrier, error = %e, "Failed to record job outcome");
    }
}

/// Count one chunk on the blocking pool and record its outcome
async fn run_chunk(
    registry: &TaskRegistry,
    limiter: Arc<Semaphore>,
    job_id: TaskId,
    total: usize,
    chunk: ChunkTask,
) -> ChunkReport {
    let ChunkTask { id, range } = chunk;
    let index = range.index;

    let _permit = match limiter.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            let reason = "worker pool closed".to_string();
            finish_chunk(registry, id, TaskOutcome::Failure(reason.clone())).await;
            return ChunkReport {
                index,
                result: Err(reason),
            };
        }
    };

    if let Err(e) = registry.store().mark_started(id).await {
        tracing::warn!(task_id = %id, error = %e, "Could not mark chunk as started");
    }

    tracing::info!(
        job_id = %job_id,
        chunk = index + 1,
        total,
        start = range.start,
        end = range.end,
        "Processing chunk"
    );

    let worker = Arc::clone(registry.worker());
    let result = match tokio::task::spawn_blocking(move || worker.count(range)).await {
        Ok(Ok(count)) => Ok(count),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("worker task panicked: {}", e)),
    };

    let outcome = match &result {
        Ok(count) => {
            tracing::info!(job_id = %job_id, chunk = index + 1, total, primes = count, "Chunk complete");
            TaskOutcome::Success(TaskOutput::Count(*count))
        }
        Err(reason) => {
            tracing::warn!(job_id = %job_id, chunk = index + 1, total, error = %reason, "Chunk failed");
            TaskOutcome::Failure(reason.clone())
        }
    };
    finish_chunk(registry, id, outcome).await;

    ChunkReport { index, result }
}

async fn finish_chunk(registry: &TaskRegistry, id: TaskId, outcome: TaskOutcome) {
    if let Err(e) = registry.store().finish(id, outcome).await {
        tracing::error!(task_id = %id, error = %e, "Failed to record chunk outcome");
    }
}
