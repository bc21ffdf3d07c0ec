//! Job submission: fan-out of chunk tasks behind a one-shot join.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::error::TrySendError;

use crate::error::{Error, Result};
use crate::executor::{ChunkTask, ScheduledJoin};
use crate::partition::partition;
use crate::registry::TaskRegistry;
use crate::types::{
    BarrierRef, Job, JobId, JobResult, JobResultRef, TaskId, TaskKind, TaskMeta, TaskOutput,
    TaskRecord,
};

/// Accepts counting jobs and schedules their fan-out
///
/// A submission writes, in one atomic batch:
/// - the top-level dispatch record (the job id clients poll), already
///   succeeded with a [`BarrierRef`] as its result and carrying the initial
///   `{total, completed: 0, n}` snapshot
/// - the join ("barrier") record that will carry the result
/// - one chunk record per sub-range, parented to the barrier
///
/// The join is then handed to the executor.
#[derive(Clone, Debug)]
pub struct JobOrchestrator {
    registry: TaskRegistry,
    accepting_new: Arc<AtomicBool>,
}

impl JobOrchestrator {
    /// Create an orchestrator that schedules through `registry`
    pub fn new(registry: TaskRegistry) -> Self {
        Self {
            registry,
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Refuse all further submissions with [`Error::ShuttingDown`]
    pub fn stop_accepting(&self) {
        self.accepting_new.store(false, Ordering::SeqCst);
    }

    /// Whether submissions are currently accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Submit a job counting primes in `[1, n]` split into `k` chunks
    ///
    /// Returns as soon as the fan-out and its join are scheduled; counting
    /// happens in the background.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `n == 0` or `k` is outside `1..=128`
    /// - [`Error::ShuttingDown`] once shutdown has begun
    /// - [`Error::Scheduling`] if the executor queue is full or closed, or the
    ///   job store rejected the batch. No job exists afterwards.
    pub async fn submit(&self, n: u64, k: u32) -> Result<JobId> {
        if !self.is_accepting() {
            return Err(Error::ShuttingDown);
        }

        let job = Job::new(n, k);
        let ranges = partition(n, k)?;

        // Reserve queue capacity first so a stored job always reaches the executor
        let permit = self.registry.joins().try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => Error::Scheduling("executor queue is full".into()),
            TrySendError::Closed(()) => Error::Scheduling("executor is not running".into()),
        })?;

        let barrier = TaskId::new();
        let meta = TaskMeta {
            total: k,
            completed: 0,
            n,
        };
        let chunks: Vec<ChunkTask> = ranges
            .into_iter()
            .map(|range| ChunkTask {
                id: TaskId::new(),
                range,
            })
            .collect();

        let mut records = Vec::with_capacity(chunks.len() + 2);
        records.push(
            TaskRecord::new(job.id, TaskKind::Dispatch)
                .with_meta(meta)
                .with_output(TaskOutput::Job(JobResultRef::Indirect(BarrierRef(
                    barrier,
                )))),
        );
        records.push(TaskRecord::new(barrier, TaskKind::Aggregate).with_meta(meta));
        records.extend(chunks.iter().map(|chunk| {
            TaskRecord::new(
                chunk.id,
                TaskKind::Chunk {
                    index: chunk.range.index,
                    start: chunk.range.start,
                    end: chunk.range.end,
                    total: k,
                },
            )
            .with_parent(barrier)
        }));

        self.registry
            .store()
            .insert_tasks(&records)
            .await
            .map_err(|e| Error::Scheduling(e.to_string()))?;

        let job_id = job.id;
        permit.send(ScheduledJoin {
            barrier,
            job,
            chunks,
            completed: Vec::new(),
        });

        tracing::info!(job_id = %job_id, barrier = %barrier, n, chunks = k, "Job submitted");

        Ok(job_id)
    }
}

/// The join callback: sum chunk counts into the job result
///
/// `duration_sec` is measured from `submitted_at` to now and rounded to two
/// decimals.
pub fn aggregate(results: &[u64], n: u64, submitted_at: DateTime<Utc>) -> JobResult {
    JobResult {
        prime_count: results.iter().sum(),
        n,
        duration_sec: elapsed_secs(submitted_at, Utc::now()),
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds().max(0);
    (millis as f64 / 10.0).round() / 100.0
}
