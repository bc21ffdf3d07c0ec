//! End-to-end tests for the submit/poll flow through the library API
//!
//! These run real counting jobs against a SQLite store in a temp directory.

mod common;

use common::{create_counter, sqlite_config, wait_for_terminal};
use prime_counter::{
    Config, Error, JobId, JobState, MemoryStore, PrimeCounter, RangeWorker, Result, SubRange,
    TrialDivisionWorker,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn counts_primes_below_one_hundred_thousand() {
    let (counter, _dir) = create_counter().await;

    let job_id = counter.submit(100_000, 8).await.unwrap();
    let status = wait_for_terminal(&counter, job_id).await;

    assert_eq!(status.state, JobState::Success);
    let result = status.result.unwrap();
    assert_eq!(result.prime_count, 9592);
    assert_eq!(result.n, 100_000);
    let progress = status.progress.unwrap();
    assert_eq!((progress.completed, progress.total), (8, 8));
    assert!(status.error.is_none());
}

#[tokio::test]
async fn chunk_count_does_not_change_the_answer() {
    let (counter, _dir) = create_counter().await;

    let mut jobs = Vec::new();
    for chunks in [1, 3, 7, 128] {
        jobs.push((chunks, counter.submit(20_000, chunks).await.unwrap()));
    }

    for (chunks, job_id) in jobs {
        let status = wait_for_terminal(&counter, job_id).await;
        assert_eq!(status.state, JobState::Success, "chunks={chunks}");
        assert_eq!(status.result.unwrap().prime_count, 2262, "chunks={chunks}");
    }
}

#[tokio::test]
async fn finished_jobs_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let counter = PrimeCounter::new(sqlite_config(&dir)).await.unwrap();
    let job_id = counter.submit(50_000, 4).await.unwrap();
    let before = wait_for_terminal(&counter, job_id).await;
    counter.shutdown().await.unwrap();

    let counter = PrimeCounter::new(sqlite_config(&dir)).await.unwrap();
    let after = counter.job_status(job_id).await.unwrap();

    assert_eq!(after.state, JobState::Success);
    assert_eq!(after.result, before.result);
    assert_eq!(after.result.unwrap().prime_count, 5133);
}

#[tokio::test]
async fn unknown_job_is_reported_as_not_found() {
    let (counter, _dir) = create_counter().await;

    let err = counter.job_status(JobId::new()).await.unwrap_err();
    assert!(matches!(err, Error::JobNotFound(_)));
}

/// Fails any range that contains 7919, the 1000th prime
struct FussyWorker;

impl RangeWorker for FussyWorker {
    fn count(&self, range: SubRange) -> Result<u64> {
        if range.start <= 7919 && 7919 <= range.end {
            return Err(Error::Worker("refusing to count 7919".into()));
        }
        TrialDivisionWorker.count(range)
    }

    fn name(&self) -> &'static str {
        "fussy"
    }
}

#[tokio::test]
async fn failing_chunk_fails_the_job() {
    let mut config = Config::default();
    config.orchestrator.worker_concurrency = 2;
    let counter =
        PrimeCounter::with_parts(config, Arc::new(MemoryStore::new()), Arc::new(FussyWorker));

    // 10000 in 4 chunks: 7919 falls in chunk 3 ([7501, 10000])
    let job_id = counter.submit(10_000, 4).await.unwrap();
    let status = wait_for_terminal(&counter, job_id).await;

    assert_eq!(status.state, JobState::Failure);
    assert!(status.result.is_none());
    assert_eq!(
        status.error.as_deref(),
        Some("chunk 3 failed: worker error: refusing to count 7919")
    );

    // Remaining chunks still finish, so progress settles at the full count
    tokio::time::sleep(Duration::from_millis(200)).await;
    let settled = counter.job_status(job_id).await.unwrap();
    assert_eq!(settled.state, JobState::Failure);
    assert_eq!(settled.progress.unwrap().completed, 4);
}

#[tokio::test]
async fn shutdown_refuses_new_jobs() {
    let (counter, _dir) = create_counter().await;
    counter.shutdown().await.unwrap();

    assert!(!counter.is_accepting());
    assert!(matches!(
        counter.submit(10_000, 4).await,
        Err(Error::ShuttingDown)
    ));
}
