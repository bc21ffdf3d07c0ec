//! Shared helpers for integration tests

#![allow(dead_code)]

use prime_counter::config::StoreBackend;
use prime_counter::{Config, JobId, JobState, JobStatus, PrimeCounter};
use std::time::Duration;
use tempfile::TempDir;

/// Config with the SQLite store placed inside `dir`
pub fn sqlite_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.persistence.backend = StoreBackend::Sqlite;
    config.persistence.database_path = dir.path().join("jobs.db");
    config.orchestrator.worker_concurrency = 4;
    config.orchestrator.shutdown_timeout = Duration::from_secs(10);
    config
}

/// Create a counter backed by a fresh SQLite file
pub async fn create_counter() -> (PrimeCounter, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let counter = PrimeCounter::new(sqlite_config(&temp_dir))
        .await
        .expect("Failed to create counter");
    (counter, temp_dir)
}

/// Poll a job until it reaches SUCCESS or FAILURE
///
/// Also checks that reported progress never goes backwards.
pub async fn wait_for_terminal(counter: &PrimeCounter, job_id: JobId) -> JobStatus {
    let mut last_completed = 0;
    for _ in 0..2000 {
        let status = counter
            .job_status(job_id)
            .await
            .expect("Failed to get job status");
        if let Some(progress) = status.progress {
            assert!(
                progress.completed >= last_completed,
                "progress went backwards: {} -> {}",
                last_completed,
                progress.completed
            );
            assert!(progress.completed <= progress.total);
            last_completed = progress.completed;
        }
        if matches!(status.state, JobState::Success | JobState::Failure) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish in time");
}
