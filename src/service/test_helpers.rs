//! Shared test helpers for creating PrimeCounter instances in tests.

use crate::config::{Config, StoreBackend};
use crate::service::PrimeCounter;
use crate::types::{JobId, JobState, JobStatus};
use std::time::Duration;
use tempfile::tempdir;

/// Configuration pointing the SQLite store into `dir`
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.persistence.backend = StoreBackend::Sqlite;
    config.persistence.database_path = dir.join("test.db");
    config.orchestrator.worker_concurrency = 4;
    config.orchestrator.shutdown_timeout = Duration::from_secs(10);
    config
}

/// Helper to create a test PrimeCounter instance with a persistent database.
/// Returns the counter and the tempdir (which must be kept alive).
pub(crate) async fn create_test_counter() -> (PrimeCounter, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let counter = PrimeCounter::new(test_config(temp_dir.path()))
        .await
        .unwrap();
    (counter, temp_dir)
}

/// Helper to create a PrimeCounter backed by the in-memory store
pub(crate) async fn create_memory_counter() -> PrimeCounter {
    let mut config = Config::default();
    config.persistence.backend = StoreBackend::Memory;
    config.orchestrator.worker_concurrency = 4;
    PrimeCounter::new(config).await.unwrap()
}

/// Poll until the job reaches SUCCESS or FAILURE
pub(crate) async fn wait_for_terminal(counter: &PrimeCounter, job_id: JobId) -> JobStatus {
    for _ in 0..1000 {
        let status = counter.job_status(job_id).await.unwrap();
        if matches!(status.state, JobState::Success | JobState::Failure) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish in time");
}
