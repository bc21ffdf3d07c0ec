//! The prime-counter service: store, registry, executor, orchestrator and
//! resolver wired together.
//!
//! The `PrimeCounter` struct and its methods are organized by domain:
//! - [`lifecycle`] - Startup restore and shutdown coordination

mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::db::Database;
use crate::error::Result;
use crate::executor::Executor;
use crate::orchestrator::JobOrchestrator;
use crate::registry::TaskRegistry;
use crate::resolver::StatusResolver;
use crate::store::{JobStore, MemoryStore};
use crate::types::{JobId, JobStatus};
use crate::worker::{RangeWorker, TrialDivisionWorker};

/// Main service instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct PrimeCounter {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Store, worker and executor queue
    pub(crate) registry: TaskRegistry,
    /// Accepts submissions
    pub(crate) orchestrator: JobOrchestrator,
    /// Answers status polls
    pub(crate) resolver: StatusResolver,
    /// Runs scheduled joins
    pub(crate) executor: Arc<Executor>,
}

impl PrimeCounter {
    /// Create a new PrimeCounter instance
    ///
    /// This initializes all core components:
    /// - Opens the configured job store (creating and migrating SQLite if needed)
    /// - Builds the task registry around the trial-division worker
    /// - Starts the executor
    /// - Reschedules jobs left unfinished by a previous run
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn JobStore> = match config.persistence.backend {
            StoreBackend::Sqlite => {
                Arc::new(Database::new(&config.persistence.database_path).await?)
            }
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };

        let counter = Self::with_parts(config, store, Arc::new(TrialDivisionWorker));
        counter.restore_unfinished_jobs().await?;
        Ok(counter)
    }

    /// Create an instance around an existing store and worker
    ///
    /// No restore pass is run.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn JobStore>,
        worker: Arc<dyn RangeWorker>,
    ) -> Self {
        tracing::info!(
            store = store.name(),
            worker = worker.name(),
            worker_concurrency = config.orchestrator.worker_concurrency,
            "Initializing prime counter"
        );

        let (registry, joins) =
            TaskRegistry::new(store, worker, config.orchestrator.queue_capacity);
        let executor = Executor::start(
            registry.clone(),
            joins,
            config.orchestrator.worker_concurrency,
        );

        Self {
            config: Arc::new(config),
            orchestrator: JobOrchestrator::new(registry.clone()),
            resolver: StatusResolver::new(registry.clone()),
            registry,
            executor: Arc::new(executor),
        }
    }

    /// Submit a job counting primes in `[1, n]` split into `chunks` ranges
    ///
    /// Returns the job id once the work is scheduled. Input limits from
    /// `orchestrator.min_n` are enforced by the API layer, not here.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use prime_counter::{Config, PrimeCounter};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let counter = PrimeCounter::new(Config::default()).await?;
    ///     let job_id = counter.submit(50_000, 4).await?;
    ///     let status = counter.job_status(job_id).await?;
    ///     println!("{:?}", status.state);
    ///     Ok(())
    /// }
    /// ```
    pub async fn submit(&self, n: u64, chunks: u32) -> Result<JobId> {
        self.orchestrator.submit(n, chunks).await
    }

    /// Current status of a job
    pub async fn job_status(&self, job_id: JobId) -> Result<JobStatus> {
        self.resolver.resolve(job_id).await
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The job store in use
    pub fn store(&self) -> Arc<dyn JobStore> {
        Arc::clone(self.registry.store())
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.orchestrator.is_accepting()
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default:
    /// 127.0.0.1:8000).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let counter = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(counter, config).await })
    }
}

impl std::fmt::Debug for PrimeCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimeCounter")
            .field("registry", &self.registry)
            .field("accepting", &self.is_accepting())
            .finish_non_exhaustive()
    }
}
