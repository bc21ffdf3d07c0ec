//! Configuration types for prime-counter

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Upper bound on chunks per job accepted anywhere in the system
pub const MAX_CHUNKS: u32 = 128;

/// Main configuration for PrimeCounter
///
/// Fields are organized into sub-configs:
/// - [`orchestrator`](OrchestratorConfig) - submission limits and worker pool sizing
/// - [`persistence`](PersistenceConfig) - job store backend
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Submission limits and worker pool settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Job store backend
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let o = &self.orchestrator;
        if o.max_chunks == 0 || o.max_chunks > MAX_CHUNKS {
            return Err(Error::Config {
                message: format!("max_chunks must be between 1 and {}", MAX_CHUNKS),
                key: Some("max_chunks".into()),
            });
        }
        if o.min_n == 0 {
            return Err(Error::Config {
                message: "min_n must be at least 1".into(),
                key: Some("min_n".into()),
            });
        }
        if o.worker_concurrency == 0 {
            return Err(Error::Config {
                message: "worker_concurrency must be at least 1".into(),
                key: Some("worker_concurrency".into()),
            });
        }
        if o.queue_capacity == 0 {
            return Err(Error::Config {
                message: "queue_capacity must be at least 1".into(),
                key: Some("queue_capacity".into()),
            });
        }
        Ok(())
    }
}

/// Orchestrator and worker pool configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Smallest accepted `n` (default: 10000)
    #[serde(default = "default_min_n")]
    pub min_n: u64,

    /// Largest accepted chunk count (default: 128)
    #[serde(default = "default_max_chunks")]
    pub max_chunks: u32,

    /// Chunks counted in parallel across all jobs (default: available cores)
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Scheduled joins that may wait for the executor (default: 1024)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long shutdown waits for in-flight jobs, in seconds (default: 30)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            min_n: default_min_n(),
            max_chunks: default_max_chunks(),
            worker_concurrency: default_worker_concurrency(),
            queue_capacity: default_queue_capacity(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Job store backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite file at `database_path`
    #[default]
    Sqlite,
    /// Process-local map; state is lost on restart
    ///
    /// Records are never evicted, so memory grows with every job. Meant for
    /// tests and short-lived runs, not long-running servers.
    Memory,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Which store keeps task bookkeeping (default: sqlite)
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database path (default: "prime-counter.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["http://localhost:3000"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /docs (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

// Default value functions
fn default_min_n() -> u64 {
    10_000
}

fn default_max_chunks() -> u32 {
    MAX_CHUNKS
}

fn default_worker_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("prime-counter.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
