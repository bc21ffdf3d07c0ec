//! The task registry: the one place that knows which store, which worker and
//! which executor queue a running service uses.
//!
//! Built once at startup and handed to [`JobOrchestrator`](crate::JobOrchestrator)
//! and [`StatusResolver`](crate::StatusResolver), so neither reaches for global
//! state.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::executor::ScheduledJoin;
use crate::store::JobStore;
use crate::worker::RangeWorker;

/// Shared handles to the store, the worker and the executor queue
#[derive(Clone)]
pub struct TaskRegistry {
    store: Arc<dyn JobStore>,
    worker: Arc<dyn RangeWorker>,
    joins: mpsc::Sender<ScheduledJoin>,
}

impl TaskRegistry {
    /// Build a registry and the receiving end of its join queue
    ///
    /// The receiver is handed to [`Executor::start`](crate::executor::Executor::start).
    pub fn new(
        store: Arc<dyn JobStore>,
        worker: Arc<dyn RangeWorker>,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<ScheduledJoin>) {
        let (joins, rx) = mpsc::channel(queue_capacity.max(1));
        tracing::debug!(
            store = store.name(),
            worker = worker.name(),
            queue_capacity,
            "Task registry initialized"
        );
        (
            Self {
                store,
                worker,
                joins,
            },
            rx,
        )
    }

    /// The job store
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// The worker used for chunk tasks
    pub fn worker(&self) -> &Arc<dyn RangeWorker> {
        &self.worker
    }

    pub(crate) fn joins(&self) -> &mpsc::Sender<ScheduledJoin> {
        &self.joins
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("store", &self.store.name())
            .field("worker", &self.worker.name())
            .finish_non_exhaustive()
    }
}
