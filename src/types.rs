//! Core types for prime-counter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a task tracked by the job store
///
/// Every unit of work gets one: the top-level dispatch task (whose id is the
/// job id handed to clients), the join/barrier task, and each chunk task.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a fresh random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier returned to clients on submission (the top-level dispatch task)
pub type JobId = TaskId;

/// Reference to the fan-in join task of a job
///
/// Stored as the result of the top-level dispatch task. It is a pointer, not a
/// value: the real [`JobResult`] lives on the task it names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BarrierRef(pub TaskId);

impl BarrierRef {
    /// The task id of the join
    pub fn task_id(&self) -> TaskId {
        self.0
    }
}

impl std::fmt::Display for BarrierRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw per-task state as recorded by the job store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Created, not yet picked up by a worker
    Pending,
    /// Picked up and running
    Started,
    /// Finished with an output
    Success,
    /// Finished with an error
    Failure,
}

impl TaskState {
    /// Whether no further transition can happen from this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }

    /// Stable string form used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Started => "STARTED",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
        }
    }

    /// Parse the persisted string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(TaskState::Pending),
            "STARTED" => Some(TaskState::Started),
            "SUCCESS" => Some(TaskState::Success),
            "FAILURE" => Some(TaskState::Failure),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible job state, derived on every poll
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    /// Accepted but nothing observed yet
    Pending,
    /// Scheduled, or every chunk done while aggregation is not yet confirmed
    Started,
    /// Some but not all chunks are terminal
    Progress,
    /// Aggregation finished; a result is available
    Success,
    /// The job failed; an error message is available
    Failure,
}

/// One contiguous slice of `[1, n]`, with 1-based inclusive bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRange {
    /// Position of this range within its partition (0-based)
    pub index: u32,
    /// First number in the range
    pub start: u64,
    /// Last number in the range (inclusive)
    pub end: u64,
}

impl SubRange {
    /// Number of integers covered by this range
    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// Whether the range covers no integers
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A submitted counting job. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Id handed back to the client
    pub id: JobId,
    /// Upper bound of the range to count in
    pub n: u64,
    /// Number of chunks the range is split into
    pub chunk_count: u32,
    /// When the submission was accepted
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    /// Create a job stamped with the current time
    pub fn new(n: u64, chunk_count: u32) -> Self {
        Self {
            id: TaskId::new(),
            n,
            chunk_count,
            submitted_at: Utc::now(),
        }
    }
}

/// Final result of a job, produced once by the aggregation step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobResult {
    /// Number of primes in `[1, n]`
    pub prime_count: u64,
    /// Upper bound that was counted to
    pub n: u64,
    /// Wall-clock seconds from submission to aggregation
    pub duration_sec: f64,
}

/// A job-level result slot: either the value itself or a pointer to the task
/// that will carry it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum JobResultRef {
    /// The aggregated result
    Direct(JobResult),
    /// The join task that carries (or will carry) the result
    Indirect(BarrierRef),
}

/// Output recorded on a successfully finished task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TaskOutput {
    /// Prime count of a single chunk
    Count(u64),
    /// Job-level result slot (dispatch and join tasks)
    Job(JobResultRef),
}

/// What a task does. The names double as the registered task names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// Top-level task tracked by the client; schedules the fan-out and join
    Dispatch,
    /// One-shot join over the chunk tasks; runs the aggregation
    Aggregate,
    /// Counts primes in one sub-range
    Chunk {
        /// Chunk position (0-based)
        index: u32,
        /// First number in the chunk
        start: u64,
        /// Last number in the chunk (inclusive)
        end: u64,
        /// Total chunks in the job, for observability
        total: u32,
    },
}

impl TaskKind {
    /// Chunk index, if this is a chunk task
    pub fn chunk_index(&self) -> Option<u32> {
        match self {
            TaskKind::Chunk { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Orchestrator-supplied metadata attached to dispatch and join records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMeta {
    /// Declared number of chunks
    pub total: u32,
    /// Completed chunks at the time the snapshot was written
    pub completed: u32,
    /// Upper bound of the job
    pub n: u64,
}

/// Bookkeeping for one task, as held by the job store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task id
    pub id: TaskId,
    /// Task this one was fanned out from (chunks point at their join)
    pub parent: Option<TaskId>,
    /// What the task does
    pub kind: TaskKind,
    /// Raw state
    pub state: TaskState,
    /// Status snapshot written by the orchestrator
    pub meta: Option<TaskMeta>,
    /// Output, present once the task succeeded
    pub output: Option<TaskOutput>,
    /// Error text, present once the task failed
    pub info: Option<String>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// New record in `Pending` state
    pub fn new(id: TaskId, kind: TaskKind) -> Self {
        Self {
            id,
            parent: None,
            kind,
            state: TaskState::Pending,
            meta: None,
            output: None,
            info: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Set the parent task
    pub fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the initial raw state
    pub fn with_state(mut self, state: TaskState) -> Self {
        self.state = state;
        self
    }

    /// Attach a status snapshot
    pub fn with_meta(mut self, meta: TaskMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Create the record already succeeded with `output`
    pub fn with_output(mut self, output: TaskOutput) -> Self {
        self.state = TaskState::Success;
        self.output = Some(output);
        self.finished_at = Some(self.created_at);
        self
    }
}

/// How a task ended
#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome {
    /// Finished with an output
    Success(TaskOutput),
    /// Finished with an error message
    Failure(String),
}

impl TaskOutcome {
    /// The terminal state this outcome maps to
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Success(_) => TaskState::Success,
            TaskOutcome::Failure(_) => TaskState::Failure,
        }
    }
}

/// Chunk progress of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Progress {
    /// Chunks in a terminal state
    pub completed: u32,
    /// Total chunks
    pub total: u32,
}

/// Job status as returned to pollers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobStatus {
    /// Derived state
    pub state: JobState,
    /// Chunk progress, when known
    pub progress: Option<Progress>,
    /// Aggregated result, once the job succeeded
    pub result: Option<JobResult>,
    /// Error message, once the job failed
    pub error: Option<String>,
}
