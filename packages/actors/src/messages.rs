//! Message types for actor communication.

use job_core::{ConfigError, Job, JobId, JobRow, PoolSummary};
use ractor::RpcReplyPort;
use tokio_util::sync::CancellationToken;

use crate::registry::JobRecord;

/// A job handed to the pool together with its kill token.
#[derive(Debug)]
pub struct QueuedJob {
    pub job: Job,
    pub cancel: CancellationToken,
}

/// Messages for the PoolActor.
#[derive(Debug)]
pub enum PoolMessage {
    /// Run a job now or queue it behind the others.
    Submit { job: Box<QueuedJob> },

    /// A worker finished a job and can take another.
    WorkerIdle { worker_id: String, job_id: JobId },

    /// Get current occupancy.
    GetStats { reply: RpcReplyPort<PoolSummary> },

    /// Stop all workers and the pool.
    Shutdown,
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Run a job body to completion.
    ProcessJob { job: Box<QueuedJob> },

    /// Shutdown the worker.
    Shutdown,
}

/// Messages for the ManagerActor.
#[derive(Debug)]
pub enum ManagerMessage {
    /// Register a job and submit it to the pool.
    Enqueue {
        job: Box<Job>,
        reply: RpcReplyPort<Result<JobId, ActorError>>,
    },

    /// Ask a job to stop.
    Kill { job_id: JobId },

    /// Drop terminal jobs from the registry.
    Cleanup { reply: RpcReplyPort<usize> },

    /// Rows for display, in registration order.
    Snapshot { reply: RpcReplyPort<Vec<JobRow>> },

    /// Get a single registry entry.
    GetJob {
        job_id: JobId,
        reply: RpcReplyPort<Option<JobRecord>>,
    },

    /// Get pool occupancy.
    GetSummary { reply: RpcReplyPort<PoolSummary> },

    /// Periodic drain of worker signals.
    Tick,

    /// Shutdown the manager and its pool.
    Shutdown,
}

/// Error type for actor operations.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to spawn actor: {0}")]
    Spawn(String),

    #[error("Failed to send message: {0}")]
    Messaging(String),

    #[error("Actor stopped before replying")]
    NoReply,

    #[error("Job {0} is already registered")]
    DuplicateJob(JobId),
}
