//! Event types carried from workers to the manager and its subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, JobResult, JobStatus, PoolSummary};

/// Events emitted while jobs execute.
///
/// For a single job the emission order is always
/// `Status(Running)`, any number of `Progress`, then either `Result` or
/// `Error` (or neither when stopped), the terminal `Status`, and finally
/// `Finished`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A job's status changed.
    Status {
        job_id: JobId,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    /// A job reported progress.
    Progress {
        job_id: JobId,
        progress: u8,
        timestamp: DateTime<Utc>,
    },
    /// A job produced its result.
    Result {
        job_id: JobId,
        result: JobResult,
        timestamp: DateTime<Utc>,
    },
    /// A job failed.
    Error {
        job_id: JobId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// A job's body has returned and its worker is free.
    Finished {
        job_id: JobId,
        timestamp: DateTime<Utc>,
    },
    /// Periodic pool occupancy report.
    PoolSummary {
        summary: PoolSummary,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    pub fn status(job_id: JobId, status: JobStatus) -> Self {
        JobEvent::Status {
            job_id,
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn progress(job_id: JobId, progress: u8) -> Self {
        JobEvent::Progress {
            job_id,
            progress,
            timestamp: Utc::now(),
        }
    }

    pub fn result(job_id: JobId, result: JobResult) -> Self {
        JobEvent::Result {
            job_id,
            result,
            timestamp: Utc::now(),
        }
    }

    pub fn error(job_id: JobId, error: impl Into<String>) -> Self {
        JobEvent::Error {
            job_id,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn finished(job_id: JobId) -> Self {
        JobEvent::Finished {
            job_id,
            timestamp: Utc::now(),
        }
    }

    pub fn pool_summary(summary: PoolSummary) -> Self {
        JobEvent::PoolSummary {
            summary,
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::Status { timestamp, .. } => *timestamp,
            JobEvent::Progress { timestamp, .. } => *timestamp,
            JobEvent::Result { timestamp, .. } => *timestamp,
            JobEvent::Error { timestamp, .. } => *timestamp,
            JobEvent::Finished { timestamp, .. } => *timestamp,
            JobEvent::PoolSummary { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            JobEvent::Status { job_id, .. } => Some(*job_id),
            JobEvent::Progress { job_id, .. } => Some(*job_id),
            JobEvent::Result { job_id, .. } => Some(*job_id),
            JobEvent::Error { job_id, .. } => Some(*job_id),
            JobEvent::Finished { job_id, .. } => Some(*job_id),
            JobEvent::PoolSummary { .. } => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::Status { job_id, status, .. } => format!("Job {} -> {}", job_id, status),
            JobEvent::Progress {
                job_id, progress, ..
            } => format!("Job {} at {}%", job_id, progress),
            JobEvent::Result { job_id, result, .. } => {
                format!("Job {} result: {}", job_id, result.summary)
            }
            JobEvent::Error { job_id, error, .. } => format!("Job {} failed: {}", job_id, error),
            JobEvent::Finished { job_id, .. } => format!("Job {} finished", job_id),
            JobEvent::PoolSummary { summary, .. } => summary.to_string(),
        }
    }
}
