//! Job domain types for units of work run by the pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current status of a job in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is registered and waiting for a free worker.
    #[default]
    Waiting,
    /// Job body is executing on a worker.
    Running,
    /// Job body observed a kill request and stopped.
    Stopped,
    /// Job body failed or panicked.
    Error,
    /// Job body returned a result.
    Complete,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Stopped | JobStatus::Error | JobStatus::Complete
        )
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Running => "running",
            JobStatus::Stopped => "stopped",
            JobStatus::Error => "error",
            JobStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display state of a job: its status and a percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobState {
    pub status: JobStatus,
    /// Progress percentage, 0 to 100.
    pub progress: u8,
}

impl JobState {
    pub const MAX_PROGRESS: u8 = 100;

    pub fn new(status: JobStatus, progress: u8) -> Self {
        Self {
            status,
            progress: progress.min(Self::MAX_PROGRESS),
        }
    }
}

/// A job's identity and display state, as shown in one list row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRow {
    pub job_id: JobId,
    pub job_type: String,
    pub state: JobState,
}

/// Result of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Human-readable summary of the result.
    pub summary: String,
    /// Optional structured output data as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl JobResult {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            output: None,
        }
    }

    pub fn with_output(summary: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            summary: summary.into(),
            output: Some(output),
        }
    }
}

/// Ways a job body can end without a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// The body saw its kill request and gave up.
    #[error("job killed")]
    Killed,

    #[error("{0}")]
    Failed(String),
}

impl From<String> for JobError {
    fn from(message: String) -> Self {
        JobError::Failed(message)
    }
}

impl From<&str> for JobError {
    fn from(message: &str) -> Self {
        JobError::Failed(message.to_string())
    }
}

/// Final outcome of a job: a result or an error description.
pub type JobOutcome = Result<JobResult, String>;

/// A job represents a unit of work to be executed by the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Type of job (used for routing to handlers).
    pub job_type: String,
    /// Job payload as JSON.
    pub payload: serde_json::Value,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job with a fresh ID.
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Waiting.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Complete.is_terminal());
    }

    #[test]
    fn default_state_is_waiting_at_zero() {
        let state = JobState::default();
        assert_eq!(state.status, JobStatus::Waiting);
        assert_eq!(state.progress, 0);
    }

    #[test]
    fn state_clamps_progress() {
        assert_eq!(JobState::new(JobStatus::Running, 250).progress, 100);
    }

    #[test]
    fn job_id_parses_its_display_form() {
        let id = JobId::new();
        assert_eq!(JobId::parse(&id.to_string()).ok(), Some(id));
        assert!(JobId::parse("not-a-ulid").is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Complete).unwrap();
        assert_eq!(json, "\"complete\"");
    }

    #[test]
    fn job_error_displays_message() {
        assert_eq!(JobError::from("boom").to_string(), "boom");
        assert_eq!(JobError::Killed.to_string(), "job killed");
    }
}
