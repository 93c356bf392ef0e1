//! Core domain types for the job manager.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobStatus and JobState for units of work
//! - PoolConfig and PoolSummary for the worker pool
//! - Events carried from workers to the manager

mod events;
mod job;
mod pool;

pub use events::JobEvent;
pub use job::{Job, JobError, JobId, JobOutcome, JobResult, JobRow, JobState, JobStatus};
pub use pool::{
    ConfigError, ENV_EVENT_CAPACITY, ENV_MAX_WORKERS, ENV_SIGNAL_CAPACITY, ENV_TICK_MS,
    PoolConfig, PoolSummary,
};
