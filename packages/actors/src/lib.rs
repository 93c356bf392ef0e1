//! Actor system for the job manager.
//!
//! This crate provides the Ractor-based actors that run jobs with
//! bounded concurrency and track their state.
//!
//! # Architecture
//!
//! - `ManagerActor` - Owns the job registry and applies worker signals
//! - `PoolActor` - Hands jobs to idle workers, queues the rest in FIFO order
//! - `WorkerActor` - Executes one job body at a time
//!
//! # Usage
//!
//! ```ignore
//! use actors::{JobManager, JobHandlerRegistry};
//! use job_core::{Job, PoolConfig};
//!
//! let (manager, _handle) = JobManager::start(PoolConfig::default(), handlers).await?;
//! let job_id = manager.enqueue(Job::new("sleep", payload)).await?;
//! manager.kill(job_id)?;
//! ```

mod handler;
mod manager;
mod messages;
mod pool_actor;
pub mod process;
pub mod registry;
mod signal;
mod worker_actor;

pub use handler::{FnHandler, HandlerFuture, HandlerResult, JobHandler, JobHandlerRegistry};
pub use manager::{JobManager, ManagerActor};
pub use messages::{ActorError, ManagerMessage, PoolMessage, QueuedJob, WorkerMessage};
pub use pool_actor::PoolActor;
pub use process::{OutputParser, ParsedLine, PercentParser, ProcessHandler};
pub use registry::{JobRecord, JobRegistry};
pub use signal::JobContext;
pub use worker_actor::WorkerActor;

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
pub use tokio_util::sync::CancellationToken;
