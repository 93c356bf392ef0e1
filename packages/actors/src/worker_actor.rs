//! Worker actor for executing jobs.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use job_core::{Job, JobError, JobEvent, JobStatus};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::mpsc;

use crate::handler::{HandlerResult, JobHandlerRegistry};
use crate::messages::{PoolMessage, QueuedJob, WorkerMessage};
use crate::signal::JobContext;

/// State for the worker actor.
pub struct WorkerActorState {
    /// Unique worker ID.
    pub worker_id: String,
    /// Pool actor reference.
    pub pool: ActorRef<PoolMessage>,
    /// Handler registry.
    pub handlers: Arc<JobHandlerRegistry>,
    /// Sending half of the manager's signal channel.
    pub signal_tx: mpsc::Sender<JobEvent>,
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub pool: ActorRef<PoolMessage>,
    pub handlers: Arc<JobHandlerRegistry>,
    pub signal_tx: mpsc::Sender<JobEvent>,
}

/// Worker actor that executes one job at a time.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::debug!("Starting worker: {}", args.worker_id);
        Ok(WorkerActorState {
            worker_id: args.worker_id,
            pool: args.pool,
            handlers: args.handlers,
            signal_tx: args.signal_tx,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::ProcessJob { job } => {
                let QueuedJob { job, cancel } = *job;
                let job_id = job.id;
                let ctx = JobContext::new(job_id, state.signal_tx.clone(), cancel);

                ctx.emit(JobEvent::status(job_id, JobStatus::Running)).await;
                tracing::debug!("Worker {} running job {}", state.worker_id, job_id);

                match execute(&state.handlers, &job, ctx.clone()).await {
                    Ok(result) => {
                        ctx.emit(JobEvent::result(job_id, result)).await;
                        ctx.emit(JobEvent::status(job_id, JobStatus::Complete)).await;
                    }
                    Err(JobError::Killed) => {
                        tracing::info!("Job {} stopped on request", job_id);
                        ctx.emit(JobEvent::status(job_id, JobStatus::Stopped)).await;
                    }
                    Err(JobError::Failed(error)) => {
                        ctx.emit(JobEvent::error(job_id, error)).await;
                        ctx.emit(JobEvent::status(job_id, JobStatus::Error)).await;
                    }
                }
                ctx.emit(JobEvent::finished(job_id)).await;

                state.pool.send_message(PoolMessage::WorkerIdle {
                    worker_id: state.worker_id.clone(),
                    job_id,
                })?;
            }

            WorkerMessage::Shutdown => {
                tracing::debug!("Shutting down worker: {}", state.worker_id);
                myself.stop(None);
            }
        }

        Ok(())
    }
}

/// Run the job's handler, turning panics into failures.
async fn execute(handlers: &JobHandlerRegistry, job: &Job, ctx: JobContext) -> HandlerResult {
    let Some(handler) = handlers.get(&job.job_type) else {
        return Err(JobError::Failed(format!(
            "No handler for job type: {}",
            job.job_type
        )));
    };

    AssertUnwindSafe(async move { handler.handle(job, ctx).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(JobError::Failed(panic_message(panic.as_ref()))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "job panicked".to_string()
    }
}
