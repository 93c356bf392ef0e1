//! Manager actor that owns the job registry, plus the `JobManager` handle.
//!
//! Workers never touch the registry. They push [`JobEvent`]s into a bounded
//! channel and the manager applies them, one at a time, whenever it ticks or
//! answers a query.

use std::sync::Arc;
use std::time::Duration;

use job_core::{Job, JobEvent, JobId, JobRow, PoolConfig, PoolSummary};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort, SupervisionEvent};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::handler::JobHandlerRegistry;
use crate::messages::{ActorError, ManagerMessage, PoolMessage, QueuedJob};
use crate::pool_actor::{PoolActor, PoolArgs};
use crate::registry::{JobRecord, JobRegistry};

/// State for the manager actor.
pub struct ManagerState {
    registry: JobRegistry,
    pool: ActorRef<PoolMessage>,
    /// Receiving half of the worker signal channel.
    signal_rx: mpsc::Receiver<JobEvent>,
    /// Event broadcaster for subscribers.
    event_tx: broadcast::Sender<JobEvent>,
}

impl ManagerState {
    /// Apply every signal currently queued by the workers.
    fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.signal_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: JobEvent) {
        tracing::debug!("{}", event.description());
        match &event {
            JobEvent::Status { job_id, status, .. } => {
                self.registry.receive_status(*job_id, *status);
            }
            JobEvent::Progress {
                job_id, progress, ..
            } => {
                self.registry.receive_progress(*job_id, *progress);
            }
            JobEvent::Result { job_id, result, .. } => {
                self.registry.record_outcome(*job_id, Ok(result.clone()));
            }
            JobEvent::Error { job_id, error, .. } => {
                tracing::warn!("Job {} failed: {}", job_id, error);
                self.registry.record_outcome(*job_id, Err(error.clone()));
            }
            JobEvent::Finished { job_id, .. } => {
                self.registry.done(*job_id);
            }
            JobEvent::PoolSummary { .. } => {}
        }
        let _ = self.event_tx.send(event);
    }

    async fn pool_summary(&self) -> Result<PoolSummary, ActorProcessingErr> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.pool
            .send_message(PoolMessage::GetStats { reply: tx.into() })?;
        rx.await
            .map_err(|_| ActorProcessingErr::from("Pool stopped before replying"))
    }
}

/// Manager actor arguments.
pub struct ManagerArgs {
    pub config: PoolConfig,
    pub handlers: JobHandlerRegistry,
    pub event_tx: broadcast::Sender<JobEvent>,
}

/// Manager actor that tracks every job's lifecycle.
pub struct ManagerActor;

impl Actor for ManagerActor {
    type Msg = ManagerMessage;
    type State = ManagerState;
    type Arguments = ManagerArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting job manager");

        let (signal_tx, signal_rx) = mpsc::channel(args.config.signal_capacity);
        let pool_args = PoolArgs {
            capacity: args.config.max_workers,
            handlers: Arc::new(args.handlers),
            signal_tx,
        };
        let (pool, _handle) = Actor::spawn_linked(None, PoolActor, pool_args, myself.get_cell())
            .await
            .map_err(|e| ActorProcessingErr::from(format!("Failed to spawn pool: {}", e)))?;

        // Start periodic tick
        let myself_clone = myself.clone();
        let period = Duration::from_millis(args.config.tick_interval_ms);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if myself_clone.send_message(ManagerMessage::Tick).is_err() {
                    break;
                }
            }
        });

        Ok(ManagerState {
            registry: JobRegistry::new(),
            pool,
            signal_rx,
            event_tx: args.event_tx,
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let _ = state.pool.send_message(PoolMessage::Shutdown);
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ManagerMessage::Enqueue { job, reply } => {
                let job = *job;
                let job_id = job.id;
                let cancel = CancellationToken::new();
                if !state.registry.register(&job, cancel.clone()) {
                    tracing::warn!("Rejected job {}, id already registered", job_id);
                    let _ = reply.send(Err(ActorError::DuplicateJob(job_id)));
                    return Ok(());
                }
                tracing::info!("Job {} ({}) enqueued", job_id, job.job_type);

                state.pool.send_message(PoolMessage::Submit {
                    job: Box::new(QueuedJob { job, cancel }),
                })?;
                let _ = reply.send(Ok(job_id));
            }

            ManagerMessage::Kill { job_id } => {
                if state.registry.kill(job_id) {
                    tracing::info!("Kill requested for job {}", job_id);
                } else {
                    tracing::debug!("Kill ignored, job {} is not active", job_id);
                }
            }

            ManagerMessage::Cleanup { reply } => {
                state.drain();
                let removed = state.registry.cleanup();
                if removed > 0 {
                    tracing::info!("Cleaned up {} finished jobs", removed);
                }
                let _ = reply.send(removed);
            }

            ManagerMessage::Snapshot { reply } => {
                state.drain();
                let _ = reply.send(state.registry.rows());
            }

            ManagerMessage::GetJob { job_id, reply } => {
                state.drain();
                let _ = reply.send(state.registry.get(job_id).cloned());
            }

            ManagerMessage::GetSummary { reply } => {
                state.drain();
                let summary = state.pool_summary().await?;
                let _ = reply.send(summary);
            }

            ManagerMessage::Tick => {
                state.drain();
                match state.pool_summary().await {
                    Ok(summary) => {
                        tracing::trace!("{}", summary);
                        let _ = state.event_tx.send(JobEvent::pool_summary(summary));
                    }
                    Err(e) => tracing::debug!("Skipping pool summary: {}", e),
                }
            }

            ManagerMessage::Shutdown => {
                tracing::info!("Shutting down job manager");
                myself.stop(None);
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let SupervisionEvent::ActorTerminated(cell, _, reason) = message {
            tracing::debug!(
                "Pool actor {} terminated: {:?}",
                cell.get_id(),
                reason
            );
        }
        Ok(())
    }
}

/// Cloneable handle to a running job manager.
#[derive(Clone)]
pub struct JobManager {
    actor: ActorRef<ManagerMessage>,
    event_tx: broadcast::Sender<JobEvent>,
    capacity: usize,
}

impl JobManager {
    /// Validate the config, then start the manager, its pool and workers.
    pub async fn start(
        config: PoolConfig,
        handlers: JobHandlerRegistry,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), ActorError> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let capacity = config.max_workers;
        let args = ManagerArgs {
            config,
            handlers,
            event_tx: event_tx.clone(),
        };
        let (actor, handle) = Actor::spawn(None, ManagerActor, args)
            .await
            .map_err(|e| ActorError::Spawn(e.to_string()))?;

        let manager = Self {
            actor,
            event_tx,
            capacity,
        };
        Ok((manager, handle))
    }

    /// Register a job and hand it to the pool. Returns immediately.
    ///
    /// Fails with [`ActorError::DuplicateJob`] if a job with the same id is
    /// still in the registry.
    pub async fn enqueue(&self, job: Job) -> Result<JobId, ActorError> {
        self.call(|reply| ManagerMessage::Enqueue {
            job: Box::new(job),
            reply,
        })
        .await?
    }

    /// Ask an active job to stop. Unknown or finished ids are ignored.
    pub fn kill(&self, job_id: JobId) -> Result<(), ActorError> {
        self.actor
            .send_message(ManagerMessage::Kill { job_id })
            .map_err(|e| ActorError::Messaging(e.to_string()))
    }

    /// Drop every stopped, failed and completed job. Returns how many went.
    pub async fn cleanup(&self) -> Result<usize, ActorError> {
        self.call(|reply| ManagerMessage::Cleanup { reply }).await
    }

    /// Current rows in registration order.
    pub async fn snapshot(&self) -> Result<Vec<JobRow>, ActorError> {
        self.call(|reply| ManagerMessage::Snapshot { reply }).await
    }

    /// Current registry entry for one job.
    pub async fn job(&self, job_id: JobId) -> Result<Option<JobRecord>, ActorError> {
        self.call(|reply| ManagerMessage::GetJob { job_id, reply })
            .await
    }

    /// Running and waiting counts from the pool.
    pub async fn summary(&self) -> Result<PoolSummary, ActorError> {
        self.call(|reply| ManagerMessage::GetSummary { reply }).await
    }

    /// Receive every event the manager applies, plus periodic summaries.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stop the manager, its pool and workers.
    pub fn shutdown(&self) {
        let _ = self.actor.send_message(ManagerMessage::Shutdown);
    }

    async fn call<T, F>(&self, build: F) -> Result<T, ActorError>
    where
        T: Send + 'static,
        F: FnOnce(RpcReplyPort<T>) -> ManagerMessage,
    {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.actor
            .send_message(build(tx.into()))
            .map_err(|e| ActorError::Messaging(e.to_string()))?;
        rx.await.map_err(|_| ActorError::NoReply)
    }
}
