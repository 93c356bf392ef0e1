//! Pool actor that bounds how many jobs execute at once.
//!
//! The pool owns a fixed set of worker actors. A submitted job goes to an
//! idle worker if there is one, otherwise it waits in a FIFO backlog until
//! a worker reports idle.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use job_core::{JobEvent, JobId, PoolSummary};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::mpsc;

use crate::handler::JobHandlerRegistry;
use crate::messages::{PoolMessage, QueuedJob, WorkerMessage};
use crate::worker_actor::{WorkerActor, WorkerArgs};

/// State for the pool actor.
pub struct PoolActorState {
    /// Maximum number of concurrently running jobs.
    capacity: usize,
    /// Jobs waiting for a worker, oldest first.
    backlog: VecDeque<QueuedJob>,
    /// Workers with nothing to do.
    idle: VecDeque<String>,
    /// All workers by ID.
    workers: HashMap<String, ActorRef<WorkerMessage>>,
    /// Busy workers and the job each one is running.
    running: HashMap<String, JobId>,
}

impl PoolActorState {
    fn summary(&self) -> PoolSummary {
        PoolSummary {
            running: self.running.len(),
            waiting: self.backlog.len(),
            capacity: self.capacity,
        }
    }

    /// Hand a job to a specific worker.
    fn dispatch(&mut self, worker_id: String, job: QueuedJob) -> Result<(), ActorProcessingErr> {
        let worker = self
            .workers
            .get(&worker_id)
            .ok_or_else(|| ActorProcessingErr::from(format!("Unknown worker: {}", worker_id)))?;
        let job_id = job.job.id;
        worker.send_message(WorkerMessage::ProcessJob { job: Box::new(job) })?;
        self.running.insert(worker_id, job_id);
        Ok(())
    }
}

/// Pool actor arguments.
pub struct PoolArgs {
    pub capacity: usize,
    pub handlers: Arc<JobHandlerRegistry>,
    pub signal_tx: mpsc::Sender<JobEvent>,
}

/// Pool actor that schedules jobs onto its workers.
pub struct PoolActor;

impl Actor for PoolActor {
    type Msg = PoolMessage;
    type State = PoolActorState;
    type Arguments = PoolArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting worker pool with {} workers", args.capacity);

        let mut workers = HashMap::new();
        let mut idle = VecDeque::new();
        for n in 1..=args.capacity {
            let worker_id = format!("worker-{}", n);
            let worker_args = WorkerArgs {
                worker_id: worker_id.clone(),
                pool: myself.clone(),
                handlers: args.handlers.clone(),
                signal_tx: args.signal_tx.clone(),
            };
            let (worker, _handle) = Actor::spawn(None, WorkerActor, worker_args)
                .await
                .map_err(|e| ActorProcessingErr::from(format!("Failed to spawn worker: {}", e)))?;
            workers.insert(worker_id.clone(), worker);
            idle.push_back(worker_id);
        }

        Ok(PoolActorState {
            capacity: args.capacity,
            backlog: VecDeque::new(),
            idle,
            workers,
            running: HashMap::new(),
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        for worker in state.workers.values() {
            let _ = worker.send_message(WorkerMessage::Shutdown);
        }
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            PoolMessage::Submit { job } => {
                let job = *job;
                if let Some(worker_id) = state.idle.pop_front() {
                    state.dispatch(worker_id, job)?;
                } else {
                    tracing::debug!("All workers busy, job {} waits", job.job.id);
                    state.backlog.push_back(job);
                }
            }

            PoolMessage::WorkerIdle { worker_id, job_id } => {
                if state.running.remove(&worker_id) != Some(job_id) {
                    tracing::warn!(
                        "Worker {} reported idle after unexpected job {}",
                        worker_id,
                        job_id
                    );
                }
                if let Some(next) = state.backlog.pop_front() {
                    state.dispatch(worker_id, next)?;
                } else {
                    state.idle.push_back(worker_id);
                }
            }

            PoolMessage::GetStats { reply } => {
                let _ = reply.send(state.summary());
            }

            PoolMessage::Shutdown => {
                tracing::info!("Shutting down worker pool");
                myself.stop(None);
            }
        }

        Ok(())
    }
}
