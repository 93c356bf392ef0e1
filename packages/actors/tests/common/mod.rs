#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use actors::{
    FnHandler, HandlerResult, JobContext, JobHandler, JobHandlerRegistry, JobManager, JobRecord,
};
use job_core::{Job, JobError, JobEvent, JobId, JobResult, JobRow, PoolConfig};
use tokio::sync::{Semaphore, broadcast};
use tokio::time::Instant;

pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

const TIMEOUT: Duration = Duration::from_secs(10);
const POLL: Duration = Duration::from_millis(5);

/// Start a manager with a fast tick.
pub async fn start(max_workers: usize, handlers: JobHandlerRegistry) -> TestResult<JobManager> {
    let config = PoolConfig::with_max_workers(max_workers).with_tick_interval_ms(10);
    let (manager, _handle) = JobManager::start(config, handlers).await?;
    Ok(manager)
}

/// Poll the manager until the job's record satisfies `pred`.
pub async fn wait_for_job<F>(manager: &JobManager, job_id: JobId, pred: F) -> TestResult<JobRecord>
where
    F: Fn(&JobRecord) -> bool,
{
    let deadline = Instant::now() + TIMEOUT;
    loop {
        if let Some(record) = manager.job(job_id).await?
            && pred(&record)
        {
            return Ok(record);
        }
        if Instant::now() > deadline {
            return Err(format!("timed out waiting for job {}", job_id).into());
        }
        tokio::time::sleep(POLL).await;
    }
}

/// Poll the manager until its rows satisfy `pred`.
pub async fn wait_for_rows<F>(manager: &JobManager, pred: F) -> TestResult<Vec<JobRow>>
where
    F: Fn(&[JobRow]) -> bool,
{
    let deadline = Instant::now() + TIMEOUT;
    loop {
        let rows = manager.snapshot().await?;
        if pred(&rows) {
            return Ok(rows);
        }
        if Instant::now() > deadline {
            return Err(format!("timed out waiting for rows, last saw {:?}", rows).into());
        }
        tokio::time::sleep(POLL).await;
    }
}

/// Collect events until `finished` jobs have reported `Finished`.
pub async fn collect_until_finished(
    rx: &mut broadcast::Receiver<JobEvent>,
    finished: usize,
) -> TestResult<Vec<JobEvent>> {
    let mut events = Vec::new();
    let mut seen = 0;
    while seen < finished {
        let event = tokio::time::timeout(TIMEOUT, rx.recv()).await??;
        if matches!(event, JobEvent::Finished { .. }) {
            seen += 1;
        }
        events.push(event);
    }
    Ok(events)
}

/// Tracks how many job bodies run at the same time.
#[derive(Clone, Default)]
pub struct Tracker {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Tracker {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

async fn gated(gate: Arc<Semaphore>, tracker: Tracker) -> HandlerResult {
    tracker.enter();
    let permit = gate.acquire_owned().await;
    tracker.exit();
    match permit {
        Ok(permit) => {
            permit.forget();
            Ok(JobResult::new("released"))
        }
        Err(e) => Err(JobError::Failed(e.to_string())),
    }
}

/// Jobs of type "gated" block until the test adds a permit to `gate`.
/// They never look at their kill token.
pub fn gated_handlers(gate: Arc<Semaphore>, tracker: Tracker) -> JobHandlerRegistry {
    JobHandlerRegistry::new().with(FnHandler::new("gated", move |_job: &Job, _ctx: JobContext| {
        Box::pin(gated(gate.clone(), tracker.clone()))
    }))
}

async fn sleepy(millis: u64, tracker: Tracker) -> HandlerResult {
    tracker.enter();
    tokio::time::sleep(Duration::from_millis(millis)).await;
    tracker.exit();
    Ok(JobResult::new(format!("slept {}ms", millis)))
}

/// Jobs of type "sleep" sleep for `payload.millis`.
pub fn sleep_handler(tracker: Tracker) -> impl JobHandler {
    FnHandler::new("sleep", move |job: &Job, _ctx: JobContext| {
        let millis = job.payload.get("millis").and_then(|v| v.as_u64()).unwrap_or(10);
        Box::pin(sleepy(millis, tracker.clone()))
    })
}

async fn count_to_hundred(ctx: JobContext) -> HandlerResult {
    for step in (0..=100).step_by(10) {
        ctx.progress(step).await;
    }
    Ok(JobResult::new("counted"))
}

/// Jobs of type "count" report 0, 10, ... 100 and complete.
pub fn count_handler() -> impl JobHandler {
    FnHandler::new("count", |_job: &Job, ctx: JobContext| {
        Box::pin(count_to_hundred(ctx))
    })
}

async fn loop_until_killed(ctx: JobContext) -> HandlerResult {
    for step in 0..2000_u32 {
        ctx.check_cancelled()?;
        ctx.progress((step % 100) as u8).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Ok(JobResult::new("never killed"))
}

/// Jobs of type "loop" run for ~10s, checking their kill token each step.
pub fn loop_handler() -> impl JobHandler {
    FnHandler::new("loop", |_job: &Job, ctx: JobContext| {
        Box::pin(loop_until_killed(ctx))
    })
}

async fn divide(numerator: i64, divisor: i64) -> HandlerResult {
    let quotient = numerator / divisor;
    Ok(JobResult::new(format!("{}", quotient)))
}

/// Jobs of type "divide" compute `payload.numerator / payload.divisor`.
pub fn divide_handler() -> impl JobHandler {
    FnHandler::new("divide", |job: &Job, _ctx: JobContext| {
        let numerator = job.payload.get("numerator").and_then(|v| v.as_i64()).unwrap_or(1);
        let divisor = job.payload.get("divisor").and_then(|v| v.as_i64()).unwrap_or(0);
        Box::pin(divide(numerator, divisor))
    })
}

async fn fail(message: String) -> HandlerResult {
    Err(JobError::Failed(message))
}

/// Jobs of type "fail" return `payload.message` as an error.
pub fn fail_handler() -> impl JobHandler {
    FnHandler::new("fail", |job: &Job, _ctx: JobContext| {
        let message = job
            .payload
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("failed")
            .to_string();
        Box::pin(fail(message))
    })
}
