//! Demo job handlers.

use std::time::Duration;

use actors::{
    FnHandler, HandlerResult, JobContext, JobHandlerRegistry, PercentParser, ProcessHandler,
};
use job_core::{Job, JobResult};

/// Build the handler registry used by the demo.
pub fn demo_handlers() -> JobHandlerRegistry {
    let mut handlers = JobHandlerRegistry::new();

    // Steps through 0..=100%, sleeping between steps
    handlers.register(FnHandler::new("sleep", |job: &Job, ctx: JobContext| {
        let step_ms = job
            .payload
            .get("step_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(50);
        Box::pin(step_through(step_ms, ctx))
    }));

    // Divides two numbers; a zero divisor panics inside the job
    handlers.register(FnHandler::new("divide", |job: &Job, _ctx: JobContext| {
        let numerator = job.payload.get("numerator").and_then(|v| v.as_i64()).unwrap_or(1);
        let divisor = job.payload.get("divisor").and_then(|v| v.as_i64()).unwrap_or(0);
        Box::pin(divide(numerator, divisor))
    }));

    handlers.register(ProcessHandler::new("command", PercentParser));

    handlers
}

async fn step_through(step_ms: u64, ctx: JobContext) -> HandlerResult {
    for progress in 0..=100 {
        ctx.check_cancelled()?;
        ctx.progress(progress).await;
        tokio::time::sleep(Duration::from_millis(step_ms)).await;
    }
    Ok(JobResult::new(format!("Stepped to 100% every {}ms", step_ms)))
}

async fn divide(numerator: i64, divisor: i64) -> HandlerResult {
    tracing::info!("Dividing {} by {}", numerator, divisor);
    Ok(JobResult::with_output(
        "divided",
        serde_json::json!(numerator / divisor),
    ))
}
