//! `jobdesk`: runs a handful of demo jobs and draws their progress bars.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use actors::JobManager;
use job_core::{Job, JobEvent, PoolConfig};
use serde_json::json;
use ui::{JobListModel, ProgressDelegate, paint_list};

mod handlers;

/// Environment variable holding the log level (`error` .. `trace`).
const ENV_LOG: &str = "JOBDESK_LOG";
const BAR_WIDTH: u32 = 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let level = std::env::var(ENV_LOG)
        .ok()
        .and_then(|v| v.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = PoolConfig::from_env()?;
    let tick = Duration::from_millis(config.tick_interval_ms);
    tracing::info!("Starting with {} workers", config.max_workers);

    let (manager, handle) = JobManager::start(config, handlers::demo_handlers()).await?;
    let mut events = manager.subscribe();

    for step_ms in [20, 35, 50, 65] {
        manager
            .enqueue(Job::new("sleep", json!({ "step_ms": step_ms })))
            .await?;
    }
    manager
        .enqueue(Job::new("divide", json!({ "numerator": 7, "divisor": 0 })))
        .await?;
    manager
        .enqueue(Job::new(
            "command",
            json!({
                "program": "sh",
                "args": ["-c", "for i in 10 20 30 40 50 60 70 80 90 100; do echo \"$i%\"; sleep 0.2; done"],
            }),
        ))
        .await?;
    let doomed = manager
        .enqueue(Job::new("sleep", json!({ "step_ms": 100 })))
        .await?;

    let delegate = ProgressDelegate::default();
    let colored = std::io::stdout().is_terminal();
    let mut interval = tokio::time::interval(tick);
    let mut killed = false;

    loop {
        interval.tick().await;

        while let Ok(event) = events.try_recv() {
            if let JobEvent::PoolSummary { summary, .. } = event {
                tracing::debug!("{}", summary);
            }
        }

        let model = JobListModel::from_rows(manager.snapshot().await?);
        if !killed
            && model
                .row_for(doomed)
                .and_then(|i| model.get(i))
                .is_some_and(|row| row.state.progress >= 30)
        {
            manager.kill(doomed)?;
            killed = true;
        }

        let painter = paint_list(&model, &delegate, BAR_WIDTH);
        let frame = if colored {
            format!("\x1b[2J\x1b[H{}", painter.render_ansi())
        } else {
            painter.render()
        };
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(frame.as_bytes())?;
        stdout.flush()?;

        if model.iter().all(|row| row.state.status.is_terminal()) {
            break;
        }
    }

    let removed = manager.cleanup().await?;
    tracing::info!("Cleaned up {} jobs", removed);

    manager.shutdown();
    let _ = handle.await;
    Ok(())
}
