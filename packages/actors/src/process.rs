//! Jobs that run an external program and parse its output.

use std::process::Stdio;
use std::sync::Arc;

use job_core::{Job, JobError, JobResult};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::handler::{HandlerFuture, HandlerResult, JobHandler};
use crate::signal::JobContext;

/// Longest stderr line kept for the failure message, in bytes.
const STDERR_TAIL_BYTES: usize = 512;

/// Payload of a process job.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// What a single line of program output means to the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Progress(u8),
    Output(String),
    Ignore,
}

/// Turns a program's stdout lines into job signals.
pub trait OutputParser: Send + Sync + 'static {
    fn parse(&self, line: &str) -> ParsedLine;
}

/// Reads `NN%` tokens as progress. Every other non-empty line is output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentParser;

impl OutputParser for PercentParser {
    fn parse(&self, line: &str) -> ParsedLine {
        let line = line.trim();
        if line.is_empty() {
            return ParsedLine::Ignore;
        }
        let percent = line
            .split_whitespace()
            .rev()
            .filter_map(|token| token.strip_suffix('%'))
            .find_map(|number| number.parse::<f64>().ok())
            .filter(|value| (0.0..=100.0).contains(value));
        match percent {
            Some(value) => ParsedLine::Progress(value.round() as u8),
            None => ParsedLine::Output(line.to_string()),
        }
    }
}

/// Handler that runs the program named in the job payload.
pub struct ProcessHandler {
    job_type: String,
    parser: Arc<dyn OutputParser>,
}

impl ProcessHandler {
    pub fn new(job_type: impl Into<String>, parser: impl OutputParser) -> Self {
        Self {
            job_type: job_type.into(),
            parser: Arc::new(parser),
        }
    }
}

impl JobHandler for ProcessHandler {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    fn handle(&self, job: &Job, ctx: JobContext) -> HandlerFuture {
        let spec = serde_json::from_value::<ProcessSpec>(job.payload.clone());
        let parser = self.parser.clone();
        Box::pin(async move {
            match spec {
                Ok(spec) => run_process(spec, parser, ctx).await,
                Err(e) => Err(JobError::Failed(format!("Invalid process payload: {}", e))),
            }
        })
    }
}

async fn run_process(
    spec: ProcessSpec,
    parser: Arc<dyn OutputParser>,
    ctx: JobContext,
) -> HandlerResult {
    tracing::info!("Job {} starting {} {:?}", ctx.job_id(), spec.program, spec.args);

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| JobError::Failed(format!("Failed to start {}: {}", spec.program, e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| JobError::Failed("stdout was not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| JobError::Failed("stderr was not captured".into()))?;
    let stderr_task = tokio::spawn(last_line(BufReader::new(stderr)));

    let mut stdout = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut output = Vec::new();

    loop {
        buf.clear();
        tokio::select! {
            read = stdout.read_until(b'\n', &mut buf) => match read {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    match parser.parse(line.trim_end_matches(['\n', '\r'])) {
                        ParsedLine::Progress(value) => ctx.progress(value).await,
                        ParsedLine::Output(text) => output.push(text),
                        ParsedLine::Ignore => {}
                    }
                }
                Err(e) => return Err(JobError::Failed(format!("Failed to read output: {}", e))),
            },
            _ = ctx.cancelled() => return Err(kill(&mut child, &spec.program, &ctx).await),
        }
    }

    // The program may close stdout and keep running.
    let status = tokio::select! {
        status = child.wait() => status
            .map_err(|e| JobError::Failed(format!("Failed to wait for {}: {}", spec.program, e)))?,
        _ = ctx.cancelled() => return Err(kill(&mut child, &spec.program, &ctx).await),
    };
    let stderr = stderr_task.await.unwrap_or_default();

    if !status.success() {
        let detail = stderr.as_deref().unwrap_or("no stderr output");
        return Err(JobError::Failed(format!(
            "{} exited with {}: {}",
            spec.program, status, detail
        )));
    }

    Ok(JobResult::with_output(
        format!("{} exited with {}", spec.program, status),
        serde_json::json!(output),
    ))
}

async fn kill(child: &mut Child, program: &str, ctx: &JobContext) -> JobError {
    tracing::info!("Killing {} for job {}", program, ctx.job_id());
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill {} for job {}: {}", program, ctx.job_id(), e);
    }
    JobError::Killed
}

/// Last non-empty line of a stream, truncated to [`STDERR_TAIL_BYTES`].
async fn last_line<R: AsyncBufRead + Unpin>(mut reader: R) -> Option<String> {
    let mut buf = Vec::new();
    let mut last = None;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => return last,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if !line.is_empty() {
                    last = Some(truncate(line, STDERR_TAIL_BYTES).to_string());
                }
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_tokens_become_progress() {
        let parser = PercentParser;
        assert_eq!(parser.parse("downloading 42%"), ParsedLine::Progress(42));
        assert_eq!(parser.parse("  7.6% done"), ParsedLine::Progress(8));
        assert_eq!(parser.parse("100%"), ParsedLine::Progress(100));
    }

    #[test]
    fn other_lines_are_output_or_ignored() {
        let parser = PercentParser;
        assert_eq!(parser.parse("hello"), ParsedLine::Output("hello".into()));
        assert_eq!(parser.parse("250% more"), ParsedLine::Output("250% more".into()));
        assert_eq!(parser.parse("   "), ParsedLine::Ignore);
    }

    #[tokio::test]
    async fn last_line_skips_blanks_and_truncates() {
        let text = format!("first\n{}\n\n", "x".repeat(STDERR_TAIL_BYTES + 10));
        let last = last_line(text.as_bytes()).await;
        assert_eq!(last, Some("x".repeat(STDERR_TAIL_BYTES)));
        assert_eq!(last_line(&b""[..]).await, None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("café", 4), "caf");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn args_default_to_empty() {
        let spec: ProcessSpec = serde_json::from_value(serde_json::json!({"program": "ls"})).unwrap();
        assert_eq!(spec.program, "ls");
        assert!(spec.args.is_empty());
    }
}
