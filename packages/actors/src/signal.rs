//! Per-job signal bus and cooperative cancellation.

use job_core::{JobError, JobEvent, JobId, JobState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Handle given to a running job body.
///
/// Signals sent through the context travel over the manager's bounded
/// channel in emission order. Long-running bodies must call
/// [`JobContext::check_cancelled`] at every iteration boundary, or race
/// their work against [`JobContext::cancelled`]. A body that does neither
/// cannot be stopped.
#[derive(Debug, Clone)]
pub struct JobContext {
    job_id: JobId,
    signals: mpsc::Sender<JobEvent>,
    cancel: CancellationToken,
}

impl JobContext {
    pub fn new(job_id: JobId, signals: mpsc::Sender<JobEvent>, cancel: CancellationToken) -> Self {
        Self {
            job_id,
            signals,
            cancel,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Report progress as a percentage. Values above 100 are clamped.
    pub async fn progress(&self, value: u8) {
        let value = value.min(JobState::MAX_PROGRESS);
        self.emit(JobEvent::progress(self.job_id, value)).await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Return `Err(JobError::Killed)` once a kill has been requested.
    pub fn check_cancelled(&self) -> Result<(), JobError> {
        if self.is_cancelled() {
            Err(JobError::Killed)
        } else {
            Ok(())
        }
    }

    /// Resolves once a kill has been requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) async fn emit(&self, event: JobEvent) {
        if self.signals.send(event).await.is_err() {
            tracing::debug!("Manager gone, dropping signal for job {}", self.job_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_wakes_on_kill() {
        let (tx, _rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let ctx = JobContext::new(JobId::new(), tx, token.clone());

        let waiter = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.cancelled().await }
        });
        assert!(!ctx.is_cancelled());
        token.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("cancelled() should resolve")
            .expect("waiter task");
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn progress_is_clamped_and_sent_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let id = JobId::new();
        let ctx = JobContext::new(id, tx, CancellationToken::new());

        ctx.progress(10).await;
        ctx.progress(180).await;

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let JobEvent::Progress {
                job_id, progress, ..
            } = event
            {
                assert_eq!(job_id, id);
                seen.push(progress);
            }
        }
        assert_eq!(seen, vec![10, 100]);
    }

    #[test]
    fn check_cancelled_reports_kill() {
        let (tx, _rx) = mpsc::channel(1);
        let ctx = JobContext::new(JobId::new(), tx, CancellationToken::new());
        assert_eq!(ctx.check_cancelled(), Ok(()));
        ctx.cancellation_token().cancel();
        assert_eq!(ctx.check_cancelled(), Err(JobError::Killed));
    }
}
