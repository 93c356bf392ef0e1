//! Job registry owned by a single manager.
//!
//! Two views over the same ids: `state` holds every job still on display
//! (in registration order) and `active` holds the kill tokens of jobs whose
//! body has not finished yet. Every active id is also in `state`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use job_core::{Job, JobId, JobOutcome, JobRow, JobState, JobStatus};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Everything the manager knows about one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub job_type: String,
    pub state: JobState,
    /// Result or error text, set at most once.
    pub outcome: Option<JobOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    fn new(job: &Job) -> Self {
        Self {
            job_type: job.job_type.clone(),
            state: JobState::default(),
            outcome: None,
            created_at: job.created_at,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    state: IndexMap<JobId, JobRecord>,
    active: HashMap<JobId, CancellationToken>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new job as waiting at zero progress.
    ///
    /// Returns false and changes nothing if the id is already known.
    pub fn register(&mut self, job: &Job, cancel: CancellationToken) -> bool {
        if self.state.contains_key(&job.id) || self.active.contains_key(&job.id) {
            return false;
        }
        self.state.insert(job.id, JobRecord::new(job));
        self.active.insert(job.id, cancel);
        true
    }

    /// Overwrite a job's status. Unknown ids are ignored.
    pub fn receive_status(&mut self, job_id: JobId, status: JobStatus) {
        match self.state.get_mut(&job_id) {
            Some(record) => {
                record.state.status = status;
                record.updated_at = Utc::now();
            }
            None => tracing::debug!("Status {} for unknown job {}", status, job_id),
        }
    }

    /// Overwrite a job's progress. Last write wins, even if it goes backwards.
    pub fn receive_progress(&mut self, job_id: JobId, progress: u8) {
        match self.state.get_mut(&job_id) {
            Some(record) => {
                record.state.progress = progress.min(JobState::MAX_PROGRESS);
                record.updated_at = Utc::now();
            }
            None => tracing::debug!("Progress {} for unknown job {}", progress, job_id),
        }
    }

    /// Store the job's outcome. Returns false if one was already stored.
    pub fn record_outcome(&mut self, job_id: JobId, outcome: JobOutcome) -> bool {
        match self.state.get_mut(&job_id) {
            Some(record) if record.outcome.is_none() => {
                record.outcome = Some(outcome);
                record.updated_at = Utc::now();
                true
            }
            Some(_) => {
                tracing::warn!("Ignoring second outcome for job {}", job_id);
                false
            }
            None => false,
        }
    }

    /// Cancel the token of an active job. Returns false for anything else.
    pub fn kill(&mut self, job_id: JobId) -> bool {
        match self.active.get(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Mark a job's body as finished. Its state entry stays until cleanup.
    pub fn done(&mut self, job_id: JobId) -> bool {
        self.active.remove(&job_id).is_some()
    }

    /// Remove terminal jobs from the state map and return how many went.
    ///
    /// A terminal job whose `Finished` signal has not arrived yet is still
    /// active and is kept until a later cleanup.
    pub fn cleanup(&mut self) -> usize {
        let before = self.state.len();
        let active = &self.active;
        self.state
            .retain(|id, record| !record.state.status.is_terminal() || active.contains_key(id));
        before - self.state.len()
    }

    pub fn get(&self, job_id: JobId) -> Option<&JobRecord> {
        self.state.get(&job_id)
    }

    pub fn is_active(&self, job_id: JobId) -> bool {
        self.active.contains_key(&job_id)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Count displayed jobs with the given status.
    pub fn count(&self, status: JobStatus) -> usize {
        self.state
            .values()
            .filter(|r| r.state.status == status)
            .count()
    }

    /// Display rows in registration order.
    pub fn rows(&self) -> Vec<JobRow> {
        self.state
            .iter()
            .map(|(id, record)| JobRow {
                job_id: *id,
                job_type: record.job_type.clone(),
                state: record.state,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use job_core::JobResult;
    use serde_json::json;

    fn registered(registry: &mut JobRegistry) -> (JobId, CancellationToken) {
        let job = Job::new("test", json!({}));
        let token = CancellationToken::new();
        assert!(registry.register(&job, token.clone()));
        (job.id, token)
    }

    fn finish(registry: &mut JobRegistry, id: JobId, status: JobStatus) {
        registry.receive_status(id, status);
        registry.done(id);
    }

    #[test]
    fn register_starts_waiting_and_active() {
        let mut registry = JobRegistry::new();
        let (id, _) = registered(&mut registry);
        let record = registry.get(id).unwrap();
        assert_eq!(record.state, JobState::default());
        assert!(registry.is_active(id));
    }

    #[test]
    fn reused_id_is_rejected() {
        let mut registry = JobRegistry::new();
        let job = Job::new("test", json!({}));
        let first = CancellationToken::new();
        assert!(registry.register(&job, first.clone()));
        registry.receive_status(job.id, JobStatus::Running);

        let second = CancellationToken::new();
        assert!(!registry.register(&job, second.clone()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(job.id).unwrap().state.status, JobStatus::Running);

        assert!(registry.kill(job.id));
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn updates_are_last_write_wins() {
        let mut registry = JobRegistry::new();
        let (id, _) = registered(&mut registry);
        registry.receive_progress(id, 60);
        registry.receive_progress(id, 30);
        registry.receive_status(id, JobStatus::Running);
        let state = registry.get(id).unwrap().state;
        assert_eq!(state, JobState::new(JobStatus::Running, 30));
    }

    #[test]
    fn kill_cancels_only_for_active_jobs() {
        let mut registry = JobRegistry::new();
        let (id, token) = registered(&mut registry);
        assert!(registry.kill(id));
        assert!(token.is_cancelled());

        let before = registry.rows();
        assert!(!registry.kill(JobId::new()));
        assert_eq!(registry.rows(), before);
    }

    #[test]
    fn kill_after_done_is_ignored() {
        let mut registry = JobRegistry::new();
        let (id, token) = registered(&mut registry);
        finish(&mut registry, id, JobStatus::Complete);
        assert!(!registry.kill(id));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn done_keeps_the_state_entry() {
        let mut registry = JobRegistry::new();
        let (id, _) = registered(&mut registry);
        finish(&mut registry, id, JobStatus::Complete);
        assert!(!registry.is_active(id));
        assert!(registry.get(id).is_some());
        assert!(!registry.done(id));
    }

    #[test]
    fn cleanup_removes_only_terminal_jobs() {
        let mut registry = JobRegistry::new();
        let (waiting, _) = registered(&mut registry);
        let (running, _) = registered(&mut registry);
        let (complete, _) = registered(&mut registry);
        let (failed, _) = registered(&mut registry);
        let (stopped, _) = registered(&mut registry);

        registry.receive_status(running, JobStatus::Running);
        finish(&mut registry, complete, JobStatus::Complete);
        finish(&mut registry, failed, JobStatus::Error);
        finish(&mut registry, stopped, JobStatus::Stopped);

        assert_eq!(registry.cleanup(), 3);
        let ids: Vec<JobId> = registry.rows().into_iter().map(|r| r.job_id).collect();
        assert_eq!(ids, vec![waiting, running]);
    }

    #[test]
    fn cleanup_is_idempotent() {
        let mut registry = JobRegistry::new();
        let (a, _) = registered(&mut registry);
        registered(&mut registry);
        finish(&mut registry, a, JobStatus::Complete);

        registry.cleanup();
        let once = registry.rows();
        assert_eq!(registry.cleanup(), 0);
        assert_eq!(registry.rows(), once);
    }

    #[test]
    fn cleanup_keeps_terminal_job_until_finished() {
        let mut registry = JobRegistry::new();
        let (id, _) = registered(&mut registry);
        registry.receive_status(id, JobStatus::Complete);
        assert_eq!(registry.cleanup(), 0);
        registry.done(id);
        assert_eq!(registry.cleanup(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn outcome_is_recorded_once() {
        let mut registry = JobRegistry::new();
        let (id, _) = registered(&mut registry);
        assert!(registry.record_outcome(id, Ok(JobResult::new("first"))));
        assert!(!registry.record_outcome(id, Err("second".into())));
        let outcome = registry.get(id).unwrap().outcome.clone();
        assert_eq!(outcome, Some(Ok(JobResult::new("first"))));
    }

    #[test]
    fn signals_for_unknown_jobs_are_ignored() {
        let mut registry = JobRegistry::new();
        let stranger = JobId::new();
        registry.receive_status(stranger, JobStatus::Running);
        registry.receive_progress(stranger, 10);
        assert!(!registry.record_outcome(stranger, Err("x".into())));
        assert!(registry.is_empty());
    }

    #[test]
    fn count_by_status() {
        let mut registry = JobRegistry::new();
        let (a, _) = registered(&mut registry);
        registered(&mut registry);
        registry.receive_status(a, JobStatus::Running);
        assert_eq!(registry.count(JobStatus::Running), 1);
        assert_eq!(registry.count(JobStatus::Waiting), 1);
        assert_eq!(registry.active_len(), 2);
        assert_eq!(registry.len(), 2);
    }
}
