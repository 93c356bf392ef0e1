//! Read-only list model over a registry snapshot.

use job_core::{JobId, JobRow};

/// Rows of a job list, in display order.
///
/// Built from a manager snapshot; the model never changes the jobs it shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobListModel {
    rows: Vec<JobRow>,
}

impl JobListModel {
    pub fn from_rows(rows: Vec<JobRow>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a row index to a job and its state.
    pub fn get(&self, index: usize) -> Option<&JobRow> {
        self.rows.get(index)
    }

    /// Index of the row showing `job_id`.
    pub fn row_for(&self, job_id: JobId) -> Option<usize> {
        self.rows.iter().position(|row| row.job_id == job_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobRow> {
        self.rows.iter()
    }
}
