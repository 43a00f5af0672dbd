//! Job identity and lifecycle state machine (C7 data model)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{SimError, SimResult};

/// Unique identifier for a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(#[serde(with = "uuid::serde::compact")] pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse_str(s: &str) -> SimResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SimError::Validation(format!("invalid job id: {}", e)))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Fine-grained progress detail emitted after each chunk boundary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressDetails {
    pub processed: u64,
    pub total: u64,
    pub phase: String,
    pub phase_description: String,
}

/// Per-job summary counters, finalized on terminal transition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSummary {
    pub kia_count: u64,
    pub rtd_count: u64,
    pub remains_count: u64,
    pub nationality_histogram: HashMap<String, u64>,
    pub injury_histogram: HashMap<String, u64>,
}

/// Output file descriptor recorded in the persistent job store.
/// `output_files` and the legacy `result_files` alias both point at the same
/// list: readers may consult either, writers populate both (see §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFile {
    pub format: String,
    pub path: String,
    pub bytes_written: u64,
    pub compressed: bool,
    pub encrypted: bool,
}

/// A generation job's full, observable state. Mutated only by the Job
/// Runner (C7); external observers receive a cloned snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    pub id: JobId,
    pub status: JobStatus,
    /// Clamped to [0.0, 1.0]; reaches 1.0 exactly when status becomes Completed
    pub progress: f64,
    pub progress_details: ProgressDetails,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub output_files: Vec<OutputFile>,
    #[serde(alias = "result_files")]
    pub result_files: Vec<OutputFile>,
    pub summary: JobSummary,
}

impl JobState {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0.0,
            progress_details: ProgressDetails::default(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            output_files: Vec::new(),
            result_files: Vec::new(),
            summary: JobSummary::default(),
        }
    }

    /// `pending -> running`, admitted by the worker pool
    pub fn start(&mut self) -> SimResult<()> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Running;
                self.started_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(transition_error(self.status, JobStatus::Running)),
        }
    }

    /// Record progress for the chunk just completed. Progress is clamped at
    /// 1.0 so a schedule that rounds up by one patient never reports > 100%.
    pub fn record_progress(&mut self, details: ProgressDetails) {
        let fraction = if details.total == 0 {
            0.0
        } else {
            (details.processed as f64 / details.total as f64).min(1.0)
        };
        self.progress = self.progress.max(fraction);
        self.progress_details = details;
    }

    /// `running -> completed`
    pub fn complete(&mut self, summary: JobSummary, outputs: Vec<OutputFile>) -> SimResult<()> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Completed;
                self.progress = 1.0;
                self.completed_at = Some(Utc::now());
                self.summary = summary;
                self.output_files = outputs.clone();
                self.result_files = outputs;
                Ok(())
            }
            _ => Err(transition_error(self.status, JobStatus::Completed)),
        }
    }

    /// `running -> failed`
    pub fn fail(&mut self, error: &SimError) -> SimResult<()> {
        match self.status {
            JobStatus::Running | JobStatus::Pending => {
                self.status = JobStatus::Failed;
                self.error_message = Some(error.sanitized_message());
                self.completed_at = Some(Utc::now());
                self.output_files.clear();
                self.result_files.clear();
                Ok(())
            }
            _ => Err(transition_error(self.status, JobStatus::Failed)),
        }
    }

    /// `running -> cancelled`. Idempotent on terminal states: cancelling an
    /// already-terminal job is a success no-op, never an error.
    pub fn cancel(&mut self) -> SimResult<()> {
        match self.status {
            JobStatus::Pending | JobStatus::Running => {
                self.status = JobStatus::Cancelled;
                self.completed_at = Some(Utc::now());
                self.output_files.clear();
                self.result_files.clear();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn transition_error(from: JobStatus, to: JobStatus) -> SimError {
    SimError::InvalidStateTransition {
        from: format!("{:?}", from),
        to: format!("{:?}", to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_happy_path() {
        let mut job = JobState::new(JobId::new());
        assert_eq!(job.status, JobStatus::Pending);
        job.start().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        job.record_progress(ProgressDetails {
            processed: 50,
            total: 100,
            phase: "materialize".into(),
            phase_description: "chunk 1/2".into(),
        });
        assert!((job.progress - 0.5).abs() < f64::EPSILON);
        job.complete(JobSummary::default(), vec![]).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!((job.progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cancel_is_idempotent_on_terminal() {
        let mut job = JobState::new(JobId::new());
        job.start().unwrap();
        job.complete(JobSummary::default(), vec![]).unwrap();
        assert!(job.cancel().is_ok());
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut job = JobState::new(JobId::new());
        job.start().unwrap();
        job.record_progress(ProgressDetails {
            processed: 80,
            total: 100,
            phase: "materialize".into(),
            phase_description: "".into(),
        });
        job.record_progress(ProgressDetails {
            processed: 40,
            total: 100,
            phase: "materialize".into(),
            phase_description: "".into(),
        });
        assert!((job.progress - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_output_files_alias_kept_in_sync() {
        let mut job = JobState::new(JobId::new());
        job.start().unwrap();
        let outputs = vec![OutputFile {
            format: "json".into(),
            path: "/tmp/out.json".into(),
            bytes_written: 10,
            compressed: false,
            encrypted: false,
        }];
        job.complete(JobSummary::default(), outputs).unwrap();
        assert_eq!(job.output_files.len(), job.result_files.len());
    }
}
