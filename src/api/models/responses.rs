//! Wire-shape response bodies (§6).

use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobState, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStateResponse {
    #[serde(flatten)]
    pub state: JobState,
}

impl From<JobState> for JobStateResponse {
    fn from(state: JobState) -> Self {
        Self { state }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelJobResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_jobs: usize,
    pub service: String,
    pub version: String,
}
