//! Wire-shape request bodies for the job submission surface (§6). These
//! wrap `domain::request::JobRequest` rather than re-deriving its fields,
//! so option-handling lives in exactly one place.

use serde::{Deserialize, Serialize};

use crate::domain::request::JobRequest;

/// `POST /jobs` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    #[serde(flatten)]
    pub request: JobRequest,
}

/// Query parameters accepted by `GET /jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
}
