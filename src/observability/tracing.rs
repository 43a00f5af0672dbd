#![allow(clippy::unwrap_used)] // Supporting infrastructure - unwrap() acceptable for now
//! Distributed tracing for the casualty-generation service (§6).

use crate::job::JobId;
use tracing::{instrument, span, Level, Span};

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name
    pub service_name: String,
    /// Enable distributed tracing
    pub distributed_tracing: bool,
    /// Sampling rate (0.0-1.0)
    pub sampling_rate: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "castra".to_string(),
            distributed_tracing: true,
            sampling_rate: 1.0,
        }
    }
}

/// Job tracer for distributed tracing across submission, chunked execution,
/// and output materialization.
pub struct JobTracer {
    config: TracingConfig,
}

impl JobTracer {
    pub fn new(config: TracingConfig) -> Self {
        Self { config }
    }

    /// Start a span for job submission and admission.
    #[instrument(skip(self))]
    pub fn start_job_submission_span(&self, job_id: JobId) -> Span {
        span!(
            Level::INFO,
            "job.submit",
            job.id = %job_id,
            job.service = %self.config.service_name
        )
    }

    /// Start a span for the full run of a job, pending through terminal.
    #[instrument(skip(self))]
    pub fn start_job_execution_span(&self, job_id: JobId) -> Span {
        span!(
            Level::INFO,
            "job.execute",
            job.id = %job_id,
            job.service = %self.config.service_name
        )
    }

    /// Start a span for a single schedule chunk's materialization.
    #[instrument(skip(self))]
    pub fn start_chunk_span(&self, job_id: JobId, chunk_index: usize, chunk_len: usize) -> Span {
        span!(
            Level::INFO,
            "job.chunk",
            job.id = %job_id,
            chunk.index = chunk_index,
            chunk.len = chunk_len,
            job.service = %self.config.service_name
        )
    }

    /// Start a span for a single patient's generation (demographics, injury,
    /// flow simulation).
    #[instrument(skip(self))]
    pub fn start_patient_generation_span(&self, job_id: JobId, patient_id: u64) -> Span {
        span!(
            Level::DEBUG,
            "job.patient",
            job.id = %job_id,
            patient.id = patient_id,
            job.service = %self.config.service_name
        )
    }

    /// Start a span for a job's state transition.
    #[instrument(skip(self))]
    pub fn start_state_transition_span(
        &self,
        job_id: JobId,
        from_state: &str,
        to_state: &str,
    ) -> Span {
        span!(
            Level::INFO,
            "job.state_transition",
            job.id = %job_id,
            state.from = from_state,
            state.to = to_state,
            job.service = %self.config.service_name
        )
    }
}

impl Default for JobTracer {
    fn default() -> Self {
        Self::new(TracingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracer_creation() {
        let tracer = JobTracer::default();
        let job_id = JobId::new();
        let _span = tracer.start_job_submission_span(job_id);
    }
}
