//! Worker Pool (C7 admission): a global concurrency cap *J* over an OS
//! thread pool. Jobs beyond the cap stay `pending`; a permit is acquired
//! before a job transitions to `running` (§5).

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Semaphore;

use crate::cancellation::CancellationToken;
use crate::domain::reference::ReferenceData;
use crate::domain::request::JobRequest;
use crate::error::SimResult;
use crate::job::{JobId, JobState};
use crate::resource::ResourceLimits;
use crate::store::JobStore;

use super::job_runner;

/// Admits jobs onto a capped pool and tracks live cancellation tokens so a
/// `cancel` call reaches a job that is actually executing in this process.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    concurrency_cap: usize,
    reference: Arc<ReferenceData>,
    store: Arc<JobStore>,
    output_dir: PathBuf,
    limits: ResourceLimits,
    tokens: DashMap<JobId, CancellationToken>,
}

impl WorkerPool {
    pub fn new(
        concurrency_cap: usize,
        reference: Arc<ReferenceData>,
        store: Arc<JobStore>,
        output_dir: PathBuf,
        limits: ResourceLimits,
    ) -> Self {
        let concurrency_cap = concurrency_cap.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_cap)),
            concurrency_cap,
            reference,
            store,
            output_dir,
            limits,
            tokens: DashMap::new(),
        }
    }

    /// Validate and persist a new job as `pending`, then admit it onto the
    /// pool. Returns immediately; execution happens on a spawned task.
    pub fn submit(&self, request: JobRequest) -> SimResult<JobId> {
        request.validate()?;

        let id = JobId::new();
        self.store.create(JobState::new(id))?;

        let token = CancellationToken::new();
        self.tokens.insert(id, token.clone());

        let semaphore = self.semaphore.clone();
        let reference = self.reference.clone();
        let store = self.store.clone();
        let output_dir = self.output_dir.clone();
        let limits = self.limits;

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            job_runner::run(id, request, reference, store, output_dir, limits, token).await;
        });

        Ok(id)
    }

    /// Request cancellation. Idempotent: a job already terminal, or one
    /// this process never admitted (e.g. after a restart), is a no-op —
    /// the store-level state remains authoritative either way.
    pub fn cancel(&self, id: JobId) {
        if let Some(token) = self.tokens.get(&id) {
            token.cancel();
        }
    }

    pub fn get_state(&self, id: JobId) -> SimResult<JobState> {
        self.store.get(id)
    }

    pub fn list_states(&self) -> SimResult<Vec<JobState>> {
        self.store.list()
    }

    /// Jobs currently holding a concurrency permit. Cheaper than scanning
    /// the store for non-terminal states on every health check.
    pub fn active_job_count(&self) -> usize {
        self.concurrency_cap
            .saturating_sub(self.semaphore.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::{Intensity, OutputOptions, Tempo};
    use crate::domain::types::FrontConfig;
    use std::collections::HashMap;

    fn sample_request() -> JobRequest {
        let mut warfare_types = HashMap::new();
        warfare_types.insert("conventional".to_string(), 1.0);
        let mut nationality_mix = HashMap::new();
        nationality_mix.insert("UKR".to_string(), 1.0);

        JobRequest {
            total_patients: 5,
            days_of_fighting: 1,
            base_date: chrono::Utc::now(),
            warfare_types,
            intensity: Intensity::Medium,
            tempo: Tempo::Sustained,
            environmental_conditions: vec![],
            special_events: vec![],
            fronts: vec![FrontConfig {
                id: "north".to_string(),
                casualty_share: 1.0,
                nationality_mix,
                facility_chain_override: None,
            }],
            injury_mix: HashMap::new(),
            output: OutputOptions {
                formats: vec![crate::domain::request::OutputFormat::Structured],
                compression: false,
                encryption_key: None,
            },
            chunk_size: None,
            seed: 42,
            extensions: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_submit_creates_a_pending_job_then_it_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let reference = Arc::new(ReferenceData::load().unwrap());
        let store = Arc::new(JobStore::open_temporary().unwrap());
        let pool = WorkerPool::new(
            2,
            reference,
            store,
            dir.path().to_path_buf(),
            ResourceLimits::default(),
        );

        let id = pool.submit(sample_request()).unwrap();

        let mut state = pool.get_state(id).unwrap();
        for _ in 0..200 {
            if state.status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            state = pool.get_state(id).unwrap();
        }

        assert_eq!(state.status, crate::job::JobStatus::Completed);
        assert_eq!(
            state.summary.kia_count + state.summary.rtd_count + state.summary.remains_count,
            5
        );
    }

    #[test]
    fn test_cancel_unknown_job_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let reference = Arc::new(ReferenceData::load().unwrap());
        let store = Arc::new(JobStore::open_temporary().unwrap());
        let pool = WorkerPool::new(
            2,
            reference,
            store,
            dir.path().to_path_buf(),
            ResourceLimits::default(),
        );
        pool.cancel(JobId::new());
    }
}
