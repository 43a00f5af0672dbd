//! Persistent job-state store (§6): an opaque Create/Update/GetById
//! repository keyed by job id, backed by `sled` with a warm in-process cache
//! in front of it so a poll-heavy client (status-polling the REST surface)
//! never touches disk on a hit.

use std::path::Path;
use std::sync::Arc;

use crate::cache::WarmCache;
use crate::error::{SimError, SimResult};
use crate::job::{JobId, JobState};

const KEY_PREFIX: &str = "job:";

fn key_for(id: JobId) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Sled-backed job store with a warm cache in front of it.
pub struct JobStore {
    db: sled::Db,
    cache: WarmCache<JobState>,
}

impl JobStore {
    pub fn open<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let db = sled::open(path).map_err(|e| SimError::StatePersistence(e.to_string()))?;
        Ok(Self {
            db,
            cache: WarmCache::new(),
        })
    }

    /// Open a transient, in-memory-only store (used by tests and by the
    /// runner's dry-run mode).
    pub fn open_temporary() -> SimResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| SimError::StatePersistence(e.to_string()))?;
        Ok(Self {
            db,
            cache: WarmCache::new(),
        })
    }

    /// Create a brand-new job record. Errors if the id already exists.
    pub fn create(&self, state: JobState) -> SimResult<()> {
        let key = key_for(state.id);
        if self.db.contains_key(key.as_bytes()).map_err(persist_err)? {
            return Err(SimError::StatePersistence(format!(
                "job {} already exists",
                state.id
            )));
        }
        self.write_through(&key, &state)
    }

    /// Overwrite an existing job record with its latest snapshot.
    pub fn update(&self, state: &JobState) -> SimResult<()> {
        let key = key_for(state.id);
        self.write_through(&key, state)
    }

    /// Fetch a job by id, preferring the warm cache over the sled read.
    pub fn get(&self, id: JobId) -> SimResult<JobState> {
        let key = key_for(id);
        if let Some(hit) = self.cache.get_hot(&key) {
            return Ok((*hit).clone());
        }

        let raw = self
            .db
            .get(key.as_bytes())
            .map_err(persist_err)?
            .ok_or_else(|| SimError::NotFound(id.to_string()))?;
        let state: JobState = serde_json::from_slice(&raw)
            .map_err(|e| SimError::StatePersistence(format!("corrupt job record: {e}")))?;
        self.cache.insert_hot(key, Arc::new(state.clone()));
        Ok(state)
    }

    /// List every job currently persisted, newest first by creation time.
    pub fn list(&self) -> SimResult<Vec<JobState>> {
        let mut jobs = Vec::new();
        for entry in self.db.scan_prefix(KEY_PREFIX.as_bytes()) {
            let (_, raw) = entry.map_err(persist_err)?;
            let state: JobState = serde_json::from_slice(&raw)
                .map_err(|e| SimError::StatePersistence(format!("corrupt job record: {e}")))?;
            jobs.push(state);
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    /// Remove a job record, e.g. after its retention window elapses.
    pub fn delete(&self, id: JobId) -> SimResult<()> {
        let key = key_for(id);
        self.db.remove(key.as_bytes()).map_err(persist_err)?;
        self.cache.remove_hot(&key);
        Ok(())
    }

    fn write_through(&self, key: &str, state: &JobState) -> SimResult<()> {
        let raw = serde_json::to_vec(state)
            .map_err(|e| SimError::StatePersistence(format!("failed to serialize job: {e}")))?;
        self.db
            .insert(key.as_bytes(), raw)
            .map_err(persist_err)?;
        self.db.flush().map_err(persist_err)?;
        self.cache.insert_hot(key.to_string(), Arc::new(state.clone()));
        Ok(())
    }
}

fn persist_err(e: sled::Error) -> SimError {
    SimError::StatePersistence(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobId, JobState};

    #[test]
    fn test_create_then_get_round_trips() {
        let store = JobStore::open_temporary().unwrap();
        let id = JobId::new();
        let state = JobState::new(id);
        store.create(state).unwrap();

        let fetched = store.get(id).unwrap();
        assert_eq!(fetched.id, id);
    }

    #[test]
    fn test_create_twice_fails() {
        let store = JobStore::open_temporary().unwrap();
        let id = JobId::new();
        store.create(JobState::new(id)).unwrap();
        let err = store.create(JobState::new(id)).unwrap_err();
        assert!(matches!(err, SimError::StatePersistence(_)));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = JobStore::open_temporary().unwrap();
        let err = store.get(JobId::new()).unwrap_err();
        assert!(matches!(err, SimError::NotFound(_)));
    }

    #[test]
    fn test_update_is_visible_after_cache_hit() {
        let store = JobStore::open_temporary().unwrap();
        let id = JobId::new();
        let mut state = JobState::new(id);
        store.create(state.clone()).unwrap();

        state.start().unwrap();
        store.update(&state).unwrap();

        let fetched = store.get(id).unwrap();
        assert_eq!(fetched.status, crate::job::JobStatus::Running);
    }

    #[test]
    fn test_list_returns_all_jobs() {
        let store = JobStore::open_temporary().unwrap();
        store.create(JobState::new(JobId::new())).unwrap();
        store.create(JobState::new(JobId::new())).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_removes_the_job() {
        let store = JobStore::open_temporary().unwrap();
        let id = JobId::new();
        store.create(JobState::new(id)).unwrap();
        store.delete(id).unwrap();
        assert!(matches!(store.get(id).unwrap_err(), SimError::NotFound(_)));
    }
}
