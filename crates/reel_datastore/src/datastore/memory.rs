use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::{datastore::JobStore, Job};

/// Process-wide job table guarded by a single `RwLock`
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, repository_url: &str) -> Job {
        let session_id = uuid::Uuid::new_v4().to_string();
        let job = Job::new(&session_id, repository_url);

        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id, job.clone());

        tracing::debug!(session_id = %job.session_id, "Registered job");
        job
    }

    fn get(&self, session_id: &str) -> Option<Job> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    fn update<F>(&self, session_id: &str, f: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let job = jobs.get_mut(session_id)?;
        f(job);
        Some(job.clone())
    }

    fn remove(&self, session_id: &str) -> Option<Job> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
    }

    fn expired(&self, cutoff: DateTime<Utc>) -> Vec<Job> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|job| job.is_terminal() && job.updated_at < cutoff)
            .sorted_by_key(|job| job.updated_at)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{FailureKind, JobFailure, Stage};

    const URL: &str = "https://github.com/octocat/Hello-World";

    #[test]
    fn test_create_assigns_unique_session_ids() {
        let store = InMemoryJobStore::new();
        let first = store.create(URL);
        let second = store.create(URL);

        assert_ne!(first.session_id, second.session_id);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&first.session_id).unwrap().stage, Stage::Queued);
    }

    #[test]
    fn test_update_unknown_session_returns_none() {
        let store = InMemoryJobStore::new();
        assert!(store.update("missing", |job| job.advance(Stage::Rendering)).is_none());
    }

    #[test]
    fn test_update_is_isolated_per_session() {
        let store = InMemoryJobStore::new();
        let first = store.create(URL);
        let second = store.create(URL);

        store.update(&first.session_id, |job| job.advance(Stage::Assembling));

        assert_eq!(store.get(&first.session_id).unwrap().stage, Stage::Assembling);
        assert_eq!(store.get(&second.session_id).unwrap().stage, Stage::Queued);
    }

    #[test]
    fn test_expired_only_returns_old_terminal_jobs() {
        let store = InMemoryJobStore::new();
        let running = store.create(URL);
        let failed = store.create(URL);
        let fresh = store.create(URL);

        let old = Utc::now() - Duration::hours(2);
        store.update(&running.session_id, |job| {
            job.advance(Stage::Rendering);
            job.updated_at = old;
        });
        store.update(&failed.session_id, |job| {
            job.fail(JobFailure {
                kind: FailureKind::Assembly,
                message: "video encoding failed".into(),
                retryable: true,
            });
            job.updated_at = old;
        });
        store.update(&fresh.session_id, |job| job.complete("/tmp/x.mp4".into()));

        let expired = store.expired(Utc::now() - Duration::hours(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].session_id, failed.session_id);
    }
}
