use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::Job;

pub mod memory;

pub trait JobStore {
    /// Registers a new queued job under a fresh session id
    fn create(&self, repository_url: &str) -> Job;

    fn get(&self, session_id: &str) -> Option<Job>;

    /// Applies `f` to the stored job under the write lock and returns the
    /// updated snapshot, or `None` when the session is unknown.
    fn update<F>(&self, session_id: &str, f: F) -> Option<Job>
    where
        F: FnOnce(&mut Job);

    fn remove(&self, session_id: &str) -> Option<Job>;

    /// Terminal jobs last touched before `cutoff`, oldest first
    fn expired(&self, cutoff: DateTime<Utc>) -> Vec<Job>;
}

impl<T: JobStore + Send + Sync> JobStore for &T {
    fn create(&self, repository_url: &str) -> Job {
        (**self).create(repository_url)
    }

    fn get(&self, session_id: &str) -> Option<Job> {
        (**self).get(session_id)
    }

    fn update<F>(&self, session_id: &str, f: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        (**self).update(session_id, f)
    }

    fn remove(&self, session_id: &str) -> Option<Job> {
        (**self).remove(session_id)
    }

    fn expired(&self, cutoff: DateTime<Utc>) -> Vec<Job> {
        (**self).expired(cutoff)
    }
}

impl<T: JobStore + Send + Sync> JobStore for Arc<T> {
    fn create(&self, repository_url: &str) -> Job {
        (**self).create(repository_url)
    }

    fn get(&self, session_id: &str) -> Option<Job> {
        (**self).get(session_id)
    }

    fn update<F>(&self, session_id: &str, f: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        (**self).update(session_id, f)
    }

    fn remove(&self, session_id: &str) -> Option<Job> {
        (**self).remove(session_id)
    }

    fn expired(&self, cutoff: DateTime<Utc>) -> Vec<Job> {
        (**self).expired(cutoff)
    }
}
