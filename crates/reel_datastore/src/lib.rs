//! # DataStore Module
//!
//! This module keeps track of repository-to-video jobs while they move through
//! the pipeline.
//!
//! Jobs live in memory only and are keyed by their session id. Status polling
//! takes a read lock, stage transitions take the write lock.

mod datastore;
mod domain;

pub use datastore::memory::InMemoryJobStore;
pub use datastore::JobStore;
pub use domain::{FailureKind, Job, JobFailure, Stage};
