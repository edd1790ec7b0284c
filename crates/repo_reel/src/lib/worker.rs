use std::{
    any::Any,
    fs::{read_dir, remove_dir_all},
    panic::AssertUnwindSafe,
    path::Path,
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures::FutureExt;
use reel_datastore::{Job, JobStore, Stage};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::{
    assembly::VideoEncoder,
    error::{PipelineError, ValidationError},
    github::{RepoUrl, RepositoryIngestor},
    narration::SpeechBackend,
    ReelProcessor,
};

/// What the HTTP layer needs from whoever runs jobs
pub trait JobService: Send + Sync + 'static {
    /// Validates the URL and queues a job for it
    fn submit(&self, repository_url: &str) -> Result<Job, ValidationError>;

    fn poll(&self, session_id: &str) -> Option<Job>;

    /// Flags the job for cancellation. Returns `None` for unknown sessions.
    fn cancel(&self, session_id: &str) -> Option<Job>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub jobs_removed: usize,
    pub orphans_removed: usize,
}

/// Background job pool: every submitted job gets its own task, at most
/// `max_jobs` of them run the pipeline at once.
pub struct JobRunner<S, I, B, E>
where
    S: JobStore + Send + Sync + 'static,
    I: RepositoryIngestor + Send + Sync + 'static,
    B: SpeechBackend + 'static,
    E: VideoEncoder + 'static,
{
    processor: Arc<ReelProcessor<S, I, B, E>>,
    permits: Arc<Semaphore>,
    retention: Duration,
    shutdown: CancellationToken,
}

impl<S, I, B, E> JobRunner<S, I, B, E>
where
    S: JobStore + Send + Sync + 'static,
    I: RepositoryIngestor + Send + Sync + 'static,
    B: SpeechBackend + 'static,
    E: VideoEncoder + 'static,
{
    pub fn new(processor: ReelProcessor<S, I, B, E>, max_jobs: usize) -> Self {
        Self {
            processor: Arc::new(processor),
            permits: Arc::new(Semaphore::new(max_jobs.max(1))),
            retention: Duration::from_secs(3600),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Jobs still waiting for a worker are cancelled once `token` fires
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn processor(&self) -> &ReelProcessor<S, I, B, E> {
        &self.processor
    }

    fn spawn(&self, session_id: String) {
        let processor = Arc::clone(&self.processor);
        let permits = Arc::clone(&self.permits);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => None,
                permit = permits.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                tracing::info!(%session_id, "Shutting down before the job started");
                processor
                    .store()
                    .update(&session_id, |job| job.advance(Stage::Cancelled));
                return;
            };
            // a returned error is already recorded in the store, a panic is not
            let outcome = AssertUnwindSafe(processor.process(&session_id))
                .catch_unwind()
                .await;
            if let Err(panic) = outcome {
                let error = PipelineError::Panicked(panic_message(panic.as_ref()));
                tracing::error!(%session_id, error = ?error, "Job panicked");
                processor
                    .store()
                    .update(&session_id, |job| job.fail(error.failure()));
            }
        });
    }

    /// Drops terminal jobs older than the retention window together with
    /// their directories, then any directory under the workdir that no job
    /// owns and that has not been touched within the window.
    #[tracing::instrument(skip(self))]
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let store = self.processor.store();
        let workdir = self.processor.workdir();

        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::hours(1));
        for job in store.expired(cutoff) {
            let dir = workdir.join(&job.session_id);
            if dir.exists() {
                if let Err(e) = remove_dir_all(&dir) {
                    tracing::warn!(error = ?e, path = ?dir, "Failed to remove job directory");
                    continue;
                }
            }
            store.remove(&job.session_id);
            report.jobs_removed += 1;
        }

        match read_dir(workdir) {
            Ok(entries) => {
                let limit = SystemTime::now()
                    .checked_sub(self.retention)
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !path.is_dir() || is_owned(store, &path) {
                        continue;
                    }
                    let stale = entry
                        .metadata()
                        .and_then(|m| m.modified())
                        .is_ok_and(|modified| modified < limit);
                    if stale {
                        match remove_dir_all(&path) {
                            Ok(()) => report.orphans_removed += 1,
                            Err(e) => {
                                tracing::warn!(error = ?e, path = ?path, "Failed to remove orphan directory")
                            }
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(error = ?e, path = ?workdir, "Failed to list workdir"),
        }

        tracing::info!(
            jobs_removed = report.jobs_removed,
            orphans_removed = report.orphans_removed,
            "Retention sweep done"
        );
        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn is_owned<S: JobStore>(store: &S, dir: &Path) -> bool {
    dir.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| store.get(name).is_some())
}

impl<S, I, B, E> JobService for JobRunner<S, I, B, E>
where
    S: JobStore + Send + Sync + 'static,
    I: RepositoryIngestor + Send + Sync + 'static,
    B: SpeechBackend + 'static,
    E: VideoEncoder + 'static,
{
    fn submit(&self, repository_url: &str) -> Result<Job, ValidationError> {
        let url = RepoUrl::parse(repository_url)
            .inspect_err(|e| tracing::info!(error = %e, repository_url, "Rejected submission"))?;
        let job = self.processor.store().create(&url.canonical());
        tracing::info!(session_id = %job.session_id, repository_url = %job.repository_url, "Job queued");
        self.spawn(job.session_id.clone());
        Ok(job)
    }

    fn poll(&self, session_id: &str) -> Option<Job> {
        self.processor.store().get(session_id)
    }

    fn cancel(&self, session_id: &str) -> Option<Job> {
        self.processor.store().update(session_id, |job| {
            if !job.is_terminal() {
                job.cancel_requested = true;
            }
        })
    }
}
