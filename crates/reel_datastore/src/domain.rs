use std::{fmt, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Pipeline stage a job is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    Ingesting,
    Scripting,
    Rendering,
    Narrating,
    Assembling,
    Complete,
    Failed,
    Cancelled,
}

impl Stage {
    /// Progress percentage reported while a job sits in this stage
    pub fn progress(self) -> u8 {
        match self {
            Stage::Queued => 0,
            Stage::Ingesting => 10,
            Stage::Scripting => 30,
            Stage::Rendering => 50,
            Stage::Narrating => 70,
            Stage::Assembling => 90,
            Stage::Complete => 100,
            // terminal failures keep whatever progress was reached
            Stage::Failed | Stage::Cancelled => 0,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed | Stage::Cancelled)
    }

    pub fn message(self) -> &'static str {
        match self {
            Stage::Queued => "Waiting for a free worker...",
            Stage::Ingesting => "Downloading and analyzing repository content...",
            Stage::Scripting => "Generating video script from repository analysis...",
            Stage::Rendering => "Generating video content and visuals...",
            Stage::Narrating => "Creating audio narration from script...",
            Stage::Assembling => "Merging audio and video components...",
            Stage::Complete => "Video generation completed successfully!",
            Stage::Failed => "Video generation failed",
            Stage::Cancelled => "Video generation was cancelled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Queued => "queued",
            Stage::Ingesting => "ingesting",
            Stage::Scripting => "scripting",
            Stage::Rendering => "rendering",
            Stage::Narrating => "narrating",
            Stage::Assembling => "assembling",
            Stage::Complete => "complete",
            Stage::Failed => "failed",
            Stage::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Ingest,
    Generation,
    Assembly,
    Internal,
}

/// Caller-facing description of a failed job.
///
/// `message` is already sanitized: it never carries provider responses,
/// credentials or error chains. `retryable` tells the caller whether
/// resubmitting later may succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub session_id: String,
    pub repository_url: String,
    pub stage: Stage,
    pub progress: u8,
    pub message: String,
    pub failure: Option<JobFailure>,
    pub output_path: Option<PathBuf>,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(session_id: impl Into<String>, repository_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Job {
            session_id: session_id.into(),
            repository_url: repository_url.into(),
            stage: Stage::Queued,
            progress: Stage::Queued.progress(),
            message: Stage::Queued.message().to_string(),
            failure: None,
            output_path: None,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the job into `stage`, refreshing progress and message.
    ///
    /// Terminal jobs are left untouched so a late transition cannot resurrect
    /// a failed or cancelled job.
    pub fn advance(&mut self, stage: Stage) {
        if self.stage.is_terminal() {
            return;
        }
        if !matches!(stage, Stage::Failed | Stage::Cancelled) {
            self.progress = stage.progress();
        }
        self.stage = stage;
        self.message = stage.message().to_string();
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self, output_path: PathBuf) {
        if self.stage.is_terminal() {
            return;
        }
        self.advance(Stage::Complete);
        self.output_path = Some(output_path);
    }

    pub fn fail(&mut self, failure: JobFailure) {
        if self.stage.is_terminal() {
            return;
        }
        self.message = format!("Error: {}", failure.message);
        self.stage = Stage::Failed;
        self.failure = Some(failure);
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_updates_progress() {
        let mut job = Job::new("abc", "https://github.com/octocat/Hello-World");
        job.advance(Stage::Rendering);
        assert_eq!(job.stage, Stage::Rendering);
        assert_eq!(job.progress, 50);
    }

    #[test]
    fn test_terminal_job_ignores_transitions() {
        let mut job = Job::new("abc", "https://github.com/octocat/Hello-World");
        job.advance(Stage::Ingesting);
        job.fail(JobFailure {
            kind: FailureKind::Ingest,
            message: "repository is too large".into(),
            retryable: false,
        });
        job.advance(Stage::Rendering);
        job.complete("/tmp/out.mp4".into());

        assert_eq!(job.stage, Stage::Failed);
        assert_eq!(job.progress, 10, "failure keeps the progress reached");
        assert!(job.output_path.is_none());
    }

    #[test]
    fn test_job_serializes_stage_in_snake_case() {
        let job = Job::new("abc", "https://github.com/octocat/Hello-World");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["stage"], "queued");
        assert_eq!(json["progress"], 0);
    }
}
