use reel_datastore::{FailureKind, JobFailure};

/// Bad input rejected before any pipeline stage runs
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please provide a GitHub repository URL")]
    EmptyUrl,
    #[error("Not a GitHub repository URL: expected https://github.com/<owner>/<repo>")]
    InvalidUrl,
    #[error("Repository analysis is missing required field '{0}'")]
    MissingField(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Repository not found or not public")]
    NotFound,
    #[error("Repository is too large: {size_bytes} bytes exceeds the {limit_bytes} byte limit")]
    TooLarge { size_bytes: u64, limit_bytes: u64 },
    #[error("Repository has too many files: {count} archive entries exceeds the limit of {limit}")]
    TooManyEntries { count: usize, limit: usize },
    #[error("Network error while fetching repository: {0}")]
    Network(String),
    #[error("Failed to read repository content: {0}")]
    Parse(String),
}

impl From<std::io::Error> for IngestError {
    fn from(value: std::io::Error) -> Self {
        IngestError::Parse(value.to_string())
    }
}

impl From<reqwest_middleware::Error> for IngestError {
    fn from(value: reqwest_middleware::Error) -> Self {
        IngestError::Network(value.to_string())
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(value: reqwest::Error) -> Self {
        IngestError::Network(value.to_string())
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(value: zip::result::ZipError) -> Self {
        IngestError::Parse(value.to_string())
    }
}

/// Failure of a single text-generation provider call.
///
/// These never leave the script generator: they are recorded as
/// [`crate::types::AttemptOutcome`]s and the next provider is tried.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("authentication rejected")]
    Auth,
    #[error("rate limited")]
    RateLimited,
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            ProviderError::Malformed(value.to_string())
        } else {
            ProviderError::Network(value.to_string())
        }
    }
}

impl ProviderError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::Auth,
            429 => ProviderError::RateLimited,
            408 | 500..=599 => ProviderError::Network(format!("{status} - {message}")),
            _ => ProviderError::Malformed(format!("{status} - {message}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("No script provider available and the local template could not be applied")]
    NoProvidersAvailable,
}

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech backend unavailable: {0}")]
    Unavailable(String),
    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("encoder could not be started: {0}")]
    Spawn(String),
    #[error("encoder exited with status {status}: {stderr}")]
    Exit { status: i32, stderr: String },
    #[error("encoder timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("could not probe output: {0}")]
    Probe(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("No frames to assemble")]
    NoFrames,
    #[error("Video encoding failed")]
    EncodeFailed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that ends a job
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error("Job was cancelled")]
    Cancelled,
    #[error("Unknown job {0}")]
    UnknownJob(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Job processing panicked: {0}")]
    Panicked(String),
}

impl PipelineError {
    /// Sanitized, caller-facing summary of this error.
    ///
    /// Only fixed messages are exposed; transport details stay in the logs.
    pub fn failure(&self) -> JobFailure {
        let (kind, message, retryable) = match self {
            PipelineError::Validation(e) => (FailureKind::Validation, e.to_string(), false),
            PipelineError::Ingest(IngestError::NotFound) => (
                FailureKind::Ingest,
                "Repository not found or not public".to_string(),
                false,
            ),
            PipelineError::Ingest(
                IngestError::TooLarge { .. } | IngestError::TooManyEntries { .. },
            ) => (
                FailureKind::Ingest,
                "Repository is too large to process".to_string(),
                false,
            ),
            PipelineError::Ingest(IngestError::Network(_)) => (
                FailureKind::Ingest,
                "Could not reach GitHub, please try again later".to_string(),
                true,
            ),
            PipelineError::Ingest(IngestError::Parse(_)) => (
                FailureKind::Ingest,
                "Repository content could not be read".to_string(),
                false,
            ),
            PipelineError::Generation(e) => (FailureKind::Generation, e.to_string(), false),
            PipelineError::Assembly(AssemblyError::NoFrames) => (
                FailureKind::Assembly,
                "No frames could be rendered".to_string(),
                false,
            ),
            PipelineError::Assembly(_) => (
                FailureKind::Assembly,
                "Video encoding failed, please try again later".to_string(),
                true,
            ),
            PipelineError::Cancelled => (
                FailureKind::Internal,
                "Job was cancelled".to_string(),
                true,
            ),
            PipelineError::UnknownJob(_) => (
                FailureKind::Internal,
                "Job no longer exists".to_string(),
                false,
            ),
            PipelineError::Io(_) | PipelineError::Panicked(_) => (
                FailureKind::Internal,
                "Internal error while processing the repository".to_string(),
                true,
            ),
        };

        JobFailure {
            kind,
            message,
            retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_from_status() {
        assert!(matches!(
            ProviderError::from_status(401, String::new()),
            ProviderError::Auth
        ));
        assert!(matches!(
            ProviderError::from_status(429, String::new()),
            ProviderError::RateLimited
        ));
        assert!(matches!(
            ProviderError::from_status(503, String::new()),
            ProviderError::Network(_)
        ));
        assert!(matches!(
            ProviderError::from_status(400, String::new()),
            ProviderError::Malformed(_)
        ));
    }

    #[test]
    fn test_failure_distinguishes_transient_from_permanent() {
        let too_large = PipelineError::Ingest(IngestError::TooLarge {
            size_bytes: 10,
            limit_bytes: 1,
        });
        assert!(!too_large.failure().retryable);

        let too_many = PipelineError::Ingest(IngestError::TooManyEntries {
            count: 60_000,
            limit: 50_000,
        });
        assert_eq!(too_many.failure(), too_large.failure());

        let panicked = PipelineError::Panicked("index out of bounds".into());
        assert_eq!(panicked.failure().kind, FailureKind::Internal);
        assert!(!panicked.failure().message.contains("index"));

        let network = PipelineError::Ingest(IngestError::Network("connection reset".into()));
        assert!(network.failure().retryable);

        let invalid = PipelineError::Validation(ValidationError::InvalidUrl);
        assert!(!invalid.failure().retryable);
    }

    #[test]
    fn test_failure_message_is_sanitized() {
        let err = PipelineError::Ingest(IngestError::Network(
            "error sending request for url (https://api.github.com/?token=secret)".into(),
        ));
        let failure = err.failure();
        assert!(!failure.message.contains("secret"));
        assert!(!failure.message.contains("api.github.com"));
    }
}
