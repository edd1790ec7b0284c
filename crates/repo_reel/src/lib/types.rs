use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::PathBuf,
    time::Duration,
};

use serde::Serialize;

use crate::error::ValidationError;

/// Placeholder technology recorded when nothing in the repository is recognized
pub const NO_TECHNOLOGY_DETECTED: &str = "none-detected";

/// Condensed view of a repository, built once per job and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryAnalysis {
    pub name: String,
    pub owner: String,
    pub url: String,
    pub description: String,
    pub technologies: BTreeSet<String>,
    pub features: Vec<String>,
    pub code_excerpts: Vec<CodeExcerpt>,
    pub stats: RepoStats,
    pub content_summary: String,
    pub file_structure: Vec<String>,
}

impl RepositoryAnalysis {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        Ok(())
    }

    /// Technologies without the "nothing detected" placeholder
    pub fn detected_technologies(&self) -> impl Iterator<Item = &str> {
        self.technologies
            .iter()
            .map(String::as_str)
            .filter(|t| *t != NO_TECHNOLOGY_DETECTED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeExcerpt {
    pub language: String,
    pub path: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoStats {
    pub files_scanned: usize,
    pub bytes_scanned: u64,
    pub languages: BTreeMap<String, usize>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Title,
    Features,
    Technology,
    Code,
    Content,
    Conclusion,
}

impl SectionKind {
    /// The five-section layout requested from providers and used by the local template
    pub const DEFAULT_LAYOUT: [SectionKind; 5] = [
        SectionKind::Title,
        SectionKind::Features,
        SectionKind::Technology,
        SectionKind::Code,
        SectionKind::Conclusion,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SectionKind::Title => "Title",
            SectionKind::Features => "Features",
            SectionKind::Technology => "Technology",
            SectionKind::Code => "Code",
            SectionKind::Content => "Content",
            SectionKind::Conclusion => "Conclusion",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptSection {
    pub index: usize,
    pub kind: SectionKind,
    pub heading: String,
    pub text: String,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum ScriptSource {
    Provider(String),
    LocalTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script {
    pub sections: Vec<ScriptSection>,
    pub source: ScriptSource,
}

impl Script {
    pub fn total_duration_secs(&self) -> f64 {
        self.sections.iter().map(|s| s.duration_secs).sum()
    }
}

/// Inclusive bounds on the total video duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBounds {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for DurationBounds {
    fn default() -> Self {
        DurationBounds {
            min_secs: 30.0,
            max_secs: 180.0,
        }
    }
}

impl DurationBounds {
    /// Finite, positive and ordered
    pub fn is_valid(&self) -> bool {
        self.min_secs.is_finite()
            && self.max_secs.is_finite()
            && self.min_secs > 0.0
            && self.min_secs <= self.max_secs
    }

    /// Like `f64::clamp` but never panics: a NaN bound is ignored and an
    /// inverted pair resolves to `max_secs`.
    pub fn clamp(&self, secs: f64) -> f64 {
        secs.max(self.min_secs).min(self.max_secs)
    }

    pub fn contains(&self, secs: f64) -> bool {
        // rescaling accumulates float error
        secs >= self.min_secs - 1e-6 && secs <= self.max_secs + 1e-6
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptOutcome {
    Success,
    RateLimited,
    AuthError,
    NetworkError,
    MalformedResponse,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::RateLimited => "rate-limited",
            AttemptOutcome::AuthError => "auth-error",
            AttemptOutcome::NetworkError => "network-error",
            AttemptOutcome::MalformedResponse => "malformed-response",
        };
        f.write_str(s)
    }
}

/// One provider's part in a script generation run
#[derive(Debug, Clone, Serialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub rank: usize,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
    pub retried: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub path: PathBuf,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub index: usize,
    pub path: PathBuf,
    pub duration_secs: f64,
}
