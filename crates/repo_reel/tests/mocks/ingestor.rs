use std::{
    collections::BTreeSet,
    path::Path,
    sync::{Arc, Mutex},
};

use repo_reel::{
    types::{RepoStats, RepositoryAnalysis, NO_TECHNOLOGY_DETECTED},
    IngestError, RepoUrl, RepositoryIngestor,
};

pub const README: &str = include_str!("../fixtures/README.md");

#[derive(Clone)]
pub struct MockIngestor {
    pub analysis: RepositoryAnalysis,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<fn() -> IngestError>,
}

impl MockIngestor {
    pub fn new(analysis: RepositoryAnalysis) -> Self {
        Self {
            analysis,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn hello_world() -> Self {
        Self::new(hello_world_analysis())
    }

    pub fn failing(make: fn() -> IngestError) -> Self {
        Self {
            fail_with: Some(make),
            ..Self::hello_world()
        }
    }
}

/// octocat/Hello-World: a README and nothing else
pub fn hello_world_analysis() -> RepositoryAnalysis {
    RepositoryAnalysis {
        name: "Hello-World".into(),
        owner: "octocat".into(),
        url: "https://github.com/octocat/Hello-World".into(),
        description: "My first repository on GitHub!".into(),
        technologies: BTreeSet::from([NO_TECHNOLOGY_DETECTED.to_string()]),
        features: vec![
            "Shows what a repository on GitHub looks like".into(),
            "Invites you to fork it and make your own changes".into(),
        ],
        code_excerpts: vec![],
        stats: RepoStats {
            files_scanned: 1,
            bytes_scanned: README.len() as u64,
            ..Default::default()
        },
        content_summary: README.to_string(),
        file_structure: vec!["README".into()],
    }
}

impl RepositoryIngestor for MockIngestor {
    async fn ingest(&self, url: &RepoUrl, workdir: &Path) -> Result<RepositoryAnalysis, IngestError> {
        self.calls.lock().unwrap().push(url.canonical());
        // leaves a scratch file behind like a half-finished download would
        tokio::fs::write(workdir.join("archive.zip"), b"PK").await?;

        if let Some(make) = self.fail_with {
            return Err(make());
        }
        Ok(self.analysis.clone())
    }
}
