pub mod analysis;
pub mod archive;
mod url;

use std::{future::Future, path::Path, time::Duration};

use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;

pub use url::RepoUrl;

use crate::{
    config::IngestLimits,
    error::IngestError,
    github::archive::{download_archive, extract_archive, Download},
    types::RepositoryAnalysis,
};

/// Turns a repository reference into a [`RepositoryAnalysis`].
///
/// Implementations may write scratch files below `workdir` but must leave
/// nothing behind once the returned future completes.
pub trait RepositoryIngestor {
    fn ingest(
        &self,
        url: &RepoUrl,
        workdir: &Path,
    ) -> impl Future<Output = Result<RepositoryAnalysis, IngestError>> + Send;
}

#[derive(Debug, Deserialize)]
struct RepoMetadata {
    description: Option<String>,
    default_branch: Option<String>,
    /// Repository size in kilobytes as reported by GitHub
    size: Option<u64>,
}

/// Downloads the branch zip from codeload and condenses it locally
#[derive(Clone)]
pub struct ArchiveIngestor {
    client: ClientWithMiddleware,
    api_base: String,
    codeload_base: String,
    token: Option<String>,
    limits: IngestLimits,
}

impl ArchiveIngestor {
    /// Branches probed after the default branch
    const FALLBACK_BRANCHES: [&str; 4] = ["main", "master", "dev", "develop"];

    pub fn new(limits: IngestLimits) -> Self {
        let http = reqwest::Client::builder()
            .timeout(limits.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = ?e, "Falling back to default http client");
                reqwest::Client::new()
            });

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(1);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        ArchiveIngestor {
            client,
            api_base: "https://api.github.com".into(),
            codeload_base: "https://codeload.github.com".into(),
            token: None,
            limits,
        }
    }

    pub fn with_base_urls(mut self, api: impl Into<String>, codeload: impl Into<String>) -> Self {
        self.api_base = api.into();
        self.codeload_base = codeload.into();
        self
    }

    /// Optional token for the metadata call; raises the GitHub rate limit
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Looks the repository up on the REST API.
    ///
    /// Only a 404 or an oversized repository stop ingestion; any other
    /// problem is logged and the download proceeds without metadata.
    #[tracing::instrument(skip(self))]
    async fn fetch_metadata(&self, url: &RepoUrl) -> Result<Option<RepoMetadata>, IngestError> {
        let endpoint = format!("{}/repos/{}/{}", self.api_base, url.owner(), url.repo());
        let mut req = self
            .client
            .get(&endpoint)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "repo-reel");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = ?e, "GitHub metadata request failed, continuing without it");
                return Ok(None);
            }
        };

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(IngestError::NotFound);
        }
        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "GitHub metadata unavailable");
            return Ok(None);
        }

        let metadata = match resp.json::<RepoMetadata>().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(error = ?e, "Unexpected GitHub metadata payload");
                return Ok(None);
            }
        };

        if let Some(size_bytes) = metadata.size.map(|kb| kb * 1024) {
            if size_bytes > self.limits.max_archive_bytes {
                return Err(IngestError::TooLarge {
                    size_bytes,
                    limit_bytes: self.limits.max_archive_bytes,
                });
            }
        }

        Ok(Some(metadata))
    }

    fn branch_candidates(default_branch: Option<&str>) -> Vec<String> {
        let mut branches = Vec::with_capacity(5);
        if let Some(branch) = default_branch.filter(|b| !b.is_empty()) {
            branches.push(branch.to_string());
        }
        for branch in Self::FALLBACK_BRANCHES {
            if !branches.iter().any(|b| b == branch) {
                branches.push(branch.to_string());
            }
        }
        branches
    }
}

impl RepositoryIngestor for ArchiveIngestor {
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn ingest(
        &self,
        url: &RepoUrl,
        workdir: &Path,
    ) -> Result<RepositoryAnalysis, IngestError> {
        let metadata = self.fetch_metadata(url).await?;
        let (description, default_branch) = metadata
            .map(|m| (m.description, m.default_branch))
            .unwrap_or_default();

        // removed on drop, whichever way this function returns
        let scratch = tempfile::Builder::new()
            .prefix("ingest-")
            .tempdir_in(workdir)?;
        let zip_path = scratch.path().join("archive.zip");

        let mut downloaded = None;
        for branch in Self::branch_candidates(default_branch.as_deref()) {
            let archive_url = format!(
                "{}/{}/{}/zip/refs/heads/{branch}",
                self.codeload_base,
                url.owner(),
                url.repo()
            );
            match download_archive(
                &self.client,
                &archive_url,
                &zip_path,
                self.limits.max_archive_bytes,
            )
            .await?
            {
                Download::Saved { bytes } => {
                    tracing::info!(%branch, bytes, "Downloaded repository archive");
                    downloaded = Some(branch);
                    break;
                }
                Download::Missing => tracing::debug!(%branch, "Branch not found"),
            }
        }
        if downloaded.is_none() {
            return Err(IngestError::NotFound);
        }

        let extract_dir = scratch.path().join("src");
        let limits = self.limits.clone();
        let url = url.clone();
        tokio::task::spawn_blocking(move || {
            let root = extract_archive(&zip_path, &extract_dir, &limits)?;
            let (files, stats) = analysis::collect_files(&root, &limits)?;
            Ok::<_, IngestError>(analysis::analyze(&url, description, &files, stats))
        })
        .await
        .map_err(|e| IngestError::Parse(format!("extraction task failed: {e}")))?
        .inspect_err(|e: &IngestError| tracing::error!(error = ?e, "Failed to read archive"))
    }
}
