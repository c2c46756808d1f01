//! Repository snapshot assembly from the GitHub trees and contents APIs.

use async_trait::async_trait;
use loglens_github::{GithubApiClient, RepoRef};

use crate::{GithubSettings, PipelineError, RepositorySnapshot, SnapshotFetcher};

pub const SNAPSHOT_HEADER: &str = "# Repository Code\n\n";

/// Binary, archive and lock-file suffixes never included in a snapshot.
pub const SKIPPED_EXTENSIONS: [&str; 14] = [
    ".png", ".jpg", ".jpeg", ".gif", ".ico", ".pdf", ".zip", ".tar", ".gz", ".exe", ".dll", ".so",
    ".lock", ".sum",
];

/// Vendored, VCS and infrastructure-state directories.
pub const SKIPPED_PATH_MARKERS: [&str; 4] = [".git/", "node_modules/", "vendor/", ".terraform/"];

pub fn should_skip_repository_path(path: &str) -> bool {
    SKIPPED_EXTENSIONS
        .iter()
        .any(|extension| path.ends_with(extension))
        || SKIPPED_PATH_MARKERS
            .iter()
            .any(|marker| path.contains(marker))
}

#[derive(Debug, Clone)]
pub struct RepositorySnapshotBuilder {
    text: String,
    included_files: usize,
    skipped_files: usize,
    failed_files: usize,
}

impl Default for RepositorySnapshotBuilder {
    fn default() -> Self {
        Self {
            text: SNAPSHOT_HEADER.to_string(),
            included_files: 0,
            skipped_files: 0,
            failed_files: 0,
        }
    }
}

impl RepositorySnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_file(&mut self, path: &str, content: &str) {
        self.text
            .push_str(&format!("\n## File: {path}\n```\n{content}\n```\n"));
        self.included_files = self.included_files.saturating_add(1);
    }

    pub fn record_skipped(&mut self) {
        self.skipped_files = self.skipped_files.saturating_add(1);
    }

    pub fn record_failed(&mut self) {
        self.failed_files = self.failed_files.saturating_add(1);
    }

    pub fn finish(self) -> RepositorySnapshot {
        RepositorySnapshot::new(
            self.text,
            self.included_files,
            self.skipped_files,
            self.failed_files,
        )
    }
}

/// Re-fetches the whole tree and every qualifying file on each call.
#[derive(Debug, Clone)]
pub struct GithubSnapshotFetcher {
    settings: GithubSettings,
    request_timeout_ms: Option<u64>,
}

impl GithubSnapshotFetcher {
    pub fn new(settings: GithubSettings, request_timeout_ms: Option<u64>) -> Self {
        Self {
            settings,
            request_timeout_ms,
        }
    }

    fn client(&self) -> Result<GithubApiClient, PipelineError> {
        let (token, repository) = self.settings.credentials()?;
        let repo =
            RepoRef::parse(repository).map_err(|error| PipelineError::config(error.to_string()))?;
        GithubApiClient::new(
            &self.settings.api_base,
            token,
            repo,
            self.request_timeout_ms,
        )
        .map_err(|error| PipelineError::upstream("github", &error))
    }
}

#[async_trait]
impl SnapshotFetcher for GithubSnapshotFetcher {
    async fn fetch_snapshot(&self) -> Result<RepositorySnapshot, PipelineError> {
        let client = self.client()?;
        let branch = self.settings.branch.as_str();
        let tree = client
            .get_tree_recursive(branch)
            .await
            .map_err(|error| PipelineError::upstream("github", &error))?;
        if tree.truncated {
            tracing::warn!(
                repository = %client.repo().as_slug(),
                branch,
                "github tree listing truncated; snapshot covers a partial tree"
            );
        }

        let mut builder = RepositorySnapshotBuilder::new();
        for entry in tree.entries.iter().filter(|entry| entry.is_file()) {
            if should_skip_repository_path(&entry.path) {
                builder.record_skipped();
                continue;
            }

            let fetched = client
                .get_file_contents(&entry.path, branch)
                .await
                .and_then(|file| file.decode_text());
            match fetched {
                Ok(content) => builder.push_file(&entry.path, &content),
                Err(error) => {
                    tracing::warn!(
                        path = %entry.path,
                        error = %format!("{error:#}"),
                        "skipping repository file"
                    );
                    builder.record_failed();
                }
            }
        }

        Ok(builder.finish())
    }
}
