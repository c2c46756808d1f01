use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::RepoRef;

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GithubTreeEntry {
    pub path: String,
    /// `blob` for files, `tree` for directories, `commit` for submodules.
    #[serde(rename = "type")]
    pub kind: String,
}

impl GithubTreeEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "blob"
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GithubTree {
    #[serde(rename = "tree", default)]
    pub entries: Vec<GithubTreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GithubFileContent {
    pub path: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl GithubFileContent {
    /// Decodes the contents payload into text. Invalid UTF-8 is replaced
    /// rather than rejected.
    pub fn decode_text(&self) -> Result<String> {
        match self.encoding.as_deref() {
            Some("base64") => {
                let compact = self
                    .content
                    .chars()
                    .filter(|ch| !ch.is_ascii_whitespace())
                    .collect::<String>();
                let bytes = BASE64_STANDARD
                    .decode(compact.as_bytes())
                    .with_context(|| format!("invalid base64 content for {}", self.path))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            None | Some("") => Ok(self.content.clone()),
            Some(other) => bail!("unsupported content encoding: {other}"),
        }
    }
}

#[derive(Clone)]
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubApiClient {
    pub fn new(
        api_base: &str,
        token: &str,
        repo: RepoRef,
        request_timeout_ms: Option<u64>,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("LogLens-snapshot-fetcher"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout_ms) = request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms.max(1)));
        }
        let client = builder
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http: client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Lists every entry reachable from `branch`, recursively.
    pub async fn get_tree_recursive(&self, branch: &str) -> Result<GithubTree> {
        let request = self
            .http
            .get(format!(
                "{}/repos/{}/{}/git/trees/{}",
                self.api_base, self.repo.owner, self.repo.name, branch
            ))
            .query(&[("recursive", "1")]);
        self.request_json("get tree", request).await
    }

    /// Fetches one file through the contents API at `git_ref`.
    pub async fn get_file_contents(&self, path: &str, git_ref: &str) -> Result<GithubFileContent> {
        let url = self.contents_url(path)?;
        let request = self.http.get(url).query(&[("ref", git_ref)]);
        self.request_json("get contents", request).await
    }

    fn contents_url(&self, path: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!(
            "{}/repos/{}/{}/contents",
            self.api_base, self.repo.owner, self.repo.name
        ))
        .context("invalid github api base")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("github api base cannot carry path segments"))?
            .extend(path.split('/'));
        Ok(url)
    }

    async fn request_json<T>(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .with_context(|| format!("github api {operation} request failed"))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .with_context(|| format!("failed to decode github {operation}"));
        }

        let body = response.text().await.unwrap_or_default();
        bail!(
            "github api {operation} failed with status {}: {body}",
            status.as_u16()
        );
    }
}
