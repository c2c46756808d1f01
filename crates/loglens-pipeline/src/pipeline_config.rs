//! Immutable process-wide configuration handed to every stage.
//!
//! Credentials are optional here: a missing value only fails the stage that
//! needs it, at run time, with [`PipelineError::Config`].

pub use loglens_ai::DEFAULT_ANTHROPIC_API_BASE;
pub use loglens_github::DEFAULT_GITHUB_API_BASE;
pub use loglens_slack::DEFAULT_SLACK_API_BASE;

use crate::PipelineError;

pub const DEFAULT_GITHUB_BRANCH: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackSettings {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub channel: Option<String>,
}

impl SlackSettings {
    /// Returns `(bot_token, channel)`.
    pub fn credentials(&self) -> Result<(&str, &str), PipelineError> {
        match (non_blank(&self.bot_token), non_blank(&self.channel)) {
            (Some(token), Some(channel)) => Ok((token, channel)),
            _ => Err(PipelineError::config(
                "slack bot token or slack channel not set",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubSettings {
    pub api_base: String,
    pub token: Option<String>,
    /// `owner/name` slug.
    pub repository: Option<String>,
    pub branch: String,
}

impl GithubSettings {
    /// Returns `(token, repository)`.
    pub fn credentials(&self) -> Result<(&str, &str), PipelineError> {
        match (non_blank(&self.token), non_blank(&self.repository)) {
            (Some(token), Some(repository)) => Ok((token, repository)),
            _ => Err(PipelineError::config(
                "github token or github repository not set",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerSettings {
    pub api_base: String,
    pub api_key: Option<String>,
}

impl AnalyzerSettings {
    pub fn api_key(&self) -> Result<&str, PipelineError> {
        non_blank(&self.api_key).ok_or_else(|| PipelineError::config("anthropic api key not set"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub slack: SlackSettings,
    pub github: GithubSettings,
    pub analyzer: AnalyzerSettings,
    /// Applied to every outbound request when set; unset means no timeout.
    pub request_timeout_ms: Option<u64>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
