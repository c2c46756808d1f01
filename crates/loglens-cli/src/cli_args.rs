use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use loglens_pipeline::{
    AnalyzerSettings, GithubSettings, LogSeverity, PipelineConfig, SlackSettings,
    DEFAULT_ANTHROPIC_API_BASE, DEFAULT_GITHUB_API_BASE, DEFAULT_GITHUB_BRANCH,
    DEFAULT_SLACK_API_BASE,
};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_log_severity(value: &str) -> Result<LogSeverity, String> {
    value.parse::<LogSeverity>()
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "loglens-server",
    about = "Enriches pushed error logs with a Slack alert and a code-aware analysis reply",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "LOGLENS_BIND_HOST",
        default_value = "0.0.0.0",
        help = "Interface address the push endpoint listens on."
    )]
    pub bind_host: String,

    #[arg(
        long,
        env = "PORT",
        default_value_t = 8080,
        help = "TCP port the push endpoint listens on."
    )]
    pub port: u16,

    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub slack_bot_token: Option<String>,

    #[arg(long, env = "SLACK_CHANNEL", help = "Channel receiving alerts and replies.")]
    pub slack_channel: Option<String>,

    #[arg(
        long,
        env = "LOGLENS_SLACK_API_BASE",
        default_value = DEFAULT_SLACK_API_BASE
    )]
    pub slack_api_base: String,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[arg(
        long,
        env = "GITHUB_REPOSITORY",
        help = "Repository snapshotted for analysis, as owner/name."
    )]
    pub github_repository: Option<String>,

    #[arg(long, env = "LOGLENS_GITHUB_BRANCH", default_value = DEFAULT_GITHUB_BRANCH)]
    pub github_branch: String,

    #[arg(
        long,
        env = "LOGLENS_GITHUB_API_BASE",
        default_value = DEFAULT_GITHUB_API_BASE
    )]
    pub github_api_base: String,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(
        long,
        env = "LOGLENS_ANTHROPIC_API_BASE",
        default_value = DEFAULT_ANTHROPIC_API_BASE
    )]
    pub anthropic_api_base: String,

    #[arg(
        long,
        env = "LOGLENS_REQUEST_TIMEOUT_MS",
        value_parser = parse_positive_u64,
        help = "Timeout applied to every outbound request. Requests never time out when unset."
    )]
    pub request_timeout_ms: Option<u64>,

    #[arg(
        long,
        env = "LOGLENS_MIN_SEVERITY",
        value_parser = parse_log_severity,
        help = "Acknowledge but ignore entries ranked below this severity (e.g. ERROR)."
    )]
    pub min_severity: Option<LogSeverity>,
}

impl Cli {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip = self
            .bind_host
            .trim()
            .parse::<IpAddr>()
            .with_context(|| format!("invalid --bind-host '{}'", self.bind_host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            slack: SlackSettings {
                api_base: self.slack_api_base.clone(),
                bot_token: self.slack_bot_token.clone(),
                channel: self.slack_channel.clone(),
            },
            github: GithubSettings {
                api_base: self.github_api_base.clone(),
                token: self.github_token.clone(),
                repository: self.github_repository.clone(),
                branch: self.github_branch.clone(),
            },
            analyzer: AnalyzerSettings {
                api_base: self.anthropic_api_base.clone(),
                api_key: self.anthropic_api_key.clone(),
            },
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}
