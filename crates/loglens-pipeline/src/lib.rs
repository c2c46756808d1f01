//! Error-log enrichment pipeline: push-event decoding, the four enrichment
//! stages (Slack notification, GitHub snapshot, Anthropic analysis, threaded
//! reply) and the orchestrator that drives them.

pub mod analyzer;
pub mod event_decoder;
pub mod log_record;
pub mod pipeline_config;
pub mod pipeline_dispatcher;
pub mod pipeline_error;
pub mod pipeline_runtime;
pub mod pipeline_stages;
pub mod slack_notifier;
pub mod snapshot_fetcher;

pub use analyzer::{
    analyze_with_client, build_analysis_prompt, AnthropicAnalyzer, ANALYSIS_MAX_TOKENS,
    ANALYSIS_MODEL,
};
pub use event_decoder::{decode_push_event, encode_push_event, DecodedPushEvent, EventDecodeError};
pub use log_record::{LogRecord, LogResource, LogSeverity};
pub use pipeline_config::{
    AnalyzerSettings, GithubSettings, PipelineConfig, SlackSettings, DEFAULT_ANTHROPIC_API_BASE,
    DEFAULT_GITHUB_API_BASE, DEFAULT_GITHUB_BRANCH, DEFAULT_SLACK_API_BASE,
};
pub use pipeline_dispatcher::{PipelineDispatcher, PipelineLauncher};
pub use pipeline_error::PipelineError;
pub use pipeline_runtime::{PipelineOutcome, PipelineRuntime, PipelineStage, PipelineState, PipelineStages};
pub use pipeline_stages::{
    AnalysisResult, Analyzer, NotificationHandle, Notifier, ReplyPublisher, RepositorySnapshot,
    SnapshotFetcher,
};
pub use slack_notifier::{render_analysis_reply, render_error_alert, SlackNotifier};
pub use snapshot_fetcher::{
    should_skip_repository_path, GithubSnapshotFetcher, RepositorySnapshotBuilder,
    SKIPPED_EXTENSIONS, SKIPPED_PATH_MARKERS, SNAPSHOT_HEADER,
};
