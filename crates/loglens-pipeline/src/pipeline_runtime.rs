//! Orchestrates one enrichment run as an explicit state machine.
//!
//! `Notifying -> FetchingSnapshot -> Analyzing -> Replying -> Done`, with
//! `Aborted` reachable from every non-terminal state. Each state owns exactly
//! what the next stage consumes, so a stage cannot run without its inputs.
//! Transitions are forward-only and no stage is retried.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::{
    AnalysisResult, Analyzer, AnthropicAnalyzer, GithubSnapshotFetcher, LogRecord,
    NotificationHandle, Notifier, PipelineConfig, PipelineError, ReplyPublisher,
    RepositorySnapshot, SlackNotifier, SnapshotFetcher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Notifying,
    FetchingSnapshot,
    Analyzing,
    Replying,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notifying => "notifying",
            Self::FetchingSnapshot => "fetching_snapshot",
            Self::Analyzing => "analyzing",
            Self::Replying => "replying",
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Notifying,
    FetchingSnapshot {
        handle: NotificationHandle,
    },
    Analyzing {
        handle: NotificationHandle,
        snapshot: RepositorySnapshot,
    },
    Replying {
        handle: NotificationHandle,
        analysis: AnalysisResult,
    },
    Done,
    Aborted {
        stage: PipelineStage,
        error: PipelineError,
    },
}

impl PipelineState {
    /// The stage this state will execute next, `None` once terminal.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Notifying => Some(PipelineStage::Notifying),
            Self::FetchingSnapshot { .. } => Some(PipelineStage::FetchingSnapshot),
            Self::Analyzing { .. } => Some(PipelineStage::Analyzing),
            Self::Replying { .. } => Some(PipelineStage::Replying),
            Self::Done | Self::Aborted { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    Aborted {
        stage: PipelineStage,
        error: PipelineError,
    },
}

#[derive(Clone)]
pub struct PipelineStages {
    pub notifier: Arc<dyn Notifier>,
    pub snapshot_fetcher: Arc<dyn SnapshotFetcher>,
    pub analyzer: Arc<dyn Analyzer>,
    pub reply_publisher: Arc<dyn ReplyPublisher>,
}

impl PipelineStages {
    /// Slack, GitHub and Anthropic backed stages.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let slack = Arc::new(SlackNotifier::new(
            config.slack.clone(),
            config.request_timeout_ms,
        ));
        Self {
            notifier: slack.clone(),
            snapshot_fetcher: Arc::new(GithubSnapshotFetcher::new(
                config.github.clone(),
                config.request_timeout_ms,
            )),
            analyzer: Arc::new(AnthropicAnalyzer::new(
                config.analyzer.clone(),
                config.request_timeout_ms,
            )),
            reply_publisher: slack,
        }
    }
}

/// Shared, read-only driver for pipeline runs.
#[derive(Clone)]
pub struct PipelineRuntime {
    stages: PipelineStages,
}

impl PipelineRuntime {
    pub fn new(stages: PipelineStages) -> Self {
        Self { stages }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(PipelineStages::from_config(config))
    }

    /// Performs exactly one transition. Terminal states are returned as-is.
    pub async fn advance(&self, record: &LogRecord, state: PipelineState) -> PipelineState {
        match state {
            PipelineState::Notifying => match self.stages.notifier.notify(record).await {
                Ok(handle) => {
                    tracing::info!(thread_ts = handle.as_str(), "sent error notification");
                    PipelineState::FetchingSnapshot { handle }
                }
                Err(error) => abort(PipelineStage::Notifying, error),
            },
            PipelineState::FetchingSnapshot { handle } => {
                match self.stages.snapshot_fetcher.fetch_snapshot().await {
                    Ok(snapshot) => {
                        tracing::info!(
                            bytes = snapshot.len_bytes(),
                            included_files = snapshot.included_files,
                            skipped_files = snapshot.skipped_files,
                            failed_files = snapshot.failed_files,
                            "retrieved repository snapshot"
                        );
                        PipelineState::Analyzing { handle, snapshot }
                    }
                    Err(error) => abort(PipelineStage::FetchingSnapshot, error),
                }
            }
            PipelineState::Analyzing { handle, snapshot } => {
                match self.stages.analyzer.analyze(record, &snapshot).await {
                    Ok(analysis) => {
                        tracing::info!(bytes = analysis.as_str().len(), "received analysis");
                        PipelineState::Replying { handle, analysis }
                    }
                    Err(error) => abort(PipelineStage::Analyzing, error),
                }
            }
            PipelineState::Replying { handle, analysis } => {
                match self
                    .stages
                    .reply_publisher
                    .publish_reply(&handle, &analysis)
                    .await
                {
                    Ok(()) => {
                        tracing::info!(thread_ts = handle.as_str(), "sent analysis reply");
                        PipelineState::Done
                    }
                    Err(error) => abort(PipelineStage::Replying, error),
                }
            }
            terminal @ (PipelineState::Done | PipelineState::Aborted { .. }) => terminal,
        }
    }

    /// Drives `record` to a terminal state. Failures are logged, never
    /// propagated further.
    pub async fn run(&self, record: LogRecord) -> PipelineOutcome {
        let mut state = PipelineState::Notifying;
        while !state.is_terminal() {
            state = self.advance(&record, state).await;
        }

        match state {
            PipelineState::Aborted { stage, error } => {
                tracing::error!(stage = stage.as_str(), error = %error, "pipeline run aborted");
                PipelineOutcome::Aborted { stage, error }
            }
            _ => PipelineOutcome::Completed,
        }
    }
}

fn abort(stage: PipelineStage, error: PipelineError) -> PipelineState {
    PipelineState::Aborted { stage, error }
}
