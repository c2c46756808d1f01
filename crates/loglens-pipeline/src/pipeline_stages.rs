//! Stage contracts driven by the pipeline orchestrator and the values that
//! flow between them.

use async_trait::async_trait;

use crate::{LogRecord, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Chat thread anchor returned by the notifier.
pub struct NotificationHandle(String);

impl NotificationHandle {
    pub fn new(ts: impl Into<String>) -> Self {
        Self(ts.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Concatenated repository sources used as analysis context.
///
/// The text grows with the repository; nothing bounds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySnapshot {
    text: String,
    pub included_files: usize,
    pub skipped_files: usize,
    pub failed_files: usize,
}

impl RepositorySnapshot {
    pub fn new(text: String, included_files: usize, skipped_files: usize, failed_files: usize) -> Self {
        Self {
            text,
            included_files,
            skipped_files,
            failed_files,
        }
    }

    /// Wraps already-rendered snapshot text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(text.into(), 0, 0, 0)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len_bytes(&self) -> usize {
        self.text.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult(String);

impl AnalysisResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
/// Announces an error record and returns the thread anchor for later replies.
pub trait Notifier: Send + Sync {
    async fn notify(&self, record: &LogRecord) -> Result<NotificationHandle, PipelineError>;
}

#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<RepositorySnapshot, PipelineError>;
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        record: &LogRecord,
        snapshot: &RepositorySnapshot,
    ) -> Result<AnalysisResult, PipelineError>;
}

#[async_trait]
/// Posts the analysis under the notification thread.
pub trait ReplyPublisher: Send + Sync {
    async fn publish_reply(
        &self,
        handle: &NotificationHandle,
        analysis: &AnalysisResult,
    ) -> Result<(), PipelineError>;
}
