use async_trait::async_trait;
use loglens_slack::SlackApiClient;

use crate::{
    AnalysisResult, LogRecord, NotificationHandle, Notifier, PipelineError, ReplyPublisher,
    SlackSettings,
};

pub fn render_error_alert(record: &LogRecord) -> String {
    format!(
        "*Error Log Detected*\n```\nSeverity: {}\nTimestamp: {}\nPayload: {}\n```",
        record.severity, record.timestamp, record.text_payload
    )
}

pub fn render_analysis_reply(analysis: &AnalysisResult) -> String {
    format!("*Claude Analysis*\n{}", analysis.as_str())
}

/// Slack-backed notifier and reply publisher. Both post through
/// `chat.postMessage` to the configured channel.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    settings: SlackSettings,
    request_timeout_ms: Option<u64>,
}

impl SlackNotifier {
    pub fn new(settings: SlackSettings, request_timeout_ms: Option<u64>) -> Self {
        Self {
            settings,
            request_timeout_ms,
        }
    }

    async fn post(&self, text: &str, thread_ts: Option<&str>) -> Result<String, PipelineError> {
        let (bot_token, channel) = self.settings.credentials()?;
        let client = SlackApiClient::new(&self.settings.api_base, bot_token, self.request_timeout_ms)
            .map_err(|error| PipelineError::upstream("slack", &error))?;
        let posted = client
            .post_message(channel, text, thread_ts)
            .await
            .map_err(|error| PipelineError::upstream("slack", &error))?;
        Ok(posted.ts)
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, record: &LogRecord) -> Result<NotificationHandle, PipelineError> {
        let ts = self.post(&render_error_alert(record), None).await?;
        Ok(NotificationHandle::new(ts))
    }
}

#[async_trait]
impl ReplyPublisher for SlackNotifier {
    async fn publish_reply(
        &self,
        handle: &NotificationHandle,
        analysis: &AnalysisResult,
    ) -> Result<(), PipelineError> {
        self.post(&render_analysis_reply(analysis), Some(handle.as_str()))
            .await
            .map(|_| ())
    }
}
