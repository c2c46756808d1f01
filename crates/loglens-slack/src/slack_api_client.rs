//! Slack Web API client helpers used by the notification and reply stages.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};


pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Server-assigned coordinates of a posted message.
pub struct SlackPostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl SlackApiClient {
    pub fn new(api_base: &str, bot_token: &str, request_timeout_ms: Option<u64>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("LogLens-slack-notifier"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout_ms) = request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms.max(1)));
        }
        let http = builder.build().context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
        })
    }

    /// Posts `text` to `channel`, threaded under `thread_ts` when given.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<SlackPostedMessage> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
        });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }

        let response: SlackChatMessageResponse = self
            .request_json(
                "chat.postMessage",
                self.http
                    .post(format!("{}/chat.postMessage", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload),
            )
            .await?;

        if !response.ok {
            bail!(
                "slack chat.postMessage failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(SlackPostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts: response
                .ts
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    async fn request_json<T>(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .with_context(|| format!("slack api {operation} request failed"))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .with_context(|| format!("failed to decode slack {operation}"));
        }

        let body = response.text().await.unwrap_or_default();
        bail!(
            "slack api {operation} failed with status {}: {body}",
            status.as_u16()
        );
    }
}
