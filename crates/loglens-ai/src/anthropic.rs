use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{ChatRequest, ChatResponse, ContentBlock, LlmClient, LogLensAiError};

pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";

#[derive(Debug, Clone)]
/// Public struct `AnthropicConfig` used across LogLens components.
pub struct AnthropicConfig {
    pub api_base: String,
    pub api_key: String,
    /// `None` leaves the request unbounded in time.
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
/// Anthropic Messages API client. One request per `complete` call, no retry.
pub struct AnthropicClient {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Result<Self, LogLensAiError> {
        if config.api_key.trim().is_empty() {
            return Err(LogLensAiError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(config.api_key.trim())
                .map_err(|error| LogLensAiError::InvalidApiKey(error.to_string()))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_API_VERSION),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout_ms) = config.request_timeout_ms {
            builder = builder.timeout(std::time::Duration::from_millis(timeout_ms.max(1)));
        }
        let client = builder.build()?;

        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if base.ends_with("/messages") {
            return base.to_string();
        }

        format!("{base}/messages")
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LogLensAiError> {
        let body = build_messages_request_body(&request);
        let response = self
            .client
            .post(self.messages_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(LogLensAiError::HttpStatus {
                status: status.as_u16(),
                body: raw,
            });
        }

        parse_messages_response(&raw)
    }
}

fn build_messages_request_body(request: &ChatRequest) -> Value {
    let messages = request
        .messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role,
                "content": message.content,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "model": request.model,
        "max_tokens": request.max_tokens,
        "messages": messages,
    })
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type", default)]
    kind: String,
    text: Option<String>,
}

fn parse_messages_response(raw: &str) -> Result<ChatResponse, LogLensAiError> {
    let parsed: AnthropicMessageResponse = serde_json::from_str(raw)?;

    let content = parsed
        .content
        .into_iter()
        .map(|part| match part.text {
            Some(text) if part.kind == "text" => ContentBlock::Text { text },
            _ => ContentBlock::Other { kind: part.kind },
        })
        .collect();

    Ok(ChatResponse { content })
}
