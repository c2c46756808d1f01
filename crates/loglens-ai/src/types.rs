use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `MessageRole` values.
pub enum MessageRole {
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Single conversational turn. Content is plain text; the analysis flow never
/// sends media or tool blocks.
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `ContentBlock` values.
pub enum ContentBlock {
    Text { text: String },
    /// Any non-text block the provider returned, kept by its `type` tag.
    Other { kind: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `ChatRequest` used across LogLens components.
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `ChatResponse` used across LogLens components.
pub struct ChatResponse {
    pub content: Vec<ContentBlock>,
}

impl ChatResponse {
    /// Text of the first content block, verbatim. `None` when the response is
    /// empty or opens with a non-text block.
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first()? {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
/// Enumerates supported `LogLensAiError` values.
pub enum LogLensAiError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid API key: {0}")]
    InvalidApiKey(String),
}

#[async_trait]
/// Trait contract for `LlmClient` behavior.
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LogLensAiError>;
}
