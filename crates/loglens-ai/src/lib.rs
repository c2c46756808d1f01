//! Reasoning-service client surface used by the LogLens analysis stage.
mod anthropic;
mod types;

pub use anthropic::{
    AnthropicClient, AnthropicConfig, ANTHROPIC_API_VERSION, DEFAULT_ANTHROPIC_API_BASE,
};
pub use types::{
    ChatRequest, ChatResponse, ContentBlock, LlmClient, LogLensAiError, Message, MessageRole,
};
