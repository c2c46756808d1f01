use async_trait::async_trait;
use loglens_ai::{
    AnthropicClient, AnthropicConfig, ChatRequest, LlmClient, LogLensAiError, Message,
};

use crate::{AnalysisResult, Analyzer, AnalyzerSettings, LogRecord, PipelineError, RepositorySnapshot};

pub const ANALYSIS_MODEL: &str = "claude-sonnet-4-20250514";
pub const ANALYSIS_MAX_TOKENS: u32 = 2048;

pub fn build_analysis_prompt(record: &LogRecord, snapshot: &RepositorySnapshot) -> String {
    format!(
        "You are a software engineer analyzing an error log from a production system.\n\
         \n\
         Error Log:\n\
         - Severity: {severity}\n\
         - Timestamp: {timestamp}\n\
         - Message: {message}\n\
         \n\
         Repository Code:\n\
         {snapshot}\n\
         \n\
         Please analyze this error and provide:\n\
         1. Root cause of the error\n\
         2. Which part of the code is causing this issue\n\
         3. Suggested fix\n\
         \n\
         Keep your response concise and actionable.",
        severity = record.severity,
        timestamp = record.timestamp,
        message = record.text_payload,
        snapshot = snapshot.as_str(),
    )
}

/// Runs one single-turn analysis request and returns the first content
/// block's text verbatim.
pub async fn analyze_with_client(
    client: &dyn LlmClient,
    record: &LogRecord,
    snapshot: &RepositorySnapshot,
) -> Result<AnalysisResult, PipelineError> {
    let request = ChatRequest {
        model: ANALYSIS_MODEL.to_string(),
        messages: vec![Message::user(build_analysis_prompt(record, snapshot))],
        max_tokens: ANALYSIS_MAX_TOKENS,
    };
    let response = client.complete(request).await.map_err(map_ai_error)?;
    if response.content.is_empty() {
        return Err(upstream("no content in analysis response"));
    }
    response
        .first_text()
        .map(AnalysisResult::new)
        .ok_or_else(|| upstream("first content block of analysis response carries no text"))
}

fn upstream(detail: impl Into<String>) -> PipelineError {
    PipelineError::Upstream {
        service: "anthropic",
        detail: detail.into(),
    }
}

fn map_ai_error(error: LogLensAiError) -> PipelineError {
    match error {
        LogLensAiError::MissingApiKey => PipelineError::config("anthropic api key not set"),
        LogLensAiError::InvalidApiKey(detail) => {
            PipelineError::config(format!("anthropic api key rejected: {detail}"))
        }
        LogLensAiError::HttpStatus { status, body } => {
            upstream(format!("claude api error (status {status}): {body}"))
        }
        other => upstream(other.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicAnalyzer {
    settings: AnalyzerSettings,
    request_timeout_ms: Option<u64>,
}

impl AnthropicAnalyzer {
    pub fn new(settings: AnalyzerSettings, request_timeout_ms: Option<u64>) -> Self {
        Self {
            settings,
            request_timeout_ms,
        }
    }
}

#[async_trait]
impl Analyzer for AnthropicAnalyzer {
    async fn analyze(
        &self,
        record: &LogRecord,
        snapshot: &RepositorySnapshot,
    ) -> Result<AnalysisResult, PipelineError> {
        let api_key = self.settings.api_key()?;
        let client = AnthropicClient::new(AnthropicConfig {
            api_base: self.settings.api_base.clone(),
            api_key: api_key.to_string(),
            request_timeout_ms: self.request_timeout_ms,
        })
        .map_err(map_ai_error)?;
        analyze_with_client(&client, record, snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use httpmock::prelude::*;
    use loglens_ai::{ChatRequest, ChatResponse, ContentBlock, LlmClient, LogLensAiError};
    use serde_json::json;

    use super::{analyze_with_client, build_analysis_prompt, AnthropicAnalyzer};
    use crate::{
        AnalysisResult, Analyzer, AnalyzerSettings, LogRecord, PipelineError, RepositorySnapshot,
    };

    struct ScriptedClient {
        content: Vec<ContentBlock>,
        requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LogLensAiError> {
            self.requests.lock().expect("requests lock").push(request);
            Ok(ChatResponse {
                content: self.content.clone(),
            })
        }
    }

    fn record() -> LogRecord {
        LogRecord {
            severity: "ERROR".to_string(),
            text_payload: "nil pointer".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            ..LogRecord::default()
        }
    }

    fn snapshot() -> RepositorySnapshot {
        RepositorySnapshot::from_text("# Repository Code\n\n## File: main.go\n```\npackage main\n```\n")
    }

    #[test]
    fn prompt_embeds_record_fields_and_snapshot_verbatim() {
        let prompt = build_analysis_prompt(&record(), &snapshot());

        assert!(prompt.starts_with(
            "You are a software engineer analyzing an error log from a production system.\n\nError Log:\n- Severity: ERROR\n"
        ));
        assert!(prompt.contains("- Timestamp: 2024-01-01T00:00:00Z\n"));
        assert!(prompt.contains("- Message: nil pointer\n"));
        assert!(prompt.contains(
            "Repository Code:\n# Repository Code\n\n## File: main.go\n```\npackage main\n```\n\n\nPlease analyze"
        ));
        assert!(prompt.ends_with("3. Suggested fix\n\nKeep your response concise and actionable."));
    }

    #[tokio::test]
    async fn analyze_with_client_sends_fixed_model_and_returns_first_block() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let client = ScriptedClient {
            content: vec![
                ContentBlock::Text {
                    text: "Root cause: nil map".to_string(),
                },
                ContentBlock::Text {
                    text: "ignored".to_string(),
                },
            ],
            requests: requests.clone(),
        };

        let analysis = analyze_with_client(&client, &record(), &snapshot())
            .await
            .expect("analysis");

        assert_eq!(analysis, AnalysisResult::new("Root cause: nil map"));
        let requests = requests.lock().expect("requests lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "claude-sonnet-4-20250514");
        assert_eq!(requests[0].max_tokens, 2048);
        assert_eq!(requests[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn regression_empty_content_is_upstream_error() {
        let client = ScriptedClient {
            content: Vec::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let error = analyze_with_client(&client, &record(), &snapshot())
            .await
            .expect_err("must fail");
        assert_eq!(
            error,
            PipelineError::Upstream {
                service: "anthropic",
                detail: "no content in analysis response".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn regression_leading_non_text_block_is_upstream_error() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let client = ScriptedClient {
            content: vec![
                ContentBlock::Other {
                    kind: "thinking".to_string(),
                },
                ContentBlock::Text {
                    text: "Root cause: nil map".to_string(),
                },
            ],
            requests: requests.clone(),
        };

        let error = analyze_with_client(&client, &record(), &snapshot())
            .await
            .expect_err("must fail");

        assert_eq!(requests.lock().expect("requests lock").len(), 1);
        assert_eq!(
            error,
            PipelineError::Upstream {
                service: "anthropic",
                detail: "first content block of analysis response carries no text".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn regression_missing_api_key_is_config_error() {
        let analyzer = AnthropicAnalyzer::new(
            AnalyzerSettings {
                api_base: "http://127.0.0.1:9/v1".to_string(),
                api_key: Some(" ".to_string()),
            },
            None,
        );

        let error = analyzer
            .analyze(&record(), &snapshot())
            .await
            .expect_err("must fail");
        assert!(error.is_config());
    }

    #[tokio::test]
    async fn regression_unencodable_api_key_is_config_error() {
        let analyzer = AnthropicAnalyzer::new(
            AnalyzerSettings {
                api_base: "http://127.0.0.1:9/v1".to_string(),
                api_key: Some("sk-ant\u{7f}".to_string()),
            },
            None,
        );

        let error = analyzer
            .analyze(&record(), &snapshot())
            .await
            .expect_err("must fail");
        assert!(error.is_config(), "{error}");
    }

    #[tokio::test]
    async fn integration_non_success_status_surfaces_body_verbatim() {
        let server = MockServer::start();
        let messages = server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(400)
                .body(r#"{"type":"error","error":{"message":"prompt is too long"}}"#);
        });
        let analyzer = AnthropicAnalyzer::new(
            AnalyzerSettings {
                api_base: format!("{}/v1", server.base_url()),
                api_key: Some("sk-ant-test".to_string()),
            },
            None,
        );

        let error = analyzer
            .analyze(&record(), &snapshot())
            .await
            .expect_err("must fail");

        assert_eq!(messages.calls(), 1);
        let rendered = error.to_string();
        assert!(rendered.contains("status 400"));
        assert!(rendered.contains(r#"{"type":"error","error":{"message":"prompt is too long"}}"#));
    }

    #[tokio::test]
    async fn integration_success_returns_text_from_http_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "sk-ant-test")
                .body_includes("- Message: nil pointer");
            then.status(200).json_body(json!({
                "content": [{"type": "text", "text": "Check the handler"}]
            }));
        });
        let analyzer = AnthropicAnalyzer::new(
            AnalyzerSettings {
                api_base: format!("{}/v1", server.base_url()),
                api_key: Some("sk-ant-test".to_string()),
            },
            Some(5_000),
        );

        let analysis = analyzer
            .analyze(&record(), &snapshot())
            .await
            .expect("analysis");
        assert_eq!(analysis.as_str(), "Check the handler");
    }
}
