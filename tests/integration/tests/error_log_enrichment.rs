use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use httpmock::prelude::*;
use httpmock::Mock;
use loglens_gateway::{build_push_ingress_router, PushIngressState, PUSH_ENDPOINT};
use loglens_pipeline::{
    encode_push_event, AnalyzerSettings, GithubSettings, LogRecord, PipelineConfig,
    PipelineDispatcher, PipelineLauncher, PipelineOutcome, PipelineRuntime, PipelineStage,
    SlackSettings,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

const ALERT_TEXT: &str =
    "*Error Log Detected*\n```\nSeverity: ERROR\nTimestamp: 2024-01-01T00:00:00Z\nPayload: nil pointer\n```";

/// Dispatches like production but hands every run's join handle back to the
/// test so it can wait for the detached pipeline to finish.
struct ObservedLauncher {
    dispatcher: PipelineDispatcher,
    runs: UnboundedSender<JoinHandle<PipelineOutcome>>,
}

impl PipelineLauncher for ObservedLauncher {
    fn launch(&self, record: LogRecord) {
        let _ = self.runs.send(self.dispatcher.spawn(record));
    }
}

struct Harness {
    addr: SocketAddr,
    runs: UnboundedReceiver<JoinHandle<PipelineOutcome>>,
    server: JoinHandle<()>,
}

impl Harness {
    async fn start(upstream: &MockServer) -> Result<Self> {
        let config = PipelineConfig {
            slack: SlackSettings {
                api_base: upstream.url("/slack"),
                bot_token: Some("xoxb-test".to_string()),
                channel: Some("C-ALERTS".to_string()),
            },
            github: GithubSettings {
                api_base: upstream.url("/github"),
                token: Some("ghp-test".to_string()),
                repository: Some("acme/payments".to_string()),
                branch: "main".to_string(),
            },
            analyzer: AnalyzerSettings {
                api_base: upstream.url("/anthropic/v1"),
                api_key: Some("sk-ant-test".to_string()),
            },
            request_timeout_ms: Some(5_000),
        };
        let (sender, runs) = unbounded_channel();
        let launcher = ObservedLauncher {
            dispatcher: PipelineDispatcher::new(Arc::new(PipelineRuntime::from_config(&config))),
            runs: sender,
        };
        let state = Arc::new(PushIngressState::new(Arc::new(launcher), None));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind ephemeral listener")?;
        let addr = listener.local_addr().context("resolve listener addr")?;
        let app = build_push_ingress_router(state);
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Self { addr, runs, server })
    }

    async fn push(&self, record: &LogRecord) -> Result<reqwest::Response> {
        let body = encode_push_event(record, &BTreeMap::new()).context("encode push event")?;
        reqwest::Client::new()
            .post(format!("http://{}{PUSH_ENDPOINT}", self.addr))
            .body(body)
            .send()
            .await
            .context("send push event")
    }

    async fn next_outcome(&mut self) -> PipelineOutcome {
        let run = self.runs.recv().await.expect("pipeline run launched");
        run.await.expect("pipeline run joined")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn error_record() -> LogRecord {
    LogRecord {
        severity: "ERROR".to_string(),
        text_payload: "nil pointer".to_string(),
        timestamp: "2024-01-01T00:00:00Z".to_string(),
        ..LogRecord::default()
    }
}

fn mock_alert<'a>(server: &'a MockServer, response: serde_json::Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/slack/chat.postMessage")
            .header("authorization", "Bearer xoxb-test")
            .json_body(json!({"channel": "C-ALERTS", "text": ALERT_TEXT}));
        then.status(200).json_body(response);
    })
}

fn mock_tree<'a>(server: &'a MockServer) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/github/repos/acme/payments/git/trees/main")
            .query_param("recursive", "1");
        then.status(200).json_body(json!({
            "tree": [
                {"path": "main.go", "type": "blob"},
                {"path": "go.sum", "type": "blob"},
                {"path": "assets", "type": "tree"}
            ],
            "truncated": false
        }));
    })
}

fn mock_main_go<'a>(server: &'a MockServer) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/github/repos/acme/payments/contents/main.go")
            .query_param("ref", "main");
        then.status(200).json_body(json!({
            "path": "main.go",
            "encoding": "base64",
            "content": "cGFja2FnZSBtYWlu\n"
        }));
    })
}

fn mock_analysis<'a>(server: &'a MockServer) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/anthropic/v1/messages")
            .header("x-api-key", "sk-ant-test")
            .header("anthropic-version", "2023-06-01")
            .body_includes("claude-sonnet-4-20250514")
            .body_includes("- Severity: ERROR")
            .body_includes("- Timestamp: 2024-01-01T00:00:00Z")
            .body_includes("- Message: nil pointer")
            .body_includes("## File: main.go");
        then.status(200).json_body(json!({
            "content": [{"type": "text", "text": "Root cause: nil map in handler"}],
            "stop_reason": "end_turn"
        }));
    })
}

#[tokio::test]
async fn integration_error_log_is_alerted_analyzed_and_answered_in_thread() {
    let upstream = MockServer::start();
    let alert = mock_alert(
        &upstream,
        json!({"ok": true, "channel": "C-ALERTS", "ts": "1700000000.000100"}),
    );
    let tree = mock_tree(&upstream);
    let main_go = mock_main_go(&upstream);
    let analysis = mock_analysis(&upstream);
    let reply = upstream.mock(|when, then| {
        when.method(POST).path("/slack/chat.postMessage").json_body(json!({
            "channel": "C-ALERTS",
            "text": "*Claude Analysis*\nRoot cause: nil map in handler",
            "thread_ts": "1700000000.000100"
        }));
        then.status(200)
            .json_body(json!({"ok": true, "channel": "C-ALERTS", "ts": "1700000000.000200"}));
    });
    let mut harness = Harness::start(&upstream).await.expect("start harness");

    let response = harness.push(&error_record()).await.expect("push");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "OK");

    assert_eq!(harness.next_outcome().await, PipelineOutcome::Completed);
    alert.assert();
    tree.assert();
    main_go.assert();
    analysis.assert();
    reply.assert();
}

#[tokio::test]
async fn integration_slack_rejection_stops_before_github_and_anthropic() {
    let upstream = MockServer::start();
    let alert = mock_alert(
        &upstream,
        json!({"ok": false, "error": "channel_not_found"}),
    );
    let tree = mock_tree(&upstream);
    let analysis = mock_analysis(&upstream);
    let mut harness = Harness::start(&upstream).await.expect("start harness");

    let response = harness.push(&error_record()).await.expect("push");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    match harness.next_outcome().await {
        PipelineOutcome::Aborted { stage, error } => {
            assert_eq!(stage, PipelineStage::Notifying);
            assert!(error.to_string().contains("channel_not_found"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(alert.calls(), 1);
    assert_eq!(tree.calls(), 0);
    assert_eq!(analysis.calls(), 0);
}

#[tokio::test]
async fn integration_tree_failure_stops_before_analysis_and_keeps_alert() {
    let upstream = MockServer::start();
    let alert = mock_alert(
        &upstream,
        json!({"ok": true, "channel": "C-ALERTS", "ts": "1700000000.000100"}),
    );
    let tree = upstream.mock(|when, then| {
        when.method(GET)
            .path("/github/repos/acme/payments/git/trees/main");
        then.status(404).body(r#"{"message":"Branch not found"}"#);
    });
    let analysis = mock_analysis(&upstream);
    let mut harness = Harness::start(&upstream).await.expect("start harness");

    harness.push(&error_record()).await.expect("push");

    assert!(matches!(
        harness.next_outcome().await,
        PipelineOutcome::Aborted {
            stage: PipelineStage::FetchingSnapshot,
            ..
        }
    ));
    assert_eq!(alert.calls(), 1);
    assert_eq!(tree.calls(), 1);
    assert_eq!(analysis.calls(), 0);
}

#[tokio::test]
async fn integration_malformed_push_is_rejected_without_any_upstream_call() {
    let upstream = MockServer::start();
    let alert = mock_alert(
        &upstream,
        json!({"ok": true, "channel": "C-ALERTS", "ts": "1"}),
    );
    let mut harness = Harness::start(&upstream).await.expect("start harness");

    let response = reqwest::Client::new()
        .post(format!("http://{}{PUSH_ENDPOINT}", harness.addr))
        .body(r#"{"message":{"data":"%%%"}}"#)
        .send()
        .await
        .expect("send push");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(harness.runs.try_recv().is_err());
    assert_eq!(alert.calls(), 0);
}
