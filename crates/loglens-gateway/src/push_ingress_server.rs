use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use loglens_pipeline::{decode_push_event, LogSeverity, PipelineLauncher};
use tokio::net::TcpListener;

pub const PUSH_ENDPOINT: &str = "/";
/// Push subscriptions may target any path on the service.
pub const PUSH_ENDPOINT_ANY_PATH: &str = "/{*path}";

/// Shared handler state. Holds no per-request data.
#[derive(Clone)]
pub struct PushIngressState {
    pub launcher: Arc<dyn PipelineLauncher>,
    /// Records ranked below this are acknowledged without launching a run.
    pub min_severity: Option<LogSeverity>,
}

impl PushIngressState {
    pub fn new(launcher: Arc<dyn PipelineLauncher>, min_severity: Option<LogSeverity>) -> Self {
        Self {
            launcher,
            min_severity,
        }
    }
}

/// `POST` on every path is routed; axum answers any other method with 405.
pub fn build_push_ingress_router(state: Arc<PushIngressState>) -> Router {
    Router::new()
        .route(PUSH_ENDPOINT, post(handle_push_event))
        .route(PUSH_ENDPOINT_ANY_PATH, post(handle_push_event))
        .with_state(state)
}

async fn handle_push_event(
    State(state): State<Arc<PushIngressState>>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let event = match decode_push_event(&body) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(
                reason_code = error.reason_code(),
                error = %error,
                "rejected push event"
            );
            return (StatusCode::BAD_REQUEST, "Bad request");
        }
    };

    let severity = event.record.severity_level();
    tracing::info!(
        severity = %event.record.severity,
        message_id = event.message_id.as_deref().unwrap_or(""),
        "received log entry"
    );

    if let Some(threshold) = state.min_severity {
        if !severity.meets(threshold) {
            tracing::debug!(%severity, %threshold, "log entry below severity threshold");
            return (StatusCode::OK, "OK");
        }
    }

    state.launcher.launch(event.record);
    (StatusCode::OK, "OK")
}

/// Binds `bind_addr` and serves until ctrl-c.
pub async fn run_push_ingress_server(bind_addr: SocketAddr, state: PushIngressState) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind push ingress server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound push ingress server address")?;
    tracing::info!(
        endpoint = PUSH_ENDPOINT,
        addr = %local_addr,
        min_severity = state.min_severity.map(LogSeverity::as_str).unwrap_or("none"),
        "push ingress server listening"
    );

    let app = build_push_ingress_router(Arc::new(state));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("push ingress server exited unexpectedly")
}
