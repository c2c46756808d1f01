use std::sync::Arc;

use anyhow::Result;
use loglens_cli::Cli;
use loglens_gateway::{run_push_ingress_server, PushIngressState};
use loglens_pipeline::{PipelineDispatcher, PipelineRuntime};

/// Wires the immutable configuration into the stages once; every accepted
/// push event is dispatched onto the shared runtime.
pub(crate) fn build_push_ingress_state(cli: &Cli) -> PushIngressState {
    let config = cli.to_pipeline_config();
    let runtime = Arc::new(PipelineRuntime::from_config(&config));
    PushIngressState::new(Arc::new(PipelineDispatcher::new(runtime)), cli.min_severity)
}

fn warn_on_missing_credentials(cli: &Cli) {
    let config = cli.to_pipeline_config();
    let checks = [
        ("slack", config.slack.credentials().err()),
        ("github", config.github.credentials().err()),
        ("anthropic", config.analyzer.api_key().err()),
    ];
    for (service, error) in checks {
        if let Some(error) = error {
            tracing::warn!(service, error = %error, "runs will abort until configured");
        }
    }
}

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let bind_addr = cli.bind_addr()?;
    warn_on_missing_credentials(&cli);
    run_push_ingress_server(bind_addr, build_push_ingress_state(&cli)).await
}
