use thiserror::Error;

/// Upper bound on characters kept from an upstream error chain, which may
/// quote a whole response body.
pub const MAX_UPSTREAM_DETAIL_CHARS: usize = 800;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failure of a single pipeline stage. Never surfaced to the inbound caller.
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{service} upstream error: {detail}")]
    Upstream {
        service: &'static str,
        detail: String,
    },
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Flattens an upstream error chain into its detail string.
    pub fn upstream(service: &'static str, error: &anyhow::Error) -> Self {
        Self::Upstream {
            service,
            detail: truncate_for_error(&format!("{error:#}"), MAX_UPSTREAM_DETAIL_CHARS),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

fn truncate_for_error(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
