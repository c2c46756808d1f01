use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{LogRecord, PipelineOutcome, PipelineRuntime};

/// Hands a decoded record to the pipeline without waiting for it.
pub trait PipelineLauncher: Send + Sync {
    fn launch(&self, record: LogRecord);
}

/// Spawns one detached tokio task per record.
///
/// There is no cap on concurrently running tasks: every accepted event gets
/// its own run immediately.
#[derive(Clone)]
pub struct PipelineDispatcher {
    runtime: Arc<PipelineRuntime>,
}

impl PipelineDispatcher {
    pub fn new(runtime: Arc<PipelineRuntime>) -> Self {
        Self { runtime }
    }

    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, record: LogRecord) -> JoinHandle<PipelineOutcome> {
        let runtime = Arc::clone(&self.runtime);
        tokio::spawn(async move { runtime.run(record).await })
    }
}

impl PipelineLauncher for PipelineDispatcher {
    fn launch(&self, record: LogRecord) {
        drop(self.spawn(record));
    }
}
