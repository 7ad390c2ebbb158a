use super::stage::Stage;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted { stage: Stage },
    StageSkipped { stage: Stage, reason: String },
    StageFinished { stage: Stage, elapsed_ms: u64 },
    StageFailed { stage: Stage, error: String },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: PipelineEvent);
}

/// Forwards pipeline events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => info!(%stage, "stage started"),
            PipelineEvent::StageSkipped { stage, reason } => info!(%stage, %reason, "stage skipped"),
            PipelineEvent::StageFinished { stage, elapsed_ms } => info!(%stage, elapsed_ms, "stage finished"),
            PipelineEvent::StageFailed { stage, error } => error!(%stage, %error, "stage failed"),
        }
    }
}
