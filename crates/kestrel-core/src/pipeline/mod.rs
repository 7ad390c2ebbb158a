//! Stage sequencing for a full detection workflow run.

mod inputs;
mod orchestrator;
mod progress;
mod stage;

pub use inputs::{ExportInput, PredictInput, PrepareInput, ReportInput, TrainInput};
pub use orchestrator::{Orchestrator, PipelineReport};
pub use progress::{PipelineEvent, ProgressSink, TracingProgressSink};
pub use stage::{Stage, StageRecord, StageStatus};
