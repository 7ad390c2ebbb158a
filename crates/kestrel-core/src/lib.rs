//! Kestrel Core
//!
//! Configuration and orchestration of the detection workflow. Dataset work
//! lives in `kestrel-dataset`, engine integration in `kestrel-training`.

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{DataConfig, ExportConfig, PipelineConfig, PlotsConfig, PredictConfig, TrainConfig};
pub use error::{ConfigError, PipelineError, PipelineResult, StageFailure};
pub use pipeline::{
    ExportInput, Orchestrator, PipelineEvent, PipelineReport, PredictInput, PrepareInput, ProgressSink,
    ReportInput, Stage, StageRecord, StageStatus, TracingProgressSink, TrainInput,
};

pub use kestrel_dataset as dataset;
pub use kestrel_training as training;
