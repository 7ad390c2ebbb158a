//! Error types for Kestrel Core.

use crate::pipeline::Stage;
use kestrel_dataset::DatasetError;
use kestrel_training::TrainingError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read configuration file.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Invalid configuration value.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

/// Underlying cause of a stage failure.
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Training(#[from] TrainingError),
}

/// Core error type for pipeline runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage failed; the pipeline stopped there.
    #[error("stage '{stage}' failed")]
    Stage { stage: Stage, source: StageFailure },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub fn stage(stage: Stage, failure: impl Into<StageFailure>) -> Self {
        Self::Stage { stage, source: failure.into() }
    }

    /// The stage that failed, if the error came from one.
    #[must_use]
    pub const fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Config(_) => None,
        }
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
