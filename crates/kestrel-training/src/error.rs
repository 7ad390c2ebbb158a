use std::path::PathBuf;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("no best checkpoint under {0}")]
    MissingCheckpoint(PathBuf),

    #[error("{operation} failed: {message}")]
    Collaborator { operation: String, message: String },

    #[error("detection engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("invalid artifact name '{0}': must be non-empty and contain no path separators")]
    InvalidArtifactName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl TrainingError {
    pub fn collaborator(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator { operation: operation.into(), message: message.into() }
    }
}

impl From<walkdir::Error> for TrainingError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.into())
    }
}
