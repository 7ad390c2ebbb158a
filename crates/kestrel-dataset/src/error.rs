use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("archive error: {0}")]
    Archive(String),

    #[error("invalid dataset structure: {0}")]
    DatasetStructure(String),

    #[error("no images found under {}", .0.display())]
    EmptyDataset(PathBuf),

    #[error("class list not found: {} (create it with one class name per line)", .0.display())]
    MissingClassList(PathBuf),

    #[error("invalid split ratio: {0} (must be in (0, 1))")]
    InvalidSplitRatio(f64),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DatasetError {
    #[must_use]
    pub fn archive(reason: impl Into<String>) -> Self {
        Self::Archive(reason.into())
    }

    #[must_use]
    pub fn structure(reason: impl Into<String>) -> Self {
        Self::DatasetStructure(reason.into())
    }
}

impl From<zip::result::ZipError> for DatasetError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

impl From<walkdir::Error> for DatasetError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.into())
    }
}
