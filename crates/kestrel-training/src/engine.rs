use crate::error::TrainingResult;
use crate::layout::RunLayout;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inputs for a training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainSpec {
    pub manifest: PathBuf,
    /// Base checkpoint, either a file path or a name the engine can resolve.
    pub checkpoint: String,
    pub epochs: u32,
    pub image_size: u32,
    pub project: PathBuf,
    pub name: String,
}

impl TrainSpec {
    /// Where the engine is expected to leave this run.
    #[must_use]
    pub fn layout(&self) -> RunLayout {
        RunLayout::new(&self.project, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictSpec {
    pub weights: PathBuf,
    pub source: PathBuf,
    pub save: bool,
    pub image_size: u32,
    pub project: PathBuf,
    pub name: String,
}

impl PredictSpec {
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.project.join(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportSpec {
    /// Per-metric line charts from a run's results table.
    Curves { results_table: PathBuf, out_dir: PathBuf },
    /// Validation pass with confusion matrix and PR curves.
    Validation { weights: PathBuf, manifest: PathBuf, project: PathBuf, name: String },
}

impl ReportSpec {
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        match self {
            Self::Curves { out_dir, .. } => out_dir.clone(),
            Self::Validation { project, name, .. } => project.join(name),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Curves { .. } => "curves",
            Self::Validation { .. } => "validation",
        }
    }
}

/// A finished training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    pub path: PathBuf,
}

impl RunDirectory {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn layout(&self) -> RunLayout {
        RunLayout::from_run_dir(self.path.clone())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionOutput {
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutput {
    pub output_dir: PathBuf,
    /// Files the report produced, when the engine knows them.
    pub files: Vec<PathBuf>,
}

/// Training, prediction and reporting capabilities of a detection backend.
#[async_trait]
pub trait DetectionEngine: Send + Sync {
    fn id(&self) -> &'static str;

    async fn train(&self, spec: &TrainSpec) -> TrainingResult<RunDirectory>;

    async fn predict(&self, spec: &PredictSpec) -> TrainingResult<PredictionOutput>;

    async fn report(&self, spec: &ReportSpec) -> TrainingResult<ReportOutput>;
}
