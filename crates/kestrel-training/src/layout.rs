use crate::error::{TrainingError, TrainingResult};
use std::path::{Path, PathBuf};

pub const TASK_DIR: &str = "detect";
pub const WEIGHTS_DIR: &str = "weights";
pub const RESULTS_TABLE: &str = "results.csv";
const BEST_STEM: &str = "best";
const LAST_STEM: &str = "last";
const PREFERRED_EXTENSION: &str = "pt";

/// Filesystem layout of a single training run.
///
/// Runs live under `<project>/detect/<name>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    run_dir: PathBuf,
}

impl RunLayout {
    #[must_use]
    pub fn new(project: &Path, name: &str) -> Self {
        Self::from_run_dir(project.join(TASK_DIR).join(name))
    }

    #[must_use]
    pub fn from_run_dir(run_dir: PathBuf) -> Self {
        Self { run_dir }
    }

    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Directory the engine is told to write runs into (`<project>/detect`).
    #[must_use]
    pub fn task_dir(&self) -> &Path {
        self.run_dir.parent().unwrap_or(&self.run_dir)
    }

    #[must_use]
    pub fn weights_dir(&self) -> PathBuf {
        self.run_dir.join(WEIGHTS_DIR)
    }

    #[must_use]
    pub fn results_table(&self) -> PathBuf {
        self.run_dir.join(RESULTS_TABLE)
    }

    pub fn best_checkpoint(&self) -> TrainingResult<PathBuf> {
        find_checkpoint(&self.weights_dir(), BEST_STEM)
    }

    pub fn last_checkpoint(&self) -> TrainingResult<PathBuf> {
        find_checkpoint(&self.weights_dir(), LAST_STEM)
    }
}

/// `weights/<stem>.pt` if present, otherwise the first `<stem>.*` by name.
fn find_checkpoint(weights_dir: &Path, stem: &str) -> TrainingResult<PathBuf> {
    let preferred = weights_dir.join(format!("{stem}.{PREFERRED_EXTENSION}"));
    if preferred.is_file() {
        return Ok(preferred);
    }

    let Ok(entries) = std::fs::read_dir(weights_dir) else {
        return Err(TrainingError::MissingCheckpoint(weights_dir.to_path_buf()));
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches_stem = path.file_stem().is_some_and(|s| s == stem);
        if path.is_file() && matches_stem && path.extension().is_some() {
            candidates.push(path);
        }
    }
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| TrainingError::MissingCheckpoint(weights_dir.to_path_buf()))
}
