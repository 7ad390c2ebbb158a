//! Stage inputs.
//!
//! Each stage gets its own immutable value built from the configuration and
//! the outputs of earlier stages. The configuration is never written back.

use crate::config::PipelineConfig;
use crate::error::{ConfigError, PipelineError, PipelineResult};
use kestrel_dataset::{PreparedDataset, SplitLayout, Subset};
use kestrel_training::{PredictSpec, ReportSpec, RunDirectory, TrainSpec, TrainingResult};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareInput {
    pub archive: PathBuf,
    pub out_dir: PathBuf,
    pub train_fraction: f64,
    pub seed: Option<u64>,
}

impl PrepareInput {
    /// `None` when no archive is configured.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Option<Self> {
        let archive = config.data.archive_path.clone()?;
        Some(Self {
            archive,
            out_dir: config.data.out_dir.clone(),
            train_fraction: config.data.train_fraction,
            seed: config.data.seed,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainInput {
    pub spec: TrainSpec,
}

impl TrainInput {
    /// The prepared manifest wins over `train.manifest`.
    pub fn assemble(config: &PipelineConfig, prepared: Option<&PreparedDataset>) -> PipelineResult<Self> {
        let manifest = match prepared {
            Some(prepared) => prepared.manifest_path.clone(),
            None => config.train.manifest.clone().ok_or_else(|| {
                PipelineError::from(ConfigError::Invalid(
                    "train.manifest is required when no archive is prepared".to_string(),
                ))
            })?,
        };

        Ok(Self {
            spec: TrainSpec {
                manifest,
                checkpoint: config.train.checkpoint.clone(),
                epochs: config.train.epochs,
                image_size: config.train.image_size,
                project: config.train.project.clone(),
                name: config.train.name.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictInput {
    pub spec: PredictSpec,
}

impl PredictInput {
    /// Predict with the run's best checkpoint.
    ///
    /// The source is `predict.source`, else the prepared validation images,
    /// else `data.out_dir/validation/images`.
    pub fn assemble(
        config: &PipelineConfig,
        run: &RunDirectory,
        prepared: Option<&PreparedDataset>,
    ) -> TrainingResult<Self> {
        let weights = run.layout().best_checkpoint()?;
        let source = config
            .predict
            .source
            .clone()
            .or_else(|| prepared.map(PreparedDataset::validation_images_dir))
            .unwrap_or_else(|| SplitLayout::new(config.data.out_dir.clone()).images_dir(Subset::Validation));

        Ok(Self {
            spec: PredictSpec {
                weights,
                source,
                save: config.predict.save,
                image_size: config.predict_image_size(),
                project: config.predict.project.clone(),
                name: config.predict.name.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportInput {
    pub curves: ReportSpec,
    pub validation: ReportSpec,
}

impl ReportInput {
    /// Curves go to `plots.out_dir`; the validation run sits next to the training run.
    pub fn assemble(config: &PipelineConfig, run: &RunDirectory, manifest: PathBuf) -> TrainingResult<Self> {
        let layout = run.layout();
        let weights = layout.best_checkpoint()?;

        Ok(Self {
            curves: ReportSpec::Curves { results_table: layout.results_table(), out_dir: config.plots.out_dir.clone() },
            validation: ReportSpec::Validation {
                weights,
                manifest,
                project: layout.task_dir().to_path_buf(),
                name: config.plots.validation_name.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInput {
    pub run_dir: PathBuf,
    pub artifact_name: String,
    pub output_dir: PathBuf,
}

impl ExportInput {
    #[must_use]
    pub fn assemble(config: &PipelineConfig, run: &RunDirectory) -> Self {
        Self {
            run_dir: run.path.clone(),
            artifact_name: config.export.name.clone(),
            output_dir: config.export.out_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run_with_best(root: &std::path::Path) -> RunDirectory {
        let run = root.join("runs/detect/train");
        std::fs::create_dir_all(run.join("weights")).unwrap();
        std::fs::write(run.join("weights/best.pt"), b"w").unwrap();
        RunDirectory::new(run)
    }

    #[test]
    fn test_prepare_skipped_without_archive() {
        assert!(PrepareInput::from_config(&PipelineConfig::default()).is_none());
    }

    #[test]
    fn test_configured_manifest_used_unchanged() {
        let mut config = PipelineConfig::default();
        config.train.manifest = Some(PathBuf::from("custom/data.yaml"));

        let input = TrainInput::assemble(&config, None).unwrap();
        assert_eq!(input.spec.manifest, PathBuf::from("custom/data.yaml"));
        assert_eq!(config.train.manifest, Some(PathBuf::from("custom/data.yaml")));
    }

    #[test]
    fn test_prepared_manifest_wins() {
        let temp = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.train.manifest = Some(PathBuf::from("ignored.yaml"));

        let classes = temp.path().join("classes.txt");
        std::fs::write(&classes, "a\n").unwrap();
        let manifest_path = temp.path().join("data.yaml");
        let manifest = kestrel_dataset::write_manifest(&manifest_path, temp.path(), &classes).unwrap();
        let prepared = PreparedDataset {
            manifest_path: manifest_path.clone(),
            manifest,
            split: kestrel_dataset::SplitOutcome {
                train_dir: temp.path().join("train"),
                validation_dir: temp.path().join("validation"),
                train: Vec::new(),
                validation: Vec::new(),
                missing_labels: Vec::new(),
                seed: 0,
            },
            label_findings: Vec::new(),
        };

        let input = TrainInput::assemble(&config, Some(&prepared)).unwrap();
        assert_eq!(input.spec.manifest, manifest_path);
        assert_eq!(config.train.manifest, Some(PathBuf::from("ignored.yaml")));
    }

    #[test]
    fn test_predict_defaults() {
        let temp = TempDir::new().unwrap();
        let run = run_with_best(temp.path());
        let config = PipelineConfig::default();

        let input = PredictInput::assemble(&config, &run, None).unwrap();
        assert_eq!(input.spec.weights, run.path.join("weights/best.pt"));
        assert_eq!(input.spec.source, PathBuf::from("data/validation/images"));
        assert_eq!(input.spec.image_size, 640);
        assert_eq!(input.spec.project.join(&input.spec.name), PathBuf::from("runs/predict"));
    }

    #[test]
    fn test_predict_without_checkpoint_fails() {
        let temp = TempDir::new().unwrap();
        let run = RunDirectory::new(temp.path().join("runs/detect/train"));
        assert!(PredictInput::assemble(&PipelineConfig::default(), &run, None).is_err());
    }

    #[test]
    fn test_report_locations() {
        let temp = TempDir::new().unwrap();
        let run = run_with_best(temp.path());
        let input = ReportInput::assemble(&PipelineConfig::default(), &run, PathBuf::from("data.yaml")).unwrap();

        assert_eq!(input.curves.output_dir(), PathBuf::from("artifacts/plots"));
        assert_eq!(input.validation.output_dir(), temp.path().join("runs/detect/val_plots"));
    }
}
