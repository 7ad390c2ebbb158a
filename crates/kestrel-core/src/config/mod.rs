//! Pipeline configuration.
//!
//! One document with the sections `data`, `train`, `predict`, `plots` and
//! `export`. Every field has a default, so an empty file is a valid config
//! as long as it names either an archive or a training manifest. Keys from
//! the older flat layout (`zip_path`, `train_pct`, `data_yaml`, `model`,
//! `imgsz`) are accepted as aliases.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Dataset preparation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Archive to prepare; when absent PREPARE is skipped.
    #[serde(default, alias = "zip_path")]
    pub archive_path: Option<PathBuf>,
    /// Destination of the split and the generated manifest.
    #[serde(default = "default_data_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_train_fraction", alias = "train_pct")]
    pub train_fraction: f64,
    /// Shuffle seed; a time-derived seed is used when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_data_out_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_train_fraction() -> f64 {
    0.9
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            archive_path: None,
            out_dir: default_data_out_dir(),
            train_fraction: default_train_fraction(),
            seed: None,
        }
    }
}

/// Training run settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Manifest used when no archive is prepared.
    #[serde(default, alias = "data_yaml")]
    pub manifest: Option<PathBuf>,
    #[serde(default = "default_checkpoint", alias = "model")]
    pub checkpoint: String,
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    #[serde(default = "default_image_size", alias = "imgsz")]
    pub image_size: u32,
    #[serde(default = "default_project")]
    pub project: PathBuf,
    #[serde(default = "default_run_name")]
    pub name: String,
}

fn default_checkpoint() -> String {
    "yolo11s.pt".to_string()
}

fn default_epochs() -> u32 {
    60
}

fn default_image_size() -> u32 {
    640
}

fn default_project() -> PathBuf {
    PathBuf::from("runs")
}

fn default_run_name() -> String {
    "train".to_string()
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            checkpoint: default_checkpoint(),
            epochs: default_epochs(),
            image_size: default_image_size(),
            project: default_project(),
            name: default_run_name(),
        }
    }
}

/// Prediction over the validation images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Save annotated images.
    #[serde(default = "default_true")]
    pub save: bool,
    /// Falls back to `train.image_size`.
    #[serde(default, alias = "imgsz")]
    pub image_size: Option<u32>,
    /// Falls back to the validation images of the prepared dataset.
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default = "default_project")]
    pub project: PathBuf,
    #[serde(default = "default_predict_name")]
    pub name: String,
}

fn default_true() -> bool {
    true
}

fn default_predict_name() -> String {
    "predict".to_string()
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            save: true,
            image_size: None,
            source: None,
            project: default_project(),
            name: default_predict_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotsConfig {
    #[serde(default = "default_plots_out_dir")]
    pub out_dir: PathBuf,
    /// Directory name of the validation run, created next to the training run.
    #[serde(default = "default_validation_name")]
    pub validation_name: String,
}

fn default_plots_out_dir() -> PathBuf {
    PathBuf::from("artifacts/plots")
}

fn default_validation_name() -> String {
    "val_plots".to_string()
}

impl Default for PlotsConfig {
    fn default() -> Self {
        Self { out_dir: default_plots_out_dir(), validation_name: default_validation_name() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_artifact_name")]
    pub name: String,
    #[serde(default = "default_export_out_dir")]
    pub out_dir: PathBuf,
}

fn default_artifact_name() -> String {
    "my_model".to_string()
}

fn default_export_out_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { enabled: true, name: default_artifact_name(), out_dir: default_export_out_dir() }
    }
}

/// Root configuration for a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub train: TrainConfig,
    #[serde(default)]
    pub predict: PredictConfig,
    #[serde(default)]
    pub plots: PlotsConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl PipelineConfig {
    /// Load from a YAML file, or TOML when the extension is `.toml`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        let is_toml = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            toml::from_str(&content).map_err(|e| e.to_string())
        } else {
            Self::from_yaml_str(&content)
        };

        parsed.map_err(|message| ConfigError::Parse { path: path.to_path_buf(), message })
    }

    fn from_yaml_str(content: &str) -> Result<Self, String> {
        // An empty YAML document is null, not an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    /// Image size used for prediction.
    #[must_use]
    pub fn predict_image_size(&self) -> u32 {
        self.predict.image_size.unwrap_or(self.train.image_size)
    }

    /// Check ranges and cross-section requirements before a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.data.train_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "data.train_fraction must be strictly between 0 and 1, got {fraction}"
            )));
        }
        if self.data.archive_path.is_none() && self.train.manifest.is_none() {
            return Err(ConfigError::Invalid(
                "either data.archive_path or train.manifest must be set".to_string(),
            ));
        }
        if self.train.checkpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("train.checkpoint must not be empty".to_string()));
        }
        if self.train.epochs == 0 {
            return Err(ConfigError::Invalid("train.epochs must be >= 1".to_string()));
        }
        if self.train.image_size == 0 || self.predict.image_size == Some(0) {
            return Err(ConfigError::Invalid("image sizes must be > 0".to_string()));
        }

        validate_name("train.name", &self.train.name)?;
        validate_name("predict.name", &self.predict.name)?;
        validate_name("plots.validation_name", &self.plots.validation_name)?;
        validate_name("export.name", &self.export.name)?;
        Ok(())
    }
}

fn validate_name(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() || value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ConfigError::Invalid(format!(
            "{key} must be a plain directory name, got '{value}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.data.out_dir, PathBuf::from("data"));
        assert!((config.data.train_fraction - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.train.checkpoint, "yolo11s.pt");
        assert_eq!(config.train.epochs, 60);
        assert_eq!(config.train.image_size, 640);
        assert_eq!(config.train.project, PathBuf::from("runs"));
        assert_eq!(config.train.name, "train");
        assert!(config.predict.enabled);
        assert!(config.predict.save);
        assert_eq!(config.predict.name, "predict");
        assert_eq!(config.plots.out_dir, PathBuf::from("artifacts/plots"));
        assert_eq!(config.plots.validation_name, "val_plots");
        assert!(config.export.enabled);
        assert_eq!(config.export.name, "my_model");
        assert_eq!(config.export.out_dir, PathBuf::from("artifacts"));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yml", "train:\n  manifest: data/data.yaml\n  epochs: 5\n");

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.train.epochs, 5);
        assert_eq!(config.train.image_size, 640);
        assert_eq!(config.export, ExportConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_legacy_keys() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.yml",
            r"
data:
  zip_path: data.zip
  out_dir: dataset
  train_pct: 0.8
train:
  data_yaml: dataset/data.yaml
  model: yolo11n.pt
  imgsz: 320
predict:
  imgsz: 416
",
        );

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.data.archive_path, Some(PathBuf::from("data.zip")));
        assert!((config.data.train_fraction - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.train.manifest, Some(PathBuf::from("dataset/data.yaml")));
        assert_eq!(config.train.checkpoint, "yolo11n.pt");
        assert_eq!(config.train.image_size, 320);
        assert_eq!(config.predict_image_size(), 416);
    }

    #[test]
    fn test_predict_image_size_falls_back_to_train() {
        let mut config = PipelineConfig::default();
        config.train.image_size = 512;
        assert_eq!(config.predict_image_size(), 512);
    }

    #[test]
    fn test_toml_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "kestrel.toml",
            "[data]\narchive_path = \"data.zip\"\nseed = 7\n\n[export]\nenabled = false\n",
        );

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.data.seed, Some(7));
        assert!(!config.export.enabled);
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yml", "\n");
        assert_eq!(PipelineConfig::load(&path).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::load(Path::new("/nonexistent/config.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yml", "train:\n  epochs: many\n");
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.yml"));
    }

    #[test]
    fn test_validate_requires_dataset_source() {
        let err = PipelineConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("archive_path"));
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = PipelineConfig::default();
        config.train.manifest = Some(PathBuf::from("data.yaml"));
        config.validate().unwrap();

        for fraction in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let mut bad = config.clone();
            bad.data.train_fraction = fraction;
            assert!(bad.validate().is_err(), "{fraction}");
        }

        let mut bad = config.clone();
        bad.train.epochs = 0;
        assert!(bad.validate().is_err());

        let mut bad = config;
        bad.export.name = "nested/name".to_string();
        assert!(bad.validate().is_err());
    }
}
