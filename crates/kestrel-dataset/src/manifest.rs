//! Dataset manifest (`data.yaml`) consumed by the training engine.

use crate::error::{DatasetError, DatasetResult};
use crate::ingest::{IMAGES_DIR, LABELS_DIR};
use crate::split::{LABEL_EXTENSION, TRAIN_DIR, VALIDATION_DIR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = "data.yaml";

/// Dataset location, split subpaths and class taxonomy.
///
/// Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Absolute dataset root.
    pub path: PathBuf,
    /// Train images, relative to `path`.
    pub train: String,
    /// Validation images, relative to `path`.
    pub val: String,
    /// Class count.
    pub nc: usize,
    /// Class names; the index is the class id.
    pub names: Vec<String>,
}

impl Manifest {
    /// Manifest for a split materialized under `dataset_root`.
    #[must_use]
    pub fn for_split(dataset_root: PathBuf, names: Vec<String>) -> Self {
        Self {
            path: dataset_root,
            train: format!("{TRAIN_DIR}/{IMAGES_DIR}"),
            val: format!("{VALIDATION_DIR}/{IMAGES_DIR}"),
            nc: names.len(),
            names,
        }
    }

    pub fn validate(&self) -> DatasetResult<()> {
        if self.nc == 0 {
            return Err(DatasetError::InvalidManifest("nc must be >= 1".to_string()));
        }
        if self.nc != self.names.len() {
            return Err(DatasetError::InvalidManifest(format!(
                "nc is {} but {} class names are listed",
                self.nc,
                self.names.len()
            )));
        }
        if self.train.trim().is_empty() || self.val.trim().is_empty() {
            return Err(DatasetError::InvalidManifest("train and val paths are required".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn train_images_dir(&self) -> PathBuf {
        self.path.join(&self.train)
    }

    #[must_use]
    pub fn val_images_dir(&self) -> PathBuf {
        self.path.join(&self.val)
    }

    /// Scan label files under `labels_dir` for class ids outside `0..nc`.
    pub fn audit_labels(&self, labels_dir: &Path) -> DatasetResult<Vec<LabelFinding>> {
        let mut findings = Vec::new();
        if !labels_dir.is_dir() {
            return Ok(findings);
        }

        for entry in WalkDir::new(labels_dir).sort_by_file_name() {
            let entry = entry?;
            let is_label = entry.path().extension().is_some_and(|ext| ext == LABEL_EXTENSION);
            if !entry.file_type().is_file() || !is_label {
                continue;
            }

            let content = std::fs::read_to_string(entry.path())?;
            for (idx, line) in content.lines().enumerate() {
                let Some(token) = line.split_whitespace().next() else {
                    continue;
                };
                let in_range = token.parse::<usize>().is_ok_and(|id| id < self.nc);
                if !in_range {
                    findings.push(LabelFinding {
                        file: entry.path().to_path_buf(),
                        line: idx + 1,
                        class_id: token.to_string(),
                    });
                }
            }
        }

        Ok(findings)
    }
}

/// A label line whose class id is not a valid index into `names`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFinding {
    pub file: PathBuf,
    pub line: usize,
    pub class_id: String,
}

/// Read class names: one per line, trimmed, blank lines skipped.
pub fn read_class_names(class_list_path: &Path) -> DatasetResult<Vec<String>> {
    if !class_list_path.is_file() {
        return Err(DatasetError::MissingClassList(class_list_path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(class_list_path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}

/// Build the manifest for `dataset_root` from `class_list_path` and write it to `manifest_path`.
pub fn write_manifest(
    manifest_path: &Path,
    dataset_root: &Path,
    class_list_path: &Path,
) -> DatasetResult<Manifest> {
    let names = read_class_names(class_list_path)?;
    if names.is_empty() {
        return Err(DatasetError::InvalidManifest(format!(
            "class list {} contains no class names",
            class_list_path.display()
        )));
    }

    let manifest = Manifest::for_split(std::path::absolute(dataset_root)?, names);

    if let Some(parent) = manifest_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(manifest_path, serde_yaml::to_string(&manifest)?)?;

    info!(manifest = %manifest_path.display(), nc = manifest.nc, "wrote manifest");
    Ok(manifest)
}

/// Read and validate a manifest.
pub fn read_manifest(manifest_path: &Path) -> DatasetResult<Manifest> {
    let contents = std::fs::read_to_string(manifest_path)?;
    let manifest: Manifest = serde_yaml::from_str(&contents)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Audit both split label trees and log every finding.
pub fn audit_split_labels(manifest: &Manifest) -> DatasetResult<Vec<LabelFinding>> {
    let mut findings = Vec::new();
    for subset in [TRAIN_DIR, VALIDATION_DIR] {
        findings.extend(manifest.audit_labels(&manifest.path.join(subset).join(LABELS_DIR))?);
    }
    for finding in &findings {
        warn!(
            file = %finding.file.display(),
            line = finding.line,
            class_id = %finding.class_id,
            nc = manifest.nc,
            "label references a class id outside the class list"
        );
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_trims_and_skips_blanks() {
        let temp = TempDir::new().unwrap();
        let classes = temp.path().join("classes.txt");
        std::fs::write(&classes, "  car \n\n truck\n   \nbus\n").unwrap();

        let manifest_path = temp.path().join("data.yaml");
        let written = write_manifest(&manifest_path, temp.path(), &classes).unwrap();
        let read = read_manifest(&manifest_path).unwrap();

        assert_eq!(read, written);
        assert_eq!(read.nc, 3);
        assert_eq!(read.names, vec!["car", "truck", "bus"]);
        assert_eq!(read.train, "train/images");
        assert_eq!(read.val, "validation/images");
        assert!(read.path.is_absolute());
    }

    #[test]
    fn test_keys_are_written_in_stable_order() {
        let temp = TempDir::new().unwrap();
        let classes = temp.path().join("classes.txt");
        std::fs::write(&classes, "person\n").unwrap();

        let manifest_path = temp.path().join("data.yaml");
        write_manifest(&manifest_path, temp.path(), &classes).unwrap();
        let text = std::fs::read_to_string(&manifest_path).unwrap();

        let positions: Vec<usize> = ["path:", "train:", "val:", "nc:", "names:"]
            .iter()
            .map(|key| text.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_missing_class_list() {
        let temp = TempDir::new().unwrap();
        let err = write_manifest(
            &temp.path().join("data.yaml"),
            temp.path(),
            &temp.path().join("classes.txt"),
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::MissingClassList(_)));
        assert!(!temp.path().join("data.yaml").exists());
    }

    #[test]
    fn test_blank_class_list_rejected() {
        let temp = TempDir::new().unwrap();
        let classes = temp.path().join("classes.txt");
        std::fs::write(&classes, "\n  \n").unwrap();

        let err = write_manifest(&temp.path().join("data.yaml"), temp.path(), &classes).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidManifest(_)));
    }

    #[test]
    fn test_read_rejects_count_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.yaml");
        std::fs::write(&path, "path: /data\ntrain: train/images\nval: validation/images\nnc: 3\nnames: [a, b]\n")
            .unwrap();

        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidManifest(_)));
    }

    #[test]
    fn test_audit_flags_out_of_range_ids() {
        let temp = TempDir::new().unwrap();
        let labels = temp.path().join("train/labels");
        std::fs::create_dir_all(&labels).unwrap();
        std::fs::write(labels.join("a.txt"), "0 0.5 0.5 0.1 0.1\n2 0.5 0.5 0.1 0.1\n\nx 0.1 0.1 0.1 0.1\n").unwrap();

        let manifest = Manifest::for_split(temp.path().to_path_buf(), vec!["a".into(), "b".into()]);
        let findings = audit_split_labels(&manifest).unwrap();

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].line, 2);
        assert_eq!(findings[0].class_id, "2");
        assert_eq!(findings[1].line, 4);
    }
}
