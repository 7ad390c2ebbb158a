//! Archive → split → manifest, in one call.

use crate::error::{DatasetError, DatasetResult};
use crate::ingest;
use crate::manifest::{self, LabelFinding, Manifest, MANIFEST_FILE};
use crate::split::{self, SplitOutcome};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Scratch directory under the output root that receives the raw archive contents.
pub const EXTRACTION_DIR: &str = "_unzipped";

/// Everything the prepare step produced.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub split: SplitOutcome,
    pub label_findings: Vec<LabelFinding>,
}

impl PreparedDataset {
    /// Directory of validation images, used as the default prediction source.
    #[must_use]
    pub fn validation_images_dir(&self) -> PathBuf {
        self.manifest.val_images_dir()
    }
}

/// Extract `archive`, split it into `out_dir` and write `out_dir/data.yaml`.
///
/// The class list must exist at the detected dataset root; this is checked
/// before any split output is written. The extraction area is removed once
/// the manifest is on disk and left behind on failure for inspection.
pub fn prepare_from_archive(
    archive: &Path,
    out_dir: &Path,
    train_fraction: f64,
    seed: Option<u64>,
) -> DatasetResult<PreparedDataset> {
    split::SplitRatio::new(train_fraction)?;

    let extraction_dir = out_dir.join(EXTRACTION_DIR);
    if extraction_dir.exists() {
        std::fs::remove_dir_all(&extraction_dir)?;
    }

    let root = ingest::extract(archive, &extraction_dir)?;
    if root.is_fallback() {
        return Err(DatasetError::structure(format!(
            "{} contains no directory with both images/ and labels/",
            archive.display()
        )));
    }
    let class_list = root.class_list_path();
    if !class_list.is_file() {
        return Err(DatasetError::MissingClassList(class_list));
    }

    let split = split::split(&root.path, out_dir, train_fraction, seed)?;

    let manifest_path = out_dir.join(MANIFEST_FILE);
    let manifest = manifest::write_manifest(&manifest_path, out_dir, &class_list)?;
    let label_findings = manifest::audit_split_labels(&manifest)?;

    if let Err(e) = std::fs::remove_dir_all(&extraction_dir) {
        warn!(dir = %extraction_dir.display(), error = %e, "could not remove extraction area");
    }

    info!(
        manifest = %manifest_path.display(),
        train = split.train.len(),
        validation = split.validation.len(),
        missing_labels = split.missing_labels.len(),
        label_findings = label_findings.len(),
        seed = split.seed,
        "dataset prepared"
    );

    Ok(PreparedDataset { manifest_path, manifest, split, label_findings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn dataset_zip(path: &Path, images: usize, labels: usize, classes: Option<&str>) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        for i in 0..images {
            zip.start_file(format!("export/images/img_{i:03}.jpg"), options).unwrap();
            zip.write_all(b"jpeg").unwrap();
        }
        for i in 0..labels {
            zip.start_file(format!("export/labels/img_{i:03}.txt"), options).unwrap();
            zip.write_all(b"0 0.5 0.5 0.2 0.2\n").unwrap();
        }
        if let Some(classes) = classes {
            zip.start_file("export/classes.txt", options).unwrap();
            zip.write_all(classes.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_prepare_hundred_images() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("data.zip");
        dataset_zip(&archive, 100, 100, Some("drone\nbird\n"));

        let out = temp.path().join("data");
        let prepared = prepare_from_archive(&archive, &out, 0.9, Some(11)).unwrap();

        assert_eq!(prepared.split.train.len(), 90);
        assert_eq!(prepared.split.validation.len(), 10);
        assert_eq!(std::fs::read_dir(out.join("train/labels")).unwrap().count(), 90);
        assert_eq!(std::fs::read_dir(out.join("validation/images")).unwrap().count(), 10);
        assert_eq!(prepared.manifest.nc, 2);
        assert_eq!(prepared.manifest_path, out.join("data.yaml"));
        assert!(prepared.label_findings.is_empty());
        assert!(!out.join(EXTRACTION_DIR).exists());
    }

    #[test]
    fn test_prepare_with_missing_labels() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("data.zip");
        dataset_zip(&archive, 10, 8, Some("drone\n"));

        let out = temp.path().join("data");
        let prepared = prepare_from_archive(&archive, &out, 0.9, Some(3)).unwrap();

        assert_eq!(prepared.split.total(), 10);
        assert_eq!(prepared.split.missing_labels.len(), 2);
        assert!(prepared.manifest_path.is_file());
    }

    #[test]
    fn test_missing_class_list_stops_before_split() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("data.zip");
        dataset_zip(&archive, 4, 4, None);

        let out = temp.path().join("data");
        let err = prepare_from_archive(&archive, &out, 0.5, Some(1)).unwrap_err();

        assert!(matches!(err, DatasetError::MissingClassList(_)));
        assert!(!out.join("train").exists());
        assert!(!out.join("data.yaml").exists());
    }

    #[test]
    fn test_archive_without_dataset_root() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("photos.zip");
        let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
        zip.start_file("photos/a.jpg", zip::write::SimpleFileOptions::default()).unwrap();
        zip.write_all(b"jpeg").unwrap();
        zip.finish().unwrap();

        let out = temp.path().join("data");
        let err = prepare_from_archive(&archive, &out, 0.9, None).unwrap_err();

        assert!(matches!(err, DatasetError::DatasetStructure(_)));
        assert!(!out.join("train").exists());
    }

    #[test]
    fn test_invalid_fraction_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("data.zip");
        dataset_zip(&archive, 4, 4, Some("a\n"));

        let out = temp.path().join("data");
        let err = prepare_from_archive(&archive, &out, 1.0, None).unwrap_err();

        assert!(matches!(err, DatasetError::InvalidSplitRatio(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_out_of_range_class_ids_are_reported() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("data.zip");
        let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("images/a.png", options).unwrap();
        zip.write_all(b"png").unwrap();
        zip.start_file("labels/a.txt", options).unwrap();
        zip.write_all(b"5 0.5 0.5 0.1 0.1\n").unwrap();
        zip.start_file("classes.txt", options).unwrap();
        zip.write_all(b"only\n").unwrap();
        zip.finish().unwrap();

        let out = temp.path().join("data");
        let prepared = prepare_from_archive(&archive, &out, 0.5, Some(0)).unwrap();

        assert_eq!(prepared.label_findings.len(), 1);
        assert_eq!(prepared.label_findings[0].class_id, "5");
    }
}
