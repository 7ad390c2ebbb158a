//! Packaging a finished run into a distributable archive.

use crate::error::{TrainingError, TrainingResult};
use crate::layout::{RunLayout, RESULTS_TABLE, WEIGHTS_DIR};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// Run files copied next to the weights when present.
pub const METADATA_WHITELIST: [&str; 5] = ["results.png", RESULTS_TABLE, "hyp.yaml", "opt.yaml", "args.yaml"];

/// Result of packaging a run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedArtifact {
    pub archive_path: PathBuf,
    pub package_dir: PathBuf,
    pub weights_path: PathBuf,
    pub metadata: Vec<PathBuf>,
    /// SHA-256 of the archive, hex encoded.
    pub sha256: String,
}

/// Package `run_dir` as `output_dir/<artifact_name>.zip`.
///
/// The best checkpoint is resolved before anything under `output_dir` is
/// touched. A previous package directory or archive of the same name is replaced.
pub fn package(run_dir: &Path, artifact_name: &str, output_dir: &Path) -> TrainingResult<ExportedArtifact> {
    validate_artifact_name(artifact_name)?;

    let layout = RunLayout::from_run_dir(run_dir.to_path_buf());
    let best = layout.best_checkpoint()?;

    let package_dir = output_dir.join(artifact_name);
    if package_dir.exists() {
        debug!(dir = %package_dir.display(), "removing previous package directory");
        std::fs::remove_dir_all(&package_dir)?;
    }
    let weights_dir = package_dir.join(WEIGHTS_DIR);
    std::fs::create_dir_all(&weights_dir)?;

    let weights_name = match best.extension() {
        Some(ext) => format!("{artifact_name}.{}", ext.to_string_lossy()),
        None => artifact_name.to_string(),
    };
    let weights_path = weights_dir.join(weights_name);
    std::fs::copy(&best, &weights_path)?;

    let mut metadata = Vec::new();
    for name in METADATA_WHITELIST {
        let source = run_dir.join(name);
        if source.is_file() {
            let target = package_dir.join(name);
            std::fs::copy(&source, &target)?;
            metadata.push(target);
        }
    }

    let archive_path = output_dir.join(format!("{artifact_name}.zip"));
    write_archive(&package_dir, output_dir, &archive_path)?;
    let sha256 = sha256_file(&archive_path)?;

    info!(
        archive = %archive_path.display(),
        checkpoint = %best.display(),
        metadata = metadata.len(),
        sha256 = %sha256,
        "exported model artifact"
    );

    Ok(ExportedArtifact { archive_path, package_dir, weights_path, metadata, sha256 })
}

fn validate_artifact_name(name: &str) -> TrainingResult<()> {
    let invalid = name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name == "."
        || name == "..";
    if invalid {
        return Err(TrainingError::InvalidArtifactName(name.to_string()));
    }
    Ok(())
}

/// Deflate every file under `package_dir` into `archive_path`, entries relative to `base`.
fn write_archive(package_dir: &Path, base: &Path, archive_path: &Path) -> TrainingResult<()> {
    let mut zip = zip::ZipWriter::new(BufWriter::new(File::create(archive_path)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(package_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(base)
            .map_err(|e| TrainingError::Io(std::io::Error::other(e)))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(name, options)?;
        std::io::copy(&mut File::open(entry.path())?, &mut zip)?;
    }

    zip.finish()?.flush()?;
    Ok(())
}

pub fn sha256_file(path: &Path) -> TrainingResult<String> {
    let mut hasher = Sha256::new();
    std::io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
