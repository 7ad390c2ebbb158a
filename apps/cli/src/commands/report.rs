//! Report command implementation.

use anyhow::Context;
use colored::Colorize;
use kestrel_training::{DetectionEngine, ReportSpec, RunDirectory, UltralyticsEngine};
use std::path::{Path, PathBuf};

/// Chart the run's training curves; with a manifest, also run the validation pass.
pub async fn execute(
    yolo_bin: &Path,
    run_dir: &Path,
    manifest: Option<PathBuf>,
    out_dir: &Path,
    validation_name: &str,
) -> anyhow::Result<()> {
    let engine = UltralyticsEngine::new(yolo_bin);
    let layout = RunDirectory::new(run_dir.to_path_buf()).layout();

    let curves = engine
        .report(&ReportSpec::Curves { results_table: layout.results_table(), out_dir: out_dir.to_path_buf() })
        .await
        .context("failed to render training curves")?;
    println!("{} {} charts in {}", "✓ Curves:".green().bold(), curves.files.len(), curves.output_dir.display());

    if let Some(manifest) = manifest {
        let weights = layout.best_checkpoint().context("validation needs the run's best checkpoint")?;
        let validation = engine
            .report(&ReportSpec::Validation {
                weights,
                manifest,
                project: layout.task_dir().to_path_buf(),
                name: validation_name.to_string(),
            })
            .await
            .context("validation pass failed")?;
        println!("{} {}", "✓ Validation plots:".green().bold(), validation.output_dir.display());
    }
    Ok(())
}
