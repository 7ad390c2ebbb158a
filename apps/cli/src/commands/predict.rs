//! Predict command implementation.

use anyhow::Context;
use colored::Colorize;
use kestrel_training::{DetectionEngine, PredictSpec, UltralyticsEngine};
use std::path::Path;

pub async fn execute(yolo_bin: &Path, spec: PredictSpec) -> anyhow::Result<()> {
    let engine = UltralyticsEngine::new(yolo_bin);
    let output = engine
        .predict(&spec)
        .await
        .with_context(|| format!("prediction on {} failed", spec.source.display()))?;

    println!("{} {}", "✓ Predictions:".green().bold(), output.output_dir.display());
    Ok(())
}
