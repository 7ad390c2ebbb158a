//! Train command implementation.

use anyhow::Context;
use colored::Colorize;
use kestrel_training::{DetectionEngine, ResultsTable, TrainSpec, UltralyticsEngine};
use std::path::Path;

pub async fn execute(yolo_bin: &Path, spec: TrainSpec) -> anyhow::Result<()> {
    let engine = UltralyticsEngine::new(yolo_bin);
    let run = engine.train(&spec).await.context("training failed")?;

    println!("{} {}", "✓ Training run:".green().bold(), run.path.display());

    let layout = run.layout();
    if let Ok(best) = layout.best_checkpoint() {
        println!("  best checkpoint: {}", best.display().to_string().cyan());
    }
    if let Ok(last) = layout.last_checkpoint() {
        println!("  last checkpoint: {}", last.display());
    }
    if let Some(metrics) = ResultsTable::read(&layout.results_table()).ok().and_then(|t| t.final_metrics()) {
        let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
        println!(
            "  epoch {}: precision {} recall {} mAP50 {} mAP50-95 {}",
            metrics.epoch,
            fmt(metrics.precision),
            fmt(metrics.recall),
            fmt(metrics.map50),
            fmt(metrics.map50_95)
        );
    }
    Ok(())
}
