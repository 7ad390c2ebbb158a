//! Run command implementation.

use anyhow::Context;
use colored::Colorize;
use kestrel_core::{Orchestrator, PipelineConfig, StageStatus};
use kestrel_training::UltralyticsEngine;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Execute the full pipeline described by `config_path`.
pub async fn execute(yolo_bin: &Path, config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = PipelineConfig::load(config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;
    debug!(config = %config_path.display(), ?config, "loaded configuration");

    let orchestrator = Orchestrator::new(Arc::new(UltralyticsEngine::new(yolo_bin)));
    let report = orchestrator.run(&config).await.context("pipeline failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Pipeline finished".bold().cyan());
    for record in &report.stages {
        let status = match record.status {
            StageStatus::Completed => format!("✓ {:<8}", record.stage).green(),
            StageStatus::Skipped => format!("- {:<8}", record.stage).dimmed(),
        };
        let detail = record
            .note
            .clone()
            .unwrap_or_else(|| format!("{:.1}s", record.elapsed.as_secs_f64()));
        println!("  {status} {detail}");
    }
    println!("  run directory: {}", report.run_dir.display());
    if let Some(artifact) = &report.artifact {
        println!("  artifact: {}", artifact.archive_path.display().to_string().cyan());
    }
    Ok(())
}
