//! Export command implementation.

use anyhow::Context;
use colored::Colorize;
use kestrel_training::package;
use std::path::Path;

pub fn execute(run_dir: &Path, name: &str, out_dir: &Path) -> anyhow::Result<()> {
    let artifact = package(run_dir, name, out_dir)
        .with_context(|| format!("failed to export {}", run_dir.display()))?;

    println!("{} {}", "✓ Wrote artifacts to:".green().bold(), artifact.archive_path.display());
    println!("  sha256: {}", artifact.sha256.dimmed());
    Ok(())
}
