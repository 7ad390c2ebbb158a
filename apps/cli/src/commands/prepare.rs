//! Prepare command implementation.

use anyhow::Context;
use colored::Colorize;
use kestrel_dataset::prepare_from_archive;
use std::path::Path;

/// Execute the prepare command.
///
/// Prints the manifest path on stdout so it can be piped into `kestrel train --data`.
pub fn execute(archive: &Path, out: &Path, train_fraction: f64, seed: Option<u64>) -> anyhow::Result<()> {
    let prepared = prepare_from_archive(archive, out, train_fraction, seed)
        .with_context(|| format!("failed to prepare dataset from {}", archive.display()))?;

    let split = &prepared.split;
    eprintln!(
        "{} {} train / {} validation (seed {})",
        "✓ Split".green().bold(),
        split.train.len(),
        split.validation.len(),
        split.seed
    );
    if !split.missing_labels.is_empty() {
        eprintln!("{}", format!("  {} images have no label file", split.missing_labels.len()).yellow());
    }
    if !prepared.label_findings.is_empty() {
        eprintln!(
            "{}",
            format!("  {} label lines reference unknown class ids", prepared.label_findings.len()).yellow()
        );
    }
    eprintln!("  classes: {}", prepared.manifest.names.join(", ").cyan());

    println!("{}", prepared.manifest_path.display());
    Ok(())
}
