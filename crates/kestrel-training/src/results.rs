//! Per-epoch results table written by the training engine.

use crate::error::TrainingResult;
use serde::Serialize;
use std::path::Path;

const EPOCH_COLUMN: &str = "epoch";
const BOX_SUFFIX: &str = "(B)";

/// A named column of the results table plotted against epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Series {
    pub label: &'static str,
    pub column: &'static str,
}

/// Metrics and losses charted after training.
pub const TRAINING_SERIES: [Series; 10] = [
    Series { label: "mAP50", column: "metrics/mAP50" },
    Series { label: "mAP50-95", column: "metrics/mAP50-95" },
    Series { label: "precision", column: "metrics/precision" },
    Series { label: "recall", column: "metrics/recall" },
    Series { label: "train_box_loss", column: "train/box_loss" },
    Series { label: "train_cls_loss", column: "train/cls_loss" },
    Series { label: "train_dfl_loss", column: "train/dfl_loss" },
    Series { label: "val_box_loss", column: "val/box_loss" },
    Series { label: "val_cls_loss", column: "val/cls_loss" },
    Series { label: "val_dfl_loss", column: "val/dfl_loss" },
];

#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

/// Headline metrics of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochMetrics {
    pub epoch: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub map50: Option<f64>,
    pub map50_95: Option<f64>,
}

impl ResultsTable {
    /// Parse a results CSV. Headers are trimmed; cells that are not numbers are kept absent.
    pub fn read(path: &Path) -> TrainingResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?;

        let headers = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.trim().parse::<f64>().ok()).collect());
        }

        Ok(Self { headers, rows })
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index for `name`, with or without the `(B)` suffix.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let suffixed = format!("{name}{BOX_SUFFIX}");
        self.headers.iter().position(|h| h == name || *h == suffixed)
    }

    /// Epoch of row `row`, falling back to its 1-based position.
    fn epoch_at(&self, row: usize) -> f64 {
        self.column_index(EPOCH_COLUMN)
            .and_then(|idx| self.rows[row].get(idx).copied().flatten())
            .unwrap_or((row + 1) as f64)
    }

    /// `(epoch, value)` points for `column`, skipping rows without a finite value.
    #[must_use]
    pub fn series(&self, column: &str) -> Vec<(f64, f64)> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };

        (0..self.rows.len())
            .filter_map(|row| {
                let value = self.rows[row].get(idx).copied().flatten()?;
                value.is_finite().then(|| (self.epoch_at(row), value))
            })
            .collect()
    }

    /// Metrics of the last recorded epoch.
    #[must_use]
    pub fn final_metrics(&self) -> Option<EpochMetrics> {
        let row = self.rows.len().checked_sub(1)?;
        let cell = |column: &str| {
            self.column_index(column)
                .and_then(|idx| self.rows[row].get(idx).copied().flatten())
                .filter(|value| value.is_finite())
        };

        Some(EpochMetrics {
            epoch: self.epoch_at(row),
            precision: cell("metrics/precision"),
            recall: cell("metrics/recall"),
            map50: cell("metrics/mAP50"),
            map50_95: cell("metrics/mAP50-95"),
        })
    }
}
