//! Kestrel Training
//!
//! Detection-engine integration and run artifacts:
//! - The `DetectionEngine` capability trait and its stage specs
//! - The Ultralytics CLI engine (`UltralyticsEngine`)
//! - Run directory layout and checkpoint lookup (`RunLayout`)
//! - Results table parsing and SVG training curves
//! - Packaging a run into a distributable archive

pub mod charts;
pub mod engine;
pub mod error;
pub mod export;
pub mod layout;
pub mod results;
pub mod ultralytics;

pub use charts::{render_training_curves, ChartParams};
pub use engine::{DetectionEngine, PredictSpec, PredictionOutput, ReportOutput, ReportSpec, RunDirectory, TrainSpec};
pub use error::{TrainingError, TrainingResult};
pub use export::{package, ExportedArtifact, METADATA_WHITELIST};
pub use layout::RunLayout;
pub use results::{EpochMetrics, ResultsTable, Series, TRAINING_SERIES};
pub use ultralytics::UltralyticsEngine;
