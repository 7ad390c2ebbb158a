//! Runs the configured stages in order and stops at the first failure.

use super::inputs::{ExportInput, PredictInput, PrepareInput, ReportInput, TrainInput};
use super::progress::{PipelineEvent, ProgressSink, TracingProgressSink};
use super::stage::{Stage, StageRecord};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, StageFailure};
use chrono::{DateTime, Utc};
use kestrel_dataset::{prepare_from_archive, PreparedDataset};
use kestrel_training::{
    package, DetectionEngine, ExportedArtifact, PredictionOutput, ReportOutput, ResultsTable, RunDirectory,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageRecord>,
    /// Manifest the training stage consumed.
    pub manifest: PathBuf,
    pub run_dir: PathBuf,
    /// Seed of the split, when PREPARE ran.
    pub seed: Option<u64>,
    pub prediction_dir: Option<PathBuf>,
    pub report_dirs: Vec<PathBuf>,
    pub artifact: Option<ExportedArtifact>,
}

impl PipelineReport {
    #[must_use]
    pub fn record(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == stage)
    }
}

pub struct Orchestrator {
    engine: Arc<dyn DetectionEngine>,
    progress: Arc<dyn ProgressSink>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(engine: Arc<dyn DetectionEngine>) -> Self {
        Self { engine, progress: Arc::new(TracingProgressSink) }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Run PREPARE → TRAIN → PREDICT → REPORT → EXPORT.
    ///
    /// PREPARE runs only with an archive configured; PREDICT and EXPORT can
    /// be disabled. The first failure ends the run and names its stage.
    pub async fn run(&self, config: &PipelineConfig) -> PipelineResult<PipelineReport> {
        config.validate()?;
        info!(engine = self.engine.id(), "starting pipeline");

        let mut log = StageLog::new(self.progress.as_ref());

        let prepared = match PrepareInput::from_config(config) {
            Some(input) => {
                let timer = log.start(Stage::Prepare);
                let result = prepare_from_archive(&input.archive, &input.out_dir, input.train_fraction, input.seed);
                Some(log.finish(timer, result)?)
            }
            None => {
                log.skip(Stage::Prepare, "no archive configured");
                None
            }
        };

        let train = TrainInput::assemble(config, prepared.as_ref())?;
        let timer = log.start(Stage::Train);
        let result = self.engine.train(&train.spec).await;
        let run = log.finish(timer, result)?;
        log_final_metrics(&run);

        let prediction = if config.predict.enabled {
            let timer = log.start(Stage::Predict);
            let result = self.predict(config, &run, prepared.as_ref()).await;
            Some(log.finish(timer, result)?)
        } else {
            log.skip(Stage::Predict, "disabled in configuration");
            None
        };

        let timer = log.start(Stage::Report);
        let result = self.report(config, &run, train.spec.manifest.clone()).await;
        let reports = log.finish(timer, result)?;

        let artifact = if config.export.enabled {
            let input = ExportInput::assemble(config, &run);
            let timer = log.start(Stage::Export);
            let result = package(&input.run_dir, &input.artifact_name, &input.output_dir);
            Some(log.finish(timer, result)?)
        } else {
            log.skip(Stage::Export, "disabled in configuration");
            None
        };

        info!(run_dir = %run.path.display(), "pipeline finished");

        Ok(PipelineReport {
            stages: log.records,
            manifest: train.spec.manifest,
            run_dir: run.path,
            seed: prepared.as_ref().map(|p| p.split.seed),
            prediction_dir: prediction.map(|p| p.output_dir),
            report_dirs: reports.into_iter().map(|r| r.output_dir).collect(),
            artifact,
        })
    }

    async fn predict(
        &self,
        config: &PipelineConfig,
        run: &RunDirectory,
        prepared: Option<&PreparedDataset>,
    ) -> kestrel_training::TrainingResult<PredictionOutput> {
        let input = PredictInput::assemble(config, run, prepared)?;
        self.engine.predict(&input.spec).await
    }

    /// Training curves, then the validation pass.
    async fn report(
        &self,
        config: &PipelineConfig,
        run: &RunDirectory,
        manifest: PathBuf,
    ) -> kestrel_training::TrainingResult<Vec<ReportOutput>> {
        let input = ReportInput::assemble(config, run, manifest)?;
        let curves = self.engine.report(&input.curves).await?;
        let validation = self.engine.report(&input.validation).await?;
        Ok(vec![curves, validation])
    }
}

fn log_final_metrics(run: &RunDirectory) {
    let table_path = run.layout().results_table();
    match ResultsTable::read(&table_path) {
        Ok(table) => {
            if let Some(m) = table.final_metrics() {
                info!(
                    epoch = m.epoch,
                    precision = ?m.precision,
                    recall = ?m.recall,
                    map50 = ?m.map50,
                    map50_95 = ?m.map50_95,
                    "final training metrics"
                );
            }
        }
        Err(e) => debug!(table = %table_path.display(), error = %e, "no results table to summarize"),
    }
}

struct StageTimer {
    stage: Stage,
    started_at: DateTime<Utc>,
    started: Instant,
}

/// Stage records plus progress events for one run.
struct StageLog<'a> {
    sink: &'a dyn ProgressSink,
    records: Vec<StageRecord>,
}

impl<'a> StageLog<'a> {
    fn new(sink: &'a dyn ProgressSink) -> Self {
        Self { sink, records: Vec::new() }
    }

    fn start(&self, stage: Stage) -> StageTimer {
        self.sink.on_event(PipelineEvent::StageStarted { stage });
        StageTimer { stage, started_at: Utc::now(), started: Instant::now() }
    }

    fn skip(&mut self, stage: Stage, reason: &str) {
        self.sink.on_event(PipelineEvent::StageSkipped { stage, reason: reason.to_string() });
        self.records.push(StageRecord::skipped(stage, reason));
    }

    fn finish<T, E>(&mut self, timer: StageTimer, result: Result<T, E>) -> PipelineResult<T>
    where
        E: Into<StageFailure>,
    {
        let StageTimer { stage, started_at, started } = timer;
        match result {
            Ok(value) => {
                let elapsed = started.elapsed();
                self.sink.on_event(PipelineEvent::StageFinished { stage, elapsed_ms: elapsed.as_millis() as u64 });
                self.records.push(StageRecord::completed(stage, started_at, elapsed));
                Ok(value)
            }
            Err(err) => {
                let failure: StageFailure = err.into();
                self.sink.on_event(PipelineEvent::StageFailed { stage, error: failure.to_string() });
                Err(PipelineError::stage(stage, failure))
            }
        }
    }
}
