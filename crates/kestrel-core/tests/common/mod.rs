//! Shared fixtures for pipeline tests.

use async_trait::async_trait;
use kestrel_core::{PipelineConfig, PipelineEvent, ProgressSink};
use kestrel_training::{
    render_training_curves, DetectionEngine, PredictSpec, PredictionOutput, ReportOutput, ReportSpec,
    RunDirectory, TrainSpec, TrainingError, TrainingResult,
};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Zip with `export/images`, `export/labels` and `export/classes.txt`.
pub fn write_dataset_zip(path: &Path, images: usize, labels: usize, classes: &[&str]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    for i in 0..images {
        zip.start_file(format!("export/images/frame_{i:04}.jpg"), options).unwrap();
        zip.write_all(b"jpeg-bytes").unwrap();
    }
    for i in 0..labels {
        zip.start_file(format!("export/labels/frame_{i:04}.txt"), options).unwrap();
        zip.write_all(b"0 0.5 0.5 0.25 0.25\n").unwrap();
    }
    zip.start_file("export/classes.txt", options).unwrap();
    zip.write_all(classes.join("\n").as_bytes()).unwrap();
    zip.finish().unwrap();
}

/// Config with every output under `root`.
pub fn config_in(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.data.out_dir = root.join("data");
    config.data.seed = Some(42);
    config.train.project = root.join("runs");
    config.train.epochs = 3;
    config.predict.project = root.join("runs");
    config.plots.out_dir = root.join("artifacts/plots");
    config.export.out_dir = root.join("artifacts");
    config
}

/// Engine that fakes the files a real run leaves behind and records every call.
#[derive(Default)]
pub struct FakeEngine {
    pub calls: Mutex<Vec<String>>,
    pub train_specs: Mutex<Vec<TrainSpec>>,
    pub fail_train: bool,
}

impl FakeEngine {
    pub fn failing_train() -> Self {
        Self { fail_train: true, ..Self::default() }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl DetectionEngine for FakeEngine {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn train(&self, spec: &TrainSpec) -> TrainingResult<RunDirectory> {
        self.record("train");
        self.train_specs.lock().unwrap().push(spec.clone());
        if self.fail_train {
            return Err(TrainingError::collaborator("train", "engine exited with exit status: 1"));
        }

        let layout = spec.layout();
        std::fs::create_dir_all(layout.weights_dir())?;
        std::fs::write(layout.weights_dir().join("best.pt"), b"best")?;
        std::fs::write(layout.weights_dir().join("last.pt"), b"last")?;
        let mut table = String::from("epoch, train/box_loss, metrics/mAP50(B)\n");
        for epoch in 1..=spec.epochs {
            table.push_str(&format!("{epoch}, {}, {}\n", 2.0 / f64::from(epoch), 0.2 * f64::from(epoch)));
        }
        std::fs::write(layout.results_table(), table)?;
        std::fs::write(layout.run_dir().join("args.yaml"), format!("epochs: {}\n", spec.epochs))?;
        Ok(RunDirectory::new(layout.run_dir().to_path_buf()))
    }

    async fn predict(&self, spec: &PredictSpec) -> TrainingResult<PredictionOutput> {
        self.record("predict");
        std::fs::create_dir_all(spec.output_dir())?;
        Ok(PredictionOutput { output_dir: spec.output_dir() })
    }

    async fn report(&self, spec: &ReportSpec) -> TrainingResult<ReportOutput> {
        self.record(&format!("report:{}", spec.kind()));
        let files = match spec {
            ReportSpec::Curves { results_table, out_dir } => render_training_curves(results_table, out_dir)?,
            ReportSpec::Validation { .. } => {
                std::fs::create_dir_all(spec.output_dir())?;
                Vec::new()
            }
        };
        Ok(ReportOutput { output_dir: spec.output_dir(), files })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<PipelineEvent>>,
}

impl ProgressSink for RecordingSink {
    fn on_event(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
