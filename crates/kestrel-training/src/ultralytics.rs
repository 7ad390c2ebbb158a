//! Detection engine backed by the Ultralytics `yolo` command line.

use crate::charts::render_training_curves;
use crate::engine::{DetectionEngine, PredictSpec, PredictionOutput, ReportOutput, ReportSpec, RunDirectory, TrainSpec};
use crate::error::{TrainingError, TrainingResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_BINARY: &str = "yolo";
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct UltralyticsEngine {
    binary: PathBuf,
}

impl Default for UltralyticsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl UltralyticsEngine {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Locate the executable, either as given or on `PATH`.
    pub fn resolve_binary(&self) -> TrainingResult<PathBuf> {
        if self.binary.components().count() > 1 || self.binary.is_absolute() {
            return if self.binary.is_file() {
                Ok(self.binary.clone())
            } else {
                Err(TrainingError::EngineUnavailable(format!("{} does not exist", self.binary.display())))
            };
        }

        let path_var = std::env::var_os("PATH").unwrap_or_default();
        std::env::split_paths(&path_var)
            .flat_map(|dir| candidate_names(&self.binary).into_iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                TrainingError::EngineUnavailable(format!("'{}' not found on PATH", self.binary.display()))
            })
    }

    #[must_use]
    pub fn train_args(spec: &TrainSpec) -> Vec<String> {
        let layout = spec.layout();
        vec![
            "detect".to_string(),
            "train".to_string(),
            format!("data={}", spec.manifest.display()),
            format!("model={}", spec.checkpoint),
            format!("epochs={}", spec.epochs),
            format!("imgsz={}", spec.image_size),
            format!("project={}", layout.task_dir().display()),
            format!("name={}", spec.name),
            "exist_ok=True".to_string(),
        ]
    }

    #[must_use]
    pub fn predict_args(spec: &PredictSpec) -> Vec<String> {
        vec![
            "detect".to_string(),
            "predict".to_string(),
            format!("model={}", spec.weights.display()),
            format!("source={}", spec.source.display()),
            format!("save={}", python_bool(spec.save)),
            format!("imgsz={}", spec.image_size),
            format!("project={}", spec.project.display()),
            format!("name={}", spec.name),
            "exist_ok=True".to_string(),
        ]
    }

    #[must_use]
    pub fn validation_args(weights: &Path, manifest: &Path, project: &Path, name: &str) -> Vec<String> {
        vec![
            "detect".to_string(),
            "val".to_string(),
            format!("model={}", weights.display()),
            format!("data={}", manifest.display()),
            "plots=True".to_string(),
            format!("project={}", project.display()),
            format!("name={name}"),
            "exist_ok=True".to_string(),
        ]
    }

    /// Run the engine to completion, forwarding its output to tracing.
    async fn invoke(&self, operation: &str, args: Vec<String>) -> TrainingResult<()> {
        let binary = self.resolve_binary()?;
        info!(operation, binary = %binary.display(), args = %args.join(" "), "invoking detection engine");

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TrainingError::EngineUnavailable(format!("failed to start {}: {e}", binary.display())))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let forward_stdout = async {
            if let Some(stdout) = stdout {
                forward_lines(stdout, operation, "stdout", 0).await;
            }
        };
        let forward_stderr = async {
            match stderr {
                Some(stderr) => forward_lines(stderr, operation, "stderr", STDERR_TAIL_LINES).await,
                None => VecDeque::new(),
            }
        };

        let ((), tail, status) = tokio::join!(forward_stdout, forward_stderr, child.wait());
        let status = status?;

        if !status.success() {
            let tail: Vec<String> = tail.into_iter().collect();
            return Err(TrainingError::collaborator(
                operation,
                format!("engine exited with {status}; stderr tail:\n{}", tail.join("\n")),
            ));
        }

        debug!(operation, "detection engine finished");
        Ok(())
    }
}

#[async_trait]
impl DetectionEngine for UltralyticsEngine {
    fn id(&self) -> &'static str {
        "ultralytics"
    }

    async fn train(&self, spec: &TrainSpec) -> TrainingResult<RunDirectory> {
        self.invoke("train", Self::train_args(spec)).await?;

        let run_dir = spec.layout().run_dir().to_path_buf();
        if !run_dir.is_dir() {
            return Err(TrainingError::collaborator(
                "train",
                format!("engine reported success but {} was not created", run_dir.display()),
            ));
        }
        Ok(RunDirectory::new(run_dir))
    }

    async fn predict(&self, spec: &PredictSpec) -> TrainingResult<PredictionOutput> {
        self.invoke("predict", Self::predict_args(spec)).await?;
        Ok(PredictionOutput { output_dir: spec.output_dir() })
    }

    async fn report(&self, spec: &ReportSpec) -> TrainingResult<ReportOutput> {
        match spec {
            ReportSpec::Curves { results_table, out_dir } => {
                let files = render_training_curves(results_table, out_dir)?;
                Ok(ReportOutput { output_dir: out_dir.clone(), files })
            }
            ReportSpec::Validation { weights, manifest, project, name } => {
                self.invoke("validate", Self::validation_args(weights, manifest, project, name)).await?;
                Ok(ReportOutput { output_dir: spec.output_dir(), files: Vec::new() })
            }
        }
    }
}

const fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Log each line of `reader` until EOF, keeping the last `keep` lines.
///
/// Output is decoded lossily. On a read error the pipe is still drained so the
/// engine never sees a closed stream.
async fn forward_lines<R>(reader: R, operation: &str, stream: &str, keep: usize) -> VecDeque<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut tail = VecDeque::with_capacity(keep);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                info!(operation, stream, "{line}");
                if keep > 0 {
                    if tail.len() == keep {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }
            }
            Err(e) => {
                warn!(operation, stream, error = %e, "could not read engine output; discarding the rest");
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    debug!(operation, stream, error = %e, "engine output drain stopped");
                }
                break;
            }
        }
    }
    tail
}

fn candidate_names(binary: &Path) -> Vec<OsString> {
    let mut names = vec![binary.as_os_str().to_owned()];
    if cfg!(windows) && binary.extension().is_none() {
        let mut exe = binary.as_os_str().to_owned();
        exe.push(".exe");
        names.push(exe);
    }
    names
}
