//! Kestrel CLI - Command-line interface for the Kestrel detection workflow
//!
//! Provides a `kestrel` command that prepares datasets, drives the detection
//! engine through training, prediction and reporting, and packages the
//! trained model.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Kestrel - object-detection workflow orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "kestrel",
    author,
    version,
    about = "Kestrel - prepare, train, evaluate and package object detectors",
    long_about = "Kestrel ingests a labeled-image archive, splits it into train/validation sets,\ndrives the Ultralytics engine through training, prediction and reporting, and\npackages the best checkpoint into a distributable archive."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Ultralytics executable
    #[arg(long, env = "KESTREL_YOLO_BIN", default_value = "yolo", global = true)]
    yolo_bin: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a dataset archive, split it and write data.yaml
    Prepare {
        /// Archive containing images/, labels/ and classes.txt
        #[arg(long, visible_alias = "zip")]
        archive: PathBuf,

        /// Output dataset directory
        #[arg(long, default_value = "data")]
        out: PathBuf,

        /// Fraction of images placed in the train split
        #[arg(long, visible_alias = "train-pct", default_value_t = 0.9)]
        train_fraction: f64,

        /// Shuffle seed (time-derived when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Train a detector on a prepared dataset
    Train {
        /// Path to data.yaml
        #[arg(long)]
        data: PathBuf,

        /// Checkpoint to start from
        #[arg(long, default_value = "yolo11s.pt")]
        model: String,

        /// Number of epochs
        #[arg(long, default_value_t = 60)]
        epochs: u32,

        /// Training resolution
        #[arg(long, default_value_t = 640)]
        imgsz: u32,

        /// Runs directory
        #[arg(long, default_value = "runs")]
        project: PathBuf,

        /// Run name under <project>/detect
        #[arg(long, default_value = "train")]
        name: String,
    },

    /// Run a trained detector over images
    Predict {
        /// Checkpoint to predict with
        #[arg(long)]
        weights: PathBuf,

        /// File or directory of images
        #[arg(long)]
        source: PathBuf,

        /// Save annotated outputs
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        save: bool,

        /// Prediction resolution
        #[arg(long, default_value_t = 640)]
        imgsz: u32,

        /// Runs directory
        #[arg(long, default_value = "runs")]
        project: PathBuf,

        /// Output directory name under the project
        #[arg(long, default_value = "predict")]
        name: String,
    },

    /// Chart training curves and run a validation pass
    Report {
        /// Training run directory, e.g. runs/detect/train
        #[arg(long)]
        run_dir: PathBuf,

        /// data.yaml for the validation pass; curves only when omitted
        #[arg(long)]
        data: Option<PathBuf>,

        /// Directory for the training curve charts
        #[arg(long, default_value = "artifacts/plots")]
        out_dir: PathBuf,

        /// Validation run name, created next to the training run
        #[arg(long, default_value = "val_plots")]
        validation_name: String,
    },

    /// Package a training run into <out-dir>/<name>.zip
    Export {
        /// Training run directory, e.g. runs/detect/train
        #[arg(long)]
        run_dir: PathBuf,

        /// Artifact base name
        #[arg(long, default_value = "my_model")]
        name: String,

        /// Output directory for the archive
        #[arg(long, default_value = "artifacts")]
        out_dir: PathBuf,
    },

    /// Run the whole pipeline from a configuration file
    Run {
        /// Configuration file (YAML, or TOML by extension)
        #[arg(short, long, env = "KESTREL_CONFIG", default_value = "config.yml")]
        config: PathBuf,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.without_time().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format)?;

    match args.command {
        Command::Prepare { archive, out, train_fraction, seed } => {
            commands::prepare::execute(&archive, &out, train_fraction, seed)
        }
        Command::Train { data, model, epochs, imgsz, project, name } => {
            let spec = kestrel_training::TrainSpec {
                manifest: data,
                checkpoint: model,
                epochs,
                image_size: imgsz,
                project,
                name,
            };
            commands::train::execute(&args.yolo_bin, spec).await
        }
        Command::Predict { weights, source, save, imgsz, project, name } => {
            let spec = kestrel_training::PredictSpec { weights, source, save, image_size: imgsz, project, name };
            commands::predict::execute(&args.yolo_bin, spec).await
        }
        Command::Report { run_dir, data, out_dir, validation_name } => {
            commands::report::execute(&args.yolo_bin, &run_dir, data, &out_dir, &validation_name).await
        }
        Command::Export { run_dir, name, out_dir } => commands::export::execute(&run_dir, &name, &out_dir),
        Command::Run { config, json } => commands::run::execute(&args.yolo_bin, &config, json).await,
    }
}
