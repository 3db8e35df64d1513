//! Thin command-line runner: parse arguments, invoke the lifecycle, report
//! timing. All logic lives in `timeclass_core`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::UNIX_EPOCH;

use clap::{Parser, ValueEnum};

use timeclass_core::classifier::StatPoolClassifier;
use timeclass_core::data::SourceFormat;
use timeclass_core::lifecycle::{run, RunOptions};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Tab-separated single-channel archive
    Tabular,
    /// Attribute-relation multi-channel archive
    Multichannel,
}

impl From<Format> for SourceFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Tabular => SourceFormat::Tabular,
            Format::Multichannel => SourceFormat::MultiChannel,
        }
    }
}

/// Classification runs against benchmark time-series archives
#[derive(Debug, Parser)]
#[command(name = "timeclass", version, about)]
struct Cli {
    /// Dataset name
    #[arg(long)]
    dataset: String,

    /// On-disk format of the dataset
    #[arg(long, value_enum)]
    format: Format,

    /// Path where the dataset is located
    #[arg(long, default_value = "./")]
    path: PathBuf,

    /// Path where the estimator is/should be saved
    #[arg(long, default_value = "output")]
    save_path: PathBuf,

    /// Activate hardware acceleration
    #[arg(long)]
    cuda: bool,

    /// Index of the device used for computations
    #[arg(long, default_value_t = 0)]
    gpu: usize,

    /// Hyperparameter file (JSON) used for training
    #[arg(long, default_value = "config/default_hyperparameters.json")]
    hyper: PathBuf,

    /// Load the estimator instead of training it
    #[arg(long)]
    load: bool,

    /// With --load: retrain only the classifier head
    #[arg(long)]
    fit_classifier: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let opts = RunOptions {
        dataset: cli.dataset,
        root: cli.path,
        save_path: cli.save_path,
        hyper_path: cli.hyper,
        cuda: cli.cuda,
        gpu: cli.gpu,
        load: cli.load,
        fit_classifier_only: cli.fit_classifier,
    };

    match run::<StatPoolClassifier>(cli.format.into(), &opts) {
        Ok(report) => {
            let started = report
                .started_at
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            let finished = report
                .finished_at
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            println!("Run mode {}:", report.mode);
            println!("Start: {started} (unix)");
            println!("End: {finished} (unix)");
            println!("Took {:.3} seconds", report.elapsed.as_secs_f64());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
