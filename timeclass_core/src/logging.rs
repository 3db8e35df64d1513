//! JSON line-delimited run logging
//!
//! Every completed run appends one entry to `logs/runs.jsonl`, and every
//! ingestion one to `logs/ingest.jsonl`. Logging is best-effort: call sites
//! report a failure on stderr and continue, a lost log line never aborts a
//! run.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

fn log_dir() -> io::Result<()> {
    fs::create_dir_all("logs")
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[derive(Debug, Serialize)]
pub struct RunLogEntry {
    pub dataset: String,
    pub mode: String,
    pub accuracy: f64,
    pub elapsed_ms: u128,
    pub timestamp_ms: u128,
}

pub fn log_run(dataset: &str, mode: &str, accuracy: f64, elapsed_ms: u128) -> io::Result<()> {
    log_dir()?;
    let entry = RunLogEntry {
        dataset: dataset.to_string(),
        mode: mode.to_string(),
        accuracy,
        elapsed_ms,
        timestamp_ms: timestamp_ms(),
    };
    append_json_line("logs/runs.jsonl", &entry)
}

#[derive(Debug, Serialize)]
pub struct IngestLogEntry {
    pub dataset: String,
    pub format: String,
    pub train_samples: usize,
    pub test_samples: usize,
    pub channels: usize,
    pub timesteps: usize,
    pub classes: usize,
    pub timestamp_ms: u128,
}

pub fn log_ingest(dataset: &str, format: &str, splits: &crate::data::DatasetSplits) -> io::Result<()> {
    log_dir()?;
    let entry = IngestLogEntry {
        dataset: dataset.to_string(),
        format: format.to_string(),
        train_samples: splits.train.dim().0,
        test_samples: splits.test.dim().0,
        channels: splits.channels(),
        timesteps: splits.timesteps(),
        classes: splits.classes,
        timestamp_ms: timestamp_ms(),
    };
    append_json_line("logs/ingest.jsonl", &entry)
}
