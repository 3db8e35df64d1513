//! Lifecycle orchestration: train, evaluate, or retrain the head
//!
//! Two flags select one of three mutually exclusive paths. `load` decides
//! whether a persisted artifact is the starting point; only then does
//! `fit_classifier_only` matter, choosing between retraining the head and
//! scoring as-is. Execution is strictly sequential: one ingestion, at most
//! one blocking classifier call at a time, one score at the end. Each
//! dataset owns its own subdirectory under the save root; concurrent runs
//! against the same save path are unsupported.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use crate::classifier::{fit_with_params, ClassifierError, EncoderClassifier, FitError};
use crate::data::{self, IngestError, SourceFormat};
use crate::logging;
use crate::normalize::SkipList;
use crate::params::{Acceleration, HyperParams, SpecError};

/// Everything a run needs, as handed over by the CLI layer.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Dataset name; also the artifact subdirectory name
    pub dataset: String,
    /// Root directory the dataset files live under
    pub root: PathBuf,
    /// Root directory artifacts are saved under
    pub save_path: PathBuf,
    /// Hyperparameter file used by the train path
    pub hyper_path: PathBuf,
    /// Request hardware acceleration
    pub cuda: bool,
    /// Device index when acceleration is active
    pub gpu: usize,
    /// Start from a persisted artifact instead of training
    pub load: bool,
    /// With `load`: retrain only the classification head
    pub fit_classifier_only: bool,
}

impl RunOptions {
    fn save_dir(&self) -> PathBuf {
        self.save_path.join(&self.dataset)
    }

    fn artifact_path(&self) -> PathBuf {
        self.save_dir().join(format!("{}.model", self.dataset))
    }

    fn spec_path(&self) -> PathBuf {
        self.save_dir()
            .join(format!("{}_hyperparameters.json", self.dataset))
    }
}

/// The three mutually exclusive execution paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Fit end to end, persist artifact and effective spec, score
    Train,
    /// Load artifact, refit only the head, persist, score
    RetrainHead,
    /// Load artifact and score; no writes
    EvaluateOnly,
}

impl RunMode {
    /// Derive the path from the two flags. Retraining is only considered
    /// when `load` is set; without it the flags always mean a full training
    /// run.
    pub fn from_flags(load: bool, fit_classifier_only: bool) -> Self {
        if !load {
            RunMode::Train
        } else if fit_classifier_only {
            RunMode::RetrainHead
        } else {
            RunMode::EvaluateOnly
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Train => "train",
            RunMode::RetrainHead => "retrain-head",
            RunMode::EvaluateOnly => "evaluate-only",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: RunMode,
    /// Classification accuracy on the test split
    pub accuracy: f64,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
    pub elapsed: Duration,
    /// `(samples, channels, timesteps)` of the ingested train split
    pub train_shape: (usize, usize, usize),
    pub test_shape: (usize, usize, usize),
}

/// Errors raised anywhere along a run
#[derive(Debug)]
pub enum RunError {
    Ingest(IngestError),
    Spec(SpecError),
    Classifier(ClassifierError),
    Io(std::io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Ingest(err) => write!(f, "{err}"),
            RunError::Spec(err) => write!(f, "{err}"),
            RunError::Classifier(err) => write!(f, "{err}"),
            RunError::Io(err) => write!(f, "I/O error during run: {err}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Ingest(err) => Some(err),
            RunError::Spec(err) => Some(err),
            RunError::Classifier(err) => Some(err),
            RunError::Io(err) => Some(err),
        }
    }
}

impl From<IngestError> for RunError {
    fn from(err: IngestError) -> Self {
        RunError::Ingest(err)
    }
}

impl From<SpecError> for RunError {
    fn from(err: SpecError) -> Self {
        RunError::Spec(err)
    }
}

impl From<ClassifierError> for RunError {
    fn from(err: ClassifierError) -> Self {
        RunError::Classifier(err)
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        RunError::Io(err)
    }
}

impl From<FitError> for RunError {
    fn from(err: FitError) -> Self {
        match err {
            FitError::Spec(err) => RunError::Spec(err),
            FitError::Classifier(err) => RunError::Classifier(err),
        }
    }
}

/// Run the full lifecycle with the default normalization skip list.
pub fn run<C: EncoderClassifier>(
    format: SourceFormat,
    opts: &RunOptions,
) -> Result<RunReport, RunError> {
    run_with_skip_list::<C>(format, opts, &SkipList::default())
}

/// Run the full lifecycle: ingest, execute the selected path, score.
///
/// Writing paths persist the artifact and the effective specification under
/// `save_path/dataset/`; any failure aborts before those writes happen and
/// before any score is reported.
pub fn run_with_skip_list<C: EncoderClassifier>(
    format: SourceFormat,
    opts: &RunOptions,
    skip: &SkipList,
) -> Result<RunReport, RunError> {
    let started_at = SystemTime::now();
    let timer = Instant::now();
    let mode = RunMode::from_flags(opts.load, opts.fit_classifier_only);

    let accel = resolve_acceleration::<C>(opts);

    let splits = data::ingest_with_skip_list(format, &opts.root, &opts.dataset, skip)?;
    println!(
        "{}: train {:?}, test {:?}, {} classes",
        opts.dataset,
        splits.train.dim(),
        splits.test.dim(),
        splits.classes
    );
    if let Err(err) = logging::log_ingest(&opts.dataset, &format.to_string(), &splits) {
        eprintln!("failed to log ingestion for {}: {err}", opts.dataset);
    }

    let classifier = match mode {
        RunMode::Train => {
            let classifier: C = fit_with_params(
                &opts.hyper_path,
                &splits.train,
                &splits.train_labels,
                accel,
            )?;
            persist(&classifier, opts)?;
            classifier
        }
        RunMode::RetrainHead => {
            let mut classifier = load_classifier::<C>(opts, accel)?;
            let encoded = classifier.encode(&splits.train)?;
            classifier.fit_classifier(&encoded, &splits.train_labels)?;
            persist(&classifier, opts)?;
            classifier
        }
        RunMode::EvaluateOnly => load_classifier::<C>(opts, accel)?,
    };

    let accuracy = classifier.score(&splits.test, &splits.test_labels)?;
    let finished_at = SystemTime::now();
    let elapsed = timer.elapsed();

    println!("Test accuracy: {accuracy}");
    if let Err(err) = logging::log_run(&opts.dataset, mode.as_str(), accuracy, elapsed.as_millis())
    {
        eprintln!("failed to log run for {}: {err}", opts.dataset);
    }

    Ok(RunReport {
        mode,
        accuracy,
        started_at,
        finished_at,
        elapsed,
        train_shape: splits.train.dim(),
        test_shape: splits.test.dim(),
    })
}

/// Downgrade an acceleration request the classifier cannot honor. This
/// warns instead of failing, so the same invocation works on machines with
/// and without the hardware.
fn resolve_acceleration<C: EncoderClassifier>(opts: &RunOptions) -> Acceleration {
    if opts.cuda && !C::acceleration_available() {
        eprintln!("warning: acceleration requested but unavailable, continuing without it");
        return Acceleration {
            cuda: false,
            gpu: opts.gpu,
        };
    }
    Acceleration {
        cuda: opts.cuda,
        gpu: opts.gpu,
    }
}

/// Load the persisted specification and artifact for the two `load` paths.
fn load_classifier<C: EncoderClassifier>(
    opts: &RunOptions,
    accel: Acceleration,
) -> Result<C, RunError> {
    let spec = HyperParams::load(&opts.spec_path())?.with_acceleration(accel);
    Ok(C::load(&spec, &opts.artifact_path())?)
}

/// Persist the artifact and the classifier's effective parameters. Only the
/// writing paths call this, so an evaluate-only run never touches the save
/// root, not even to create the dataset subdirectory.
fn persist<C: EncoderClassifier>(classifier: &C, opts: &RunOptions) -> Result<(), RunError> {
    std::fs::create_dir_all(opts.save_dir())?;
    classifier.save(&opts.artifact_path())?;
    classifier.effective_params().save(&opts.spec_path())?;
    Ok(())
}
