//! Classifier collaborator contract
//!
//! The learning algorithm itself is a black box behind [`EncoderClassifier`]:
//! the orchestrator only relies on construct / fit / encode / fit-head /
//! score / save / load and the effective parameters after fitting. A CPU
//! reference implementation lives in [`stat_pool`]; anything honoring the
//! trait can be dropped in instead.

pub mod stat_pool;

use std::fmt;
use std::path::Path;

use ndarray::{Array2, Array3};

use crate::params::{Acceleration, HyperParams, SpecError};

pub use stat_pool::StatPoolClassifier;

/// Result type alias for classifier operations
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Errors raised by a classifier implementation
#[derive(Debug)]
pub enum ClassifierError {
    /// I/O failure while reading or writing the persisted artifact
    Io(std::io::Error),
    /// Serialization failure in the artifact codec
    Serialization(bincode::Error),
    /// The artifact was written by an incompatible version of the codec
    VersionMismatch { expected: u32, found: u32 },
    /// The artifact's shape disagrees with the provided specification
    ShapeMismatch { expected: String, found: String },
    /// An operation that needs a fitted model ran before fitting
    NotFitted { operation: String },
    /// Inputs to fit/score are unusable (empty split, label out of range)
    InvalidInput { details: String },
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierError::Io(err) => write!(f, "I/O error while accessing artifact: {err}"),
            ClassifierError::Serialization(err) => {
                write!(f, "Failed to (de)serialize artifact: {err}")
            }
            ClassifierError::VersionMismatch { expected, found } => write!(
                f,
                "Artifact version mismatch: expected {expected}, found {found}",
            ),
            ClassifierError::ShapeMismatch { expected, found } => {
                write!(f, "Artifact shape mismatch: expected {expected}, found {found}")
            }
            ClassifierError::NotFitted { operation } => {
                write!(f, "Cannot {operation}: classifier has not been fitted")
            }
            ClassifierError::InvalidInput { details } => write!(f, "Invalid input: {details}"),
        }
    }
}

impl std::error::Error for ClassifierError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClassifierError::Io(err) => Some(err),
            ClassifierError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClassifierError {
    fn from(err: std::io::Error) -> Self {
        ClassifierError::Io(err)
    }
}

impl From<bincode::Error> for ClassifierError {
    fn from(err: bincode::Error) -> Self {
        ClassifierError::Serialization(err)
    }
}

/// The contract the lifecycle orchestrator depends on.
///
/// `encode` must be usable on a loaded model without refitting, and
/// `fit_classifier` must retrain only the classification head on already
/// encoded representations, leaving the encoder frozen.
pub trait EncoderClassifier: Sized {
    /// Construct an unfitted instance from a frozen specification.
    fn from_spec(spec: &HyperParams) -> ClassifierResult<Self>;

    /// Fit end to end on `(samples, channels, timesteps)` features and dense
    /// labels. `save_memory` trades speed for a smaller working set;
    /// `verbose` enables progress reporting.
    fn fit(
        &mut self,
        train: &Array3<f64>,
        labels: &[usize],
        save_memory: bool,
        verbose: bool,
    ) -> ClassifierResult<()>;

    /// Encode features through the (possibly frozen) encoder.
    fn encode(&self, data: &Array3<f64>) -> ClassifierResult<Array2<f64>>;

    /// Retrain only the classification head on encoded representations.
    fn fit_classifier(&mut self, encoded: &Array2<f64>, labels: &[usize]) -> ClassifierResult<()>;

    /// Classification accuracy on a labeled split.
    fn score(&self, data: &Array3<f64>, labels: &[usize]) -> ClassifierResult<f64>;

    /// Persist the opaque artifact at `path`. All-or-nothing: a failed save
    /// leaves no usable artifact behind.
    fn save(&self, path: &Path) -> ClassifierResult<()>;

    /// Restore an instance from a persisted artifact and its specification.
    fn load(spec: &HyperParams, path: &Path) -> ClassifierResult<Self>;

    /// The parameters actually in effect, defaults filled in. This is what
    /// gets persisted next to the artifact.
    fn effective_params(&self) -> HyperParams;

    /// Whether this implementation can honor an acceleration request.
    fn acceleration_available() -> bool;
}

/// Errors raised by the hyperparameter-driven fitter
#[derive(Debug)]
pub enum FitError {
    Spec(SpecError),
    Classifier(ClassifierError),
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitError::Spec(err) => write!(f, "{err}"),
            FitError::Classifier(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FitError::Spec(err) => Some(err),
            FitError::Classifier(err) => Some(err),
        }
    }
}

impl From<SpecError> for FitError {
    fn from(err: SpecError) -> Self {
        FitError::Spec(err)
    }
}

impl From<ClassifierError> for FitError {
    fn from(err: ClassifierError) -> Self {
        FitError::Classifier(err)
    }
}

/// Load a specification file, inject the channel count derived from the
/// training tensor, merge acceleration options, then construct and fit a
/// classifier. Memory conservation is fixed on and progress reporting
/// enabled; a fit failure propagates unchanged.
pub fn fit_with_params<C: EncoderClassifier>(
    hyper_path: &Path,
    train: &Array3<f64>,
    labels: &[usize],
    accel: Acceleration,
) -> Result<C, FitError> {
    let spec = HyperParams::load(hyper_path)?
        .with_in_channels(train.dim().1)
        .with_acceleration(accel);
    let mut classifier = C::from_spec(&spec)?;
    classifier.fit(train, labels, true, true)?;
    Ok(classifier)
}
