//! Feature rescaling over combined train and test statistics
//!
//! Both policies compute mean and variance over the union of the two splits.
//! Normalizing with test-set statistics biases the learned representation
//! slightly, but no label information is involved; the behavior is kept to
//! match reference results and is documented here rather than hidden.
//!
//! Variance uses population semantics (divide by N). Statistics ignore
//! non-finite values, so loaders may pass NaN through for missing entries.
//! A zero-variance input would turn every value non-finite under the
//! `(x - mean) / sqrt(var)` formula, so it is rejected before any value is
//! touched.

use std::collections::BTreeSet;
use std::fmt;

use ndarray::{Array3, Axis};

/// Result type alias for normalization operations
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Errors raised while computing or applying normalization statistics
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// Variance of the combined splits is zero; rescaling would divide by zero.
    /// `channel` is `None` for the global policy.
    DegenerateVariance { channel: Option<usize> },

    /// No finite value exists to compute statistics from
    NoFiniteValues { channel: Option<usize> },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = |channel: &Option<usize>| match channel {
            Some(c) => format!("channel {c}"),
            None => "the whole dataset".to_string(),
        };
        match self {
            NormalizeError::DegenerateVariance { channel } => write!(
                f,
                "Zero variance over {}; normalization would produce non-finite values",
                scope(channel)
            ),
            NormalizeError::NoFiniteValues { channel } => {
                write!(f, "No finite values over {} to normalize with", scope(channel))
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Mean and population variance of one normalization scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopeStats {
    pub mean: f64,
    pub variance: f64,
}

/// UCR-archive dataset names whose values are already normalized or
/// categorical, and which therefore bypass global normalization.
pub const PRE_NORMALIZED_DATASETS: &[&str] = &[
    "AllGestureWiimoteX",
    "AllGestureWiimoteY",
    "AllGestureWiimoteZ",
    "BME",
    "Chinatown",
    "Crop",
    "EOGHorizontalSignal",
    "EOGVerticalSignal",
    "Fungi",
    "GestureMidAirD1",
    "GestureMidAirD2",
    "GestureMidAirD3",
    "GesturePebbleZ1",
    "GesturePebbleZ2",
    "GunPointAgeSpan",
    "GunPointMaleVersusFemale",
    "GunPointOldVersusYoung",
    "HouseTwenty",
    "InsectEPGRegularTrain",
    "InsectEPGSmallTrain",
    "MelbournePedestrian",
    "PickupGestureWiimoteZ",
    "PigAirwayPressure",
    "PigArtPressure",
    "PigCVP",
    "PLAID",
    "PowerCons",
    "Rock",
    "SemgHandGenderCh2",
    "SemgHandMovementCh2",
    "SemgHandSubjectCh2",
    "ShakeGestureWiimoteZ",
    "SmoothSubspace",
    "UMD",
];

/// Dataset names that bypass global normalization, kept as data so the set
/// can be inspected, tested, and extended instead of living in control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipList {
    names: BTreeSet<String>,
}

impl SkipList {
    /// An empty list: every dataset gets normalized.
    pub fn none() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    /// Build from an arbitrary set of dataset names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, dataset: &str) -> bool {
        self.names.contains(dataset)
    }

    pub fn insert(&mut self, dataset: impl Into<String>) {
        self.names.insert(dataset.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::from_names(PRE_NORMALIZED_DATASETS.iter().copied())
    }
}

/// Global policy: one scalar mean/variance over every finite value of both
/// splits, every value rescaled by `(x - mean) / sqrt(variance)`.
pub fn global(train: &mut Array3<f64>, test: &mut Array3<f64>) -> NormalizeResult<ScopeStats> {
    let stats = finite_stats(train.iter().chain(test.iter()).copied(), None)?;
    apply(train, stats);
    apply(test, stats);
    Ok(stats)
}

/// Per-channel policy: independent mean/variance per channel over both
/// splits, the same rescaling formula applied channel-wise.
pub fn per_channel(
    train: &mut Array3<f64>,
    test: &mut Array3<f64>,
) -> NormalizeResult<Vec<ScopeStats>> {
    let channels = train.len_of(Axis(1));
    let mut all = Vec::with_capacity(channels);

    // Compute every channel's statistics before rescaling anything, so a
    // degenerate channel aborts without leaving the tensors half-normalized.
    for channel in 0..channels {
        let train_view = train.index_axis(Axis(1), channel);
        let test_view = test.index_axis(Axis(1), channel);
        let stats = finite_stats(
            train_view.iter().chain(test_view.iter()).copied(),
            Some(channel),
        )?;
        all.push(stats);
    }

    for (channel, stats) in all.iter().enumerate() {
        let scale = stats.variance.sqrt();
        train
            .index_axis_mut(Axis(1), channel)
            .mapv_inplace(|x| (x - stats.mean) / scale);
        test.index_axis_mut(Axis(1), channel)
            .mapv_inplace(|x| (x - stats.mean) / scale);
    }
    Ok(all)
}

fn apply(data: &mut Array3<f64>, stats: ScopeStats) {
    let scale = stats.variance.sqrt();
    data.mapv_inplace(|x| (x - stats.mean) / scale);
}

/// Two-pass mean and population variance over the finite values only.
fn finite_stats(
    values: impl Iterator<Item = f64> + Clone,
    channel: Option<usize>,
) -> NormalizeResult<ScopeStats> {
    let mut count = 0usize;
    let mut sum = 0.0;
    for v in values.clone().filter(|v| v.is_finite()) {
        count += 1;
        sum += v;
    }
    if count == 0 {
        return Err(NormalizeError::NoFiniteValues { channel });
    }
    let mean = sum / count as f64;

    let sum_sq: f64 = values
        .filter(|v| v.is_finite())
        .map(|v| (v - mean) * (v - mean))
        .sum();
    let variance = sum_sq / count as f64;
    if variance == 0.0 {
        return Err(NormalizeError::DegenerateVariance { channel });
    }
    Ok(ScopeStats { mean, variance })
}
