//! Dataset ingestion: format loaders and the normalizing facade
//!
//! Two on-disk formats are supported, both reduced to one in-memory
//! representation: a `(sample, channel, timestep)` tensor of f64 plus dense
//! integer labels. [`ingest`] composes the matching loader with the label
//! remapper and the normalization policy of that format.

pub mod error;
pub mod relation;
pub mod tabular;

use std::fmt;
use std::path::Path;

use ndarray::Array3;

use crate::labels::LabelMap;
use crate::normalize::{self, NormalizeError, SkipList};

pub use error::{DataError, DataResult};

/// Which on-disk benchmark format a dataset uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Tab-separated, single channel, label in the first column
    Tabular,
    /// Attribute-relation files with a nested multi-channel sequence
    MultiChannel,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Tabular => write!(f, "tabular"),
            SourceFormat::MultiChannel => write!(f, "multichannel"),
        }
    }
}

/// One split as produced by a format loader: raw features plus raw label
/// tokens, before remapping and normalization.
#[derive(Debug, Clone)]
pub struct RawSplit {
    pub features: Array3<f64>,
    pub labels: Vec<String>,
}

/// Fully ingested dataset: normalized tensors and dense labels.
///
/// Invariants upheld by [`ingest`]:
/// - `train.len_of(Axis(0)) == train_labels.len()`, same for test
/// - train and test share the channel axis length
/// - labels cover a contiguous zero-based range across both splits
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    pub train: Array3<f64>,
    pub train_labels: Vec<usize>,
    pub test: Array3<f64>,
    pub test_labels: Vec<usize>,
    /// Number of distinct classes in the training split
    pub classes: usize,
}

impl DatasetSplits {
    pub fn channels(&self) -> usize {
        self.train.dim().1
    }

    pub fn timesteps(&self) -> usize {
        self.train.dim().2
    }
}

/// Errors raised by the ingestion facade
#[derive(Debug)]
pub enum IngestError {
    Data(DataError),
    Normalize(NormalizeError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Data(err) => write!(f, "{err}"),
            IngestError::Normalize(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Data(err) => Some(err),
            IngestError::Normalize(err) => Some(err),
        }
    }
}

impl From<DataError> for IngestError {
    fn from(err: DataError) -> Self {
        IngestError::Data(err)
    }
}

impl From<NormalizeError> for IngestError {
    fn from(err: NormalizeError) -> Self {
        IngestError::Normalize(err)
    }
}

/// Load, remap, and normalize a dataset with the default skip list.
pub fn ingest(format: SourceFormat, root: &Path, name: &str) -> Result<DatasetSplits, IngestError> {
    ingest_with_skip_list(format, root, name, &SkipList::default())
}

/// Load, remap, and normalize a dataset.
///
/// The skip list only affects the tabular path: allow-listed dataset names
/// bypass global normalization entirely. Multi-channel datasets are always
/// normalized per channel.
pub fn ingest_with_skip_list(
    format: SourceFormat,
    root: &Path,
    name: &str,
    skip: &SkipList,
) -> Result<DatasetSplits, IngestError> {
    let (mut train, mut test) = match format {
        SourceFormat::Tabular => tabular::load(root, name)?,
        SourceFormat::MultiChannel => relation::load(root, name)?,
    };

    let map = LabelMap::fit(&train.labels);
    let train_labels = map.apply(&train.labels)?;
    let test_labels = map.apply(&test.labels)?;

    match format {
        SourceFormat::Tabular => {
            if !skip.contains(name) {
                normalize::global(&mut train.features, &mut test.features)?;
            }
        }
        SourceFormat::MultiChannel => {
            normalize::per_channel(&mut train.features, &mut test.features)?;
        }
    }

    Ok(DatasetSplits {
        train: train.features,
        train_labels,
        test: test.features,
        test_labels,
        classes: map.len(),
    })
}
