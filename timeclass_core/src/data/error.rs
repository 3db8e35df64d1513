//! Error types for dataset loading and label remapping
//!
//! All loader failures are fatal and reported with enough context to find the
//! offending file or record; nothing in this module retries or coerces.

use std::fmt;
use std::path::PathBuf;

/// Result type alias for loader and remapper operations
pub type DataResult<T> = Result<T, DataError>;

/// Errors raised while reading source files or remapping labels
#[derive(Debug)]
pub enum DataError {
    /// An expected train/test file is absent under the dataset root
    DatasetNotFound { path: PathBuf },

    /// A record's shape disagrees with the first record of its file
    MalformedRecord {
        index: usize,
        expected: String,
        found: String,
    },

    /// A feature cell could not be parsed as a number
    Parse {
        index: usize,
        column: usize,
        token: String,
    },

    /// A test-split label never appeared in the training split
    UnknownLabel { label: String },

    /// Underlying I/O failure while reading a source file
    Io(std::io::Error),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::DatasetNotFound { path } => {
                write!(f, "Dataset file not found: {}", path.display())
            }
            DataError::MalformedRecord {
                index,
                expected,
                found,
            } => write!(
                f,
                "Malformed record at index {index}: expected {expected}, found {found}",
            ),
            DataError::Parse {
                index,
                column,
                token,
            } => write!(
                f,
                "Record {index}, column {column}: cannot parse {token:?} as a number",
            ),
            DataError::UnknownLabel { label } => write!(
                f,
                "Test label {label:?} does not appear in the training label space",
            ),
            DataError::Io(err) => write!(f, "I/O error while reading dataset: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        DataError::Io(err)
    }
}
