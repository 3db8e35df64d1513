//! Hyperparameter specification loading and persistence
//!
//! The specification is a flat JSON document. It is loaded fresh for a
//! training run, or from the copy persisted next to the artifact for
//! load/retrain runs, and written back after fitting so that a later run
//! sees the classifier's effective parameters.
//!
//! Derived fields never come from the file: the orchestrator always
//! overwrites the input channel count from the data shape and the
//! acceleration fields from the runtime environment, through the staged
//! builder methods below. After that the value is treated as frozen.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Result type alias for specification handling
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors raised while loading or persisting a hyperparameter specification
#[derive(Debug)]
pub enum SpecError {
    /// The specification file does not exist
    Missing { path: PathBuf },
    /// The file exists but could not be read or written
    Io { path: PathBuf, source: std::io::Error },
    /// The file is not a valid specification document
    Invalid { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::Missing { path } => {
                write!(f, "Hyperparameter file not found: {}", path.display())
            }
            SpecError::Io { path, source } => {
                write!(f, "Cannot access {}: {source}", path.display())
            }
            SpecError::Invalid { path, source } => {
                write!(f, "Invalid hyperparameter file {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SpecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpecError::Missing { .. } => None,
            SpecError::Io { source, .. } => Some(source),
            SpecError::Invalid { source, .. } => Some(source),
        }
    }
}

/// Hardware acceleration request: whether to use it and which device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceleration {
    pub cuda: bool,
    pub gpu: usize,
}

/// The full hyperparameter specification handed to the classifier.
///
/// Field names follow the on-disk JSON document one-to-one, so whatever a
/// training run writes is loadable by a later evaluate/retrain run with
/// identical semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub batch_size: usize,
    pub channels: usize,
    /// Maximum length of compared subseries; `None` means unbounded
    pub compared_length: Option<usize>,
    pub depth: usize,
    /// Early-stopping patience in epochs; `None` disables it
    pub early_stopping: Option<usize>,
    /// Input channel count; always overwritten from the data shape
    pub in_channels: usize,
    pub kernel_size: usize,
    pub lr: f64,
    pub nb_random_samples: usize,
    pub nb_steps: usize,
    pub negative_penalty: usize,
    pub out_channels: usize,
    /// Regularization penalty; `None` disables it
    pub penalty: Option<f64>,
    pub reduced_size: usize,
    #[serde(default)]
    pub cuda: bool,
    #[serde(default)]
    pub gpu: usize,
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            batch_size: 10,
            channels: 40,
            compared_length: None,
            depth: 10,
            early_stopping: None,
            in_channels: 1,
            kernel_size: 3,
            lr: 0.001,
            nb_random_samples: 10,
            nb_steps: 200,
            negative_penalty: 1,
            out_channels: 160,
            penalty: None,
            reduced_size: 160,
            cuda: false,
            gpu: 0,
        }
    }
}

impl HyperParams {
    /// Load a specification document from a JSON file.
    pub fn load(path: &Path) -> SpecResult<Self> {
        if !path.is_file() {
            return Err(SpecError::Missing {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SpecError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Persist the specification as JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> SpecResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| SpecError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        }
        let contents =
            serde_json::to_string_pretty(self).map_err(|source| SpecError::Invalid {
                path: path.to_path_buf(),
                source,
            })?;
        fs::write(path, contents).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override the input channel count derived from the data shape.
    /// Whatever the loaded file said is ignored.
    pub fn with_in_channels(mut self, in_channels: usize) -> Self {
        self.in_channels = in_channels;
        self
    }

    /// Merge in the runtime acceleration options.
    pub fn with_acceleration(mut self, accel: Acceleration) -> Self {
        self.cuda = accel.cuda;
        self.gpu = accel.gpu;
        self
    }

    pub fn acceleration(&self) -> Acceleration {
        Acceleration {
            cuda: self.cuda,
            gpu: self.gpu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_json() -> PathBuf {
        std::env::temp_dir().join(format!("hyper-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_round_trip() {
        let path = temp_json();
        let params = HyperParams {
            nb_steps: 77,
            penalty: Some(0.5),
            compared_length: Some(128),
            ..HyperParams::default()
        };
        params.save(&path).unwrap();
        let loaded = HyperParams::load(&path).unwrap();
        assert_eq!(loaded, params);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let err = HyperParams::load(Path::new("/nonexistent/hyper.json")).unwrap_err();
        assert!(matches!(err, SpecError::Missing { .. }));
    }

    #[test]
    fn test_invalid_document() {
        let path = temp_json();
        fs::write(&path, "{not json").unwrap();
        let err = HyperParams::load(&path).unwrap_err();
        assert!(matches!(err, SpecError::Invalid { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_staged_builder_overrides_file_values() {
        let path = temp_json();
        let on_disk = HyperParams {
            in_channels: 999,
            cuda: true,
            gpu: 3,
            ..HyperParams::default()
        };
        on_disk.save(&path).unwrap();

        let spec = HyperParams::load(&path)
            .unwrap()
            .with_in_channels(4)
            .with_acceleration(Acceleration::default());
        assert_eq!(spec.in_channels, 4);
        assert!(!spec.cuda);
        assert_eq!(spec.gpu, 0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_acceleration_fields_default_when_absent() {
        let path = temp_json();
        // a document written before acceleration fields existed
        let doc = serde_json::json!({
            "batch_size": 10, "channels": 40, "compared_length": null,
            "depth": 10, "early_stopping": null, "in_channels": 1,
            "kernel_size": 3, "lr": 0.001, "nb_random_samples": 10,
            "nb_steps": 150, "negative_penalty": 1, "out_channels": 160,
            "penalty": null, "reduced_size": 160
        });
        fs::write(&path, doc.to_string()).unwrap();
        let loaded = HyperParams::load(&path).unwrap();
        assert!(!loaded.cuda);
        assert_eq!(loaded.nb_steps, 150);
        let _ = fs::remove_file(&path);
    }
}
