//! # Timeclass Core
//!
//! Ingestion and lifecycle orchestration for time-series classification
//! benchmarks. Datasets stored in two on-disk formats (tab-separated
//! single-channel, attribute-relation multi-channel) are normalized into one
//! `(sample, channel, timestep)` tensor representation with dense integer
//! labels, then drive a hyperparameter-configured classifier through one of
//! three lifecycle modes: train, load-and-evaluate, or
//! load-and-retrain-head.
//!
//! ## Quick Start
//!
//! ```no_run
//! use timeclass_core::classifier::StatPoolClassifier;
//! use timeclass_core::data::SourceFormat;
//! use timeclass_core::lifecycle::{run, RunOptions};
//!
//! let opts = RunOptions {
//!     dataset: "Mallat".to_string(),
//!     root: "data/UCRArchive_2018".into(),
//!     save_path: "output".into(),
//!     hyper_path: "config/default_hyperparameters.json".into(),
//!     cuda: false,
//!     gpu: 0,
//!     load: false,
//!     fit_classifier_only: false,
//! };
//! let report = run::<StatPoolClassifier>(SourceFormat::Tabular, &opts).unwrap();
//! println!("accuracy: {}", report.accuracy);
//! ```
//!
//! ## Core Modules
//!
//! - [`data`] - Format loaders and the normalizing ingestion facade
//! - [`labels`] - Dense label remapping
//! - [`normalize`] - Global and per-channel rescaling policies
//! - [`params`] - Hyperparameter specification and staged builder
//! - [`classifier`] - Collaborator contract plus a CPU reference impl
//! - [`lifecycle`] - The train / evaluate / retrain-head state machine
//! - [`logging`] - JSON line-delimited run logging

pub mod classifier;
pub mod data;
pub mod labels;
pub mod lifecycle;
pub mod logging;
pub mod normalize;
pub mod params;

pub use classifier::{ClassifierError, EncoderClassifier, StatPoolClassifier};
pub use data::{ingest, DataError, DatasetSplits, IngestError, SourceFormat};
pub use labels::LabelMap;
pub use lifecycle::{run, RunError, RunMode, RunOptions, RunReport};
pub use normalize::{NormalizeError, SkipList};
pub use params::{Acceleration, HyperParams, SpecError};
