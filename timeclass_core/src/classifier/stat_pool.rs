//! CPU reference classifier: pooled-statistics encoder + softmax head
//!
//! The encoder is deterministic and parameter-free: each channel is pooled
//! into NaN-aware summary statistics (mean, standard deviation, min, max),
//! so "freezing" it is trivial and head-only retraining is a genuine subset
//! of end-to-end fitting. The head is a multinomial logistic regression
//! trained by seeded mini-batch gradient descent.
//!
//! Artifacts are persisted with a deterministic, version-tagged bincode
//! codec; an artifact is readable only by the same codec version.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bincode::Options;
use ndarray::{Array1, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ClassifierError, ClassifierResult, EncoderClassifier};
use crate::params::HyperParams;

/// Summary statistics per channel produced by the pooling encoder
const FEATURES_PER_CHANNEL: usize = 4;

/// Artifact codec version; bump on any snapshot layout change
const SNAPSHOT_VERSION: u32 = 1;

/// Seed for head initialization and batch shuffling
const HEAD_SEED: u64 = 42;

/// Deterministic binary codec shared by save and load.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_little_endian()
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    spec: HyperParams,
    classes: usize,
    features: usize,
    weights: Vec<f64>,
    bias: Vec<f64>,
}

/// Linear softmax classification head.
#[derive(Debug, Clone)]
struct SoftmaxHead {
    /// `[classes, features]`
    weights: Array2<f64>,
    /// `[classes]`
    bias: Array1<f64>,
}

impl SoftmaxHead {
    fn new(classes: usize, features: usize, rng: &mut StdRng) -> Self {
        let scale = (2.0 / features as f64).sqrt();
        let weights = Array2::from_shape_fn((classes, features), |_| {
            (rng.gen::<f64>() - 0.5) * 2.0 * scale
        });
        Self {
            weights,
            bias: Array1::zeros(classes),
        }
    }

    fn logits(&self, input: &Array1<f64>) -> Array1<f64> {
        self.weights.dot(input) + &self.bias
    }

    fn softmax(logits: &Array1<f64>) -> Array1<f64> {
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Array1<f64> = logits.mapv(|v| (v - max).exp());
        let sum = exp.sum();
        exp / sum
    }

    fn predict(&self, input: &Array1<f64>) -> usize {
        let logits = self.logits(input);
        logits
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Cross-entropy loss and gradient step for one sample.
    fn sample_step(&self, input: &Array1<f64>, label: usize) -> (f64, Array1<f64>) {
        let probs = Self::softmax(&self.logits(input));
        let loss = -probs[label].max(f64::MIN_POSITIVE).ln();
        let mut dz = probs;
        dz[label] -= 1.0;
        (loss, dz)
    }

    fn apply(&mut self, input: &Array1<f64>, dz: &Array1<f64>, lr: f64) {
        for (class, &g) in dz.iter().enumerate() {
            let mut row = self.weights.row_mut(class);
            row.zip_mut_with(input, |w, &x| *w -= lr * g * x);
            self.bias[class] -= lr * g;
        }
    }
}

/// Reference implementation of [`EncoderClassifier`].
#[derive(Debug)]
pub struct StatPoolClassifier {
    spec: HyperParams,
    head: Option<SoftmaxHead>,
}

impl StatPoolClassifier {
    /// NaN-aware pooled statistics for one sample: mean, population standard
    /// deviation, min and max per channel. A channel with no finite values
    /// pools to zeros.
    fn pool_sample(sample: ndarray::ArrayView2<'_, f64>) -> Vec<f64> {
        let mut features = Vec::with_capacity(sample.len_of(Axis(0)) * FEATURES_PER_CHANNEL);
        for channel in sample.axis_iter(Axis(0)) {
            let finite: Vec<f64> = channel.iter().copied().filter(|v| v.is_finite()).collect();
            if finite.is_empty() {
                features.extend_from_slice(&[0.0; FEATURES_PER_CHANNEL]);
                continue;
            }
            let n = finite.len() as f64;
            let mean = finite.iter().sum::<f64>() / n;
            let var = finite.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
            let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            features.extend_from_slice(&[mean, var.sqrt(), min, max]);
        }
        features
    }

    fn head(&self, operation: &str) -> ClassifierResult<&SoftmaxHead> {
        self.head.as_ref().ok_or_else(|| ClassifierError::NotFitted {
            operation: operation.to_string(),
        })
    }

    fn check_labels(encoded: &Array2<f64>, labels: &[usize]) -> ClassifierResult<usize> {
        if labels.is_empty() || encoded.len_of(Axis(0)) != labels.len() {
            return Err(ClassifierError::InvalidInput {
                details: format!(
                    "{} samples vs {} labels",
                    encoded.len_of(Axis(0)),
                    labels.len()
                ),
            });
        }
        Ok(labels.iter().max().copied().unwrap_or(0) + 1)
    }

    /// Head training loop shared by `fit` and `fit_classifier`.
    ///
    /// With `save_memory` the gradient of each sample is applied as soon as
    /// it is computed; otherwise updates are accumulated per mini-batch.
    fn train_head(
        &mut self,
        encoded: &Array2<f64>,
        labels: &[usize],
        save_memory: bool,
        verbose: bool,
    ) -> ClassifierResult<()> {
        let classes = Self::check_labels(encoded, labels)?;
        let features = encoded.len_of(Axis(1));

        let mut rng = StdRng::seed_from_u64(HEAD_SEED);
        let mut head = SoftmaxHead::new(classes, features, &mut rng);

        let samples: Vec<Array1<f64>> = encoded.axis_iter(Axis(0)).map(|r| r.to_owned()).collect();
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let batch_size = self.spec.batch_size.max(1);
        let report_every = (self.spec.nb_steps / 10).max(1);

        let mut cursor = samples.len();
        for step in 0..self.spec.nb_steps {
            let mut batch_loss = 0.0;
            let mut accumulated: Vec<(usize, Array1<f64>)> = Vec::new();

            for _ in 0..batch_size.min(samples.len()) {
                if cursor == samples.len() {
                    order.shuffle(&mut rng);
                    cursor = 0;
                }
                let idx = order[cursor];
                cursor += 1;

                let (loss, dz) = head.sample_step(&samples[idx], labels[idx]);
                batch_loss += loss;
                if save_memory {
                    head.apply(&samples[idx], &dz, self.spec.lr);
                } else {
                    accumulated.push((idx, dz));
                }
            }

            if !save_memory {
                let scale = self.spec.lr / accumulated.len().max(1) as f64;
                for (idx, dz) in &accumulated {
                    head.apply(&samples[*idx], dz, scale);
                }
            }

            if verbose && (step % report_every == 0 || step + 1 == self.spec.nb_steps) {
                println!(
                    "head step {}/{}: batch loss {:.4}",
                    step + 1,
                    self.spec.nb_steps,
                    batch_loss / batch_size.min(samples.len()) as f64
                );
            }
        }

        self.head = Some(head);
        Ok(())
    }
}

impl EncoderClassifier for StatPoolClassifier {
    fn from_spec(spec: &HyperParams) -> ClassifierResult<Self> {
        if spec.in_channels == 0 {
            return Err(ClassifierError::InvalidInput {
                details: "in_channels must be at least 1".to_string(),
            });
        }
        Ok(Self {
            spec: spec.clone(),
            head: None,
        })
    }

    fn fit(
        &mut self,
        train: &Array3<f64>,
        labels: &[usize],
        save_memory: bool,
        verbose: bool,
    ) -> ClassifierResult<()> {
        let encoded = self.encode(train)?;
        self.train_head(&encoded, labels, save_memory, verbose)
    }

    fn encode(&self, data: &Array3<f64>) -> ClassifierResult<Array2<f64>> {
        let (samples, channels, _) = data.dim();
        if channels != self.spec.in_channels {
            return Err(ClassifierError::InvalidInput {
                details: format!(
                    "expected {} channels, got {channels}",
                    self.spec.in_channels
                ),
            });
        }
        let rows: Vec<Vec<f64>> = (0..samples)
            .into_par_iter()
            .map(|i| Self::pool_sample(data.index_axis(Axis(0), i)))
            .collect();
        let width = channels * FEATURES_PER_CHANNEL;
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((samples, width), flat)
            .expect("pooled rows have a fixed width per channel"))
    }

    fn fit_classifier(&mut self, encoded: &Array2<f64>, labels: &[usize]) -> ClassifierResult<()> {
        self.train_head(encoded, labels, true, false)
    }

    fn score(&self, data: &Array3<f64>, labels: &[usize]) -> ClassifierResult<f64> {
        let encoded = self.encode(data)?;
        if encoded.len_of(Axis(0)) != labels.len() {
            return Err(ClassifierError::InvalidInput {
                details: format!(
                    "{} samples vs {} labels",
                    encoded.len_of(Axis(0)),
                    labels.len()
                ),
            });
        }
        let head = self.head("score")?;
        let rows: Vec<Array1<f64>> = encoded.axis_iter(Axis(0)).map(|r| r.to_owned()).collect();
        let correct: usize = rows
            .par_iter()
            .zip(labels.par_iter())
            .filter(|(row, label)| head.predict(row) == **label)
            .count();
        Ok(correct as f64 / labels.len() as f64)
    }

    fn save(&self, path: &Path) -> ClassifierResult<()> {
        let head = self.head("save")?;
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            spec: self.spec.clone(),
            classes: head.weights.len_of(Axis(0)),
            features: head.weights.len_of(Axis(1)),
            weights: head.weights.iter().copied().collect(),
            bias: head.bias.to_vec(),
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        codec().serialize_into(&mut writer, &snapshot)?;
        writer.flush()?;
        Ok(())
    }

    fn load(spec: &HyperParams, path: &Path) -> ClassifierResult<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let snapshot: Snapshot = codec().deserialize_from(&mut reader)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ClassifierError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }
        let expected_features = spec.in_channels * FEATURES_PER_CHANNEL;
        if snapshot.features != expected_features {
            return Err(ClassifierError::ShapeMismatch {
                expected: format!("{expected_features} features"),
                found: format!("{} features", snapshot.features),
            });
        }

        let weights =
            Array2::from_shape_vec((snapshot.classes, snapshot.features), snapshot.weights)
                .map_err(|_| ClassifierError::ShapeMismatch {
                    expected: format!("{}x{} weights", snapshot.classes, snapshot.features),
                    found: "flat weight vector of the wrong length".to_string(),
                })?;
        let bias = Array1::from_vec(snapshot.bias);

        Ok(Self {
            spec: spec.clone(),
            head: Some(SoftmaxHead { weights, bias }),
        })
    }

    fn effective_params(&self) -> HyperParams {
        self.spec.clone()
    }

    fn acceleration_available() -> bool {
        // pooled-statistics encoder and linear head run on CPU only
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// Two clearly separated classes: low-valued and high-valued series.
    fn separable() -> (Array3<f64>, Vec<usize>) {
        let mut values = Vec::new();
        let mut labels = Vec::new();
        for i in 0..8 {
            let offset = i as f64 * 0.1;
            values.extend_from_slice(&[offset, 0.5 + offset, 1.0 + offset]);
            labels.push(0);
        }
        for i in 0..8 {
            let offset = i as f64 * 0.1;
            values.extend_from_slice(&[10.0 + offset, 10.5 + offset, 11.0 + offset]);
            labels.push(1);
        }
        let data = Array3::from_shape_vec((16, 1, 3), values).unwrap();
        (data, labels)
    }

    fn fitted() -> (StatPoolClassifier, Array3<f64>, Vec<usize>) {
        let (data, labels) = separable();
        let spec = HyperParams {
            nb_steps: 300,
            lr: 0.05,
            batch_size: 4,
            in_channels: 1,
            ..HyperParams::default()
        };
        let mut classifier = StatPoolClassifier::from_spec(&spec).unwrap();
        classifier.fit(&data, &labels, true, false).unwrap();
        (classifier, data, labels)
    }

    #[test]
    fn test_encode_shape_and_statistics() {
        let spec = HyperParams {
            in_channels: 2,
            ..HyperParams::default()
        };
        let classifier = StatPoolClassifier::from_spec(&spec).unwrap();
        let data =
            Array3::from_shape_vec((1, 2, 3), vec![1.0, 2.0, 3.0, f64::NAN, 4.0, 6.0]).unwrap();
        let encoded = classifier.encode(&data).unwrap();
        assert_eq!(encoded.dim(), (1, 8));
        // channel 0: mean 2, min 1, max 3
        assert!((encoded[[0, 0]] - 2.0).abs() < 1e-12);
        assert_eq!(encoded[[0, 2]], 1.0);
        assert_eq!(encoded[[0, 3]], 3.0);
        // channel 1 ignores the NaN: mean 5
        assert!((encoded[[0, 4]] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_encode_rejects_channel_mismatch() {
        let spec = HyperParams {
            in_channels: 3,
            ..HyperParams::default()
        };
        let classifier = StatPoolClassifier::from_spec(&spec).unwrap();
        let data = Array3::zeros((2, 1, 4));
        assert!(matches!(
            classifier.encode(&data).unwrap_err(),
            ClassifierError::InvalidInput { .. }
        ));
    }

    #[test]
    fn test_fit_separates_easy_classes() {
        let (classifier, data, labels) = fitted();
        let accuracy = classifier.score(&data, &labels).unwrap();
        assert!(accuracy > 0.9, "accuracy {accuracy} on separable data");
    }

    #[test]
    fn test_score_before_fit_fails() {
        let classifier = StatPoolClassifier::from_spec(&HyperParams::default()).unwrap();
        let (data, labels) = separable();
        assert!(matches!(
            classifier.score(&data, &labels).unwrap_err(),
            ClassifierError::NotFitted { .. }
        ));
    }

    #[test]
    fn test_save_load_round_trip() {
        let (classifier, data, labels) = fitted();
        let path = std::env::temp_dir().join(format!("statpool-{}.model", uuid::Uuid::new_v4()));
        classifier.save(&path).unwrap();

        let restored =
            StatPoolClassifier::load(&classifier.effective_params(), &path).unwrap();
        let original = classifier.score(&data, &labels).unwrap();
        let reloaded = restored.score(&data, &labels).unwrap();
        assert_eq!(original, reloaded);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_wrong_version() {
        let path = std::env::temp_dir().join(format!("statpool-{}.model", uuid::Uuid::new_v4()));
        let snapshot = Snapshot {
            version: 99,
            spec: HyperParams::default(),
            classes: 2,
            features: 4,
            weights: vec![0.0; 8],
            bias: vec![0.0; 2],
        };
        let file = File::create(&path).unwrap();
        let mut writer = BufWriter::new(file);
        codec().serialize_into(&mut writer, &snapshot).unwrap();
        writer.flush().unwrap();

        let err = StatPoolClassifier::load(&HyperParams::default(), &path).unwrap_err();
        assert!(matches!(err, ClassifierError::VersionMismatch { found: 99, .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_shape_mismatch() {
        let (classifier, _, _) = fitted();
        let path = std::env::temp_dir().join(format!("statpool-{}.model", uuid::Uuid::new_v4()));
        classifier.save(&path).unwrap();

        let other_spec = HyperParams {
            in_channels: 5,
            ..HyperParams::default()
        };
        let err = StatPoolClassifier::load(&other_spec, &path).unwrap_err();
        assert!(matches!(err, ClassifierError::ShapeMismatch { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_fit_classifier_refits_head_only() {
        let (mut classifier, data, labels) = fitted();
        let encoded = classifier.encode(&data).unwrap();
        classifier.fit_classifier(&encoded, &labels).unwrap();
        let accuracy = classifier.score(&data, &labels).unwrap();
        assert!(accuracy > 0.9);
    }
}
