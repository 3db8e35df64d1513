//! Dense label remapping
//!
//! Raw label tokens from the source files are mapped to the contiguous range
//! `0..k` in the order they are first seen while scanning the training
//! split. The same map is then applied to both splits, so a given raw value
//! always lands on the same integer. A test-split token that never appeared
//! in training is a contract violation and fails loudly instead of silently
//! producing an arbitrary class.

use std::collections::HashMap;

use crate::data::error::{DataError, DataResult};

/// Bijection between raw label tokens and dense zero-based class indices.
///
/// # Examples
///
/// ```
/// use timeclass_core::labels::LabelMap;
///
/// let map = LabelMap::fit(&["x".into(), "y".into(), "x".into()]);
/// assert_eq!(map.len(), 2);
/// assert_eq!(map.apply(&["y".into(), "x".into()]).unwrap(), vec![1, 0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    indices: HashMap<String, usize>,
    /// Raw tokens in assignment order; `tokens[i]` maps to class `i`.
    tokens: Vec<String>,
}

impl LabelMap {
    /// Build the map from the training labels, in first-seen order.
    pub fn fit(train_labels: &[String]) -> Self {
        let mut indices = HashMap::new();
        let mut tokens = Vec::new();
        for label in train_labels {
            if !indices.contains_key(label) {
                indices.insert(label.clone(), tokens.len());
                tokens.push(label.clone());
            }
        }
        Self { indices, tokens }
    }

    /// Number of distinct classes.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Dense index for a raw token, if it was seen during `fit`.
    pub fn get(&self, label: &str) -> Option<usize> {
        self.indices.get(label).copied()
    }

    /// Raw token for a dense index.
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Map a slice of raw tokens to dense indices.
    ///
    /// Fails with [`DataError::UnknownLabel`] on the first token outside the
    /// training label space.
    pub fn apply(&self, labels: &[String]) -> DataResult<Vec<usize>> {
        labels
            .iter()
            .map(|label| {
                self.get(label).ok_or_else(|| DataError::UnknownLabel {
                    label: label.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_first_seen_order() {
        let map = LabelMap::fit(&strings(&["x", "y", "x"]));
        assert_eq!(map.get("x"), Some(0));
        assert_eq!(map.get("y"), Some(1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_dense_and_stable() {
        let map = LabelMap::fit(&strings(&["c", "a", "b", "a", "c", "b", "b"]));
        let mapped = map.apply(&strings(&["a", "b", "c", "a"])).unwrap();
        assert_eq!(mapped, vec![1, 2, 0, 1]);

        // dense: exactly {0..k-1}, no gaps, no duplicates in the map itself
        let mut classes: Vec<usize> = (0..map.len())
            .map(|i| map.get(map.token(i).unwrap()).unwrap())
            .collect();
        classes.sort_unstable();
        assert_eq!(classes, vec![0, 1, 2]);
    }

    #[test]
    fn test_train_test_scenario() {
        // train rows (x, [1,2,3]), (y, [4,5,6]); test row (x, [2,3,4])
        let map = LabelMap::fit(&strings(&["x", "y"]));
        assert_eq!(map.get("x"), Some(0));
        assert_eq!(map.get("y"), Some(1));
        assert_eq!(map.apply(&strings(&["x"])).unwrap(), vec![0]);
    }

    #[test]
    fn test_unknown_test_label_fails() {
        let map = LabelMap::fit(&strings(&["x", "y"]));
        let err = map.apply(&strings(&["x", "z"])).unwrap_err();
        match err {
            DataError::UnknownLabel { label } => assert_eq!(label, "z"),
            other => panic!("expected UnknownLabel, got {other:?}"),
        }
    }
}
