//! Tab-separated single-channel benchmark loader
//!
//! Reads the `<name>_TRAIN.tsv` / `<name>_TEST.tsv` file pair. The first
//! column is the raw label token, the remaining columns one time channel.
//! Missing values stay as NaN; the normalizer works with NaN-aware
//! statistics, so no imputation happens here.

use std::fs;
use std::path::Path;

use ndarray::Array3;

use super::error::{DataError, DataResult};
use super::RawSplit;

/// Load the train and test splits of a tab-separated dataset.
pub fn load(root: &Path, name: &str) -> DataResult<(RawSplit, RawSplit)> {
    let dir = root.join(name);
    let train = load_split(&dir.join(format!("{name}_TRAIN.tsv")))?;
    let test = load_split(&dir.join(format!("{name}_TEST.tsv")))?;
    Ok((train, test))
}

fn load_split(path: &Path) -> DataResult<RawSplit> {
    if !path.is_file() {
        return Err(DataError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = fs::read_to_string(path)?;

    let mut labels = Vec::new();
    let mut values = Vec::new();
    let mut timesteps = 0usize;

    for (index, line) in contents.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        let mut fields = line.split('\t');
        let label = fields
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DataError::MalformedRecord {
                index,
                expected: "label followed by values".to_string(),
                found: "empty record".to_string(),
            })?;

        let row_start = values.len();
        for (column, token) in fields.enumerate() {
            values.push(parse_cell(token, index, column)?);
        }
        let width = values.len() - row_start;

        if index == 0 {
            if width == 0 {
                return Err(DataError::MalformedRecord {
                    index,
                    expected: "at least one value column".to_string(),
                    found: "0 columns".to_string(),
                });
            }
            timesteps = width;
        } else if width != timesteps {
            return Err(DataError::MalformedRecord {
                index,
                expected: format!("{timesteps} value columns"),
                found: format!("{width} columns"),
            });
        }

        labels.push(label.to_string());
    }

    if labels.is_empty() {
        return Err(DataError::MalformedRecord {
            index: 0,
            expected: "at least one record".to_string(),
            found: "empty file".to_string(),
        });
    }

    let samples = labels.len();
    let features = Array3::from_shape_vec((samples, 1, timesteps), values)
        .expect("row widths were checked against the first record");

    Ok(RawSplit { features, labels })
}

/// Empty cells and NaN markers become NaN; everything else must parse as f64.
fn parse_cell(token: &str, index: usize, column: usize) -> DataResult<f64> {
    let trimmed = token.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed == "?" {
        return Ok(f64::NAN);
    }
    trimmed.parse::<f64>().map_err(|_| DataError::Parse {
        index,
        // column 0 is the label
        column: column + 1,
        token: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_dataset(name: &str, train: &str, test: &str) -> std::path::PathBuf {
        let root = std::env::temp_dir().join(format!("tabular-{}", uuid::Uuid::new_v4()));
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{name}_TRAIN.tsv")), train).unwrap();
        fs::write(dir.join(format!("{name}_TEST.tsv")), test).unwrap();
        root
    }

    #[test]
    fn test_load_shapes_and_labels() {
        let root = write_dataset(
            "Tiny",
            "x\t1\t2\t3\ny\t4\t5\t6\n",
            "x\t2\t3\t4\n",
        );
        let (train, test) = load(&root, "Tiny").unwrap();
        assert_eq!(train.features.dim(), (2, 1, 3));
        assert_eq!(train.labels, vec!["x", "y"]);
        assert_eq!(test.features.dim(), (1, 1, 3));
        assert_eq!(test.features[[0, 0, 2]], 4.0);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_values_become_nan() {
        let root = write_dataset("Gappy", "a\t1\t\t3\nb\tNaN\t5\t6\n", "a\t1\t2\t3\n");
        let (train, _) = load(&root, "Gappy").unwrap();
        assert!(train.features[[0, 0, 1]].is_nan());
        assert!(train.features[[1, 0, 0]].is_nan());
        assert_eq!(train.features[[1, 0, 1]], 5.0);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_inconsistent_row_width_is_malformed() {
        let root = write_dataset("Ragged", "a\t1\t2\t3\nb\t4\t5\n", "a\t1\t2\t3\n");
        let err = load(&root, "Ragged").unwrap_err();
        match err {
            DataError::MalformedRecord { index, .. } => assert_eq!(index, 1),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_files_are_dataset_not_found() {
        let root = std::env::temp_dir().join(format!("tabular-{}", uuid::Uuid::new_v4()));
        let err = load(&root, "Nowhere").unwrap_err();
        assert!(matches!(err, DataError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_non_numeric_cell_is_parse_error() {
        let root = write_dataset("Junk", "a\t1\toops\t3\n", "a\t1\t2\t3\n");
        let err = load(&root, "Junk").unwrap_err();
        match err {
            DataError::Parse { index, column, .. } => {
                assert_eq!(index, 0);
                assert_eq!(column, 2);
            }
            other => panic!("expected Parse, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&root);
    }
}
