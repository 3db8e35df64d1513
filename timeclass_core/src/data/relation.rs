//! Multivariate attribute-relation benchmark loader
//!
//! Reads the `<name>_TRAIN.arff` / `<name>_TEST.arff` file pair. Each data
//! record carries one quoted relational field (per-channel value sequences
//! separated by a literal `\n` escape) and one categorical label token.
//! Channel count and timestep length are fixed by the first record of the
//! training split and enforced on every record of both splits.

use std::fs;
use std::path::Path;

use ndarray::Array3;

use super::error::{DataError, DataResult};
use super::RawSplit;

/// Load the train and test splits of an attribute-relation dataset.
///
/// The shape reference (channels x timesteps) is taken from the first
/// training record and applied to the test split as well, so a test file
/// with a different channel layout fails with [`DataError::MalformedRecord`].
pub fn load(root: &Path, name: &str) -> DataResult<(RawSplit, RawSplit)> {
    let dir = root.join(name);
    let mut shape = None;
    let train = load_split(&dir.join(format!("{name}_TRAIN.arff")), &mut shape)?;
    let test = load_split(&dir.join(format!("{name}_TEST.arff")), &mut shape)?;
    Ok((train, test))
}

fn load_split(path: &Path, shape: &mut Option<(usize, usize)>) -> DataResult<RawSplit> {
    if !path.is_file() {
        return Err(DataError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = fs::read_to_string(path)?;

    let mut in_data = false;
    let mut attribute_count = 0usize;
    let mut labels = Vec::new();
    let mut values = Vec::new();
    let mut index = 0usize;

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        if !in_data {
            let lower = trimmed.to_ascii_lowercase();
            if lower.starts_with("@attribute") {
                attribute_count += 1;
            } else if lower.starts_with("@data") {
                if attribute_count < 2 {
                    return Err(DataError::MalformedRecord {
                        index: 0,
                        expected: "a relational attribute and a class attribute".to_string(),
                        found: format!("{attribute_count} attribute declarations"),
                    });
                }
                in_data = true;
            }
            continue;
        }

        let (series, label) = split_record(trimmed, index)?;
        let channels = parse_channels(series, index)?;

        let record_shape = (channels.len(), channels[0].len());
        match *shape {
            None => *shape = Some(record_shape),
            Some(expected) if expected != record_shape => {
                return Err(DataError::MalformedRecord {
                    index,
                    expected: format!("{} channels x {} timesteps", expected.0, expected.1),
                    found: format!("{} channels x {} timesteps", record_shape.0, record_shape.1),
                });
            }
            Some(_) => {}
        }

        for channel in &channels {
            values.extend_from_slice(channel);
        }
        labels.push(label.to_string());
        index += 1;
    }

    if labels.is_empty() {
        return Err(DataError::MalformedRecord {
            index: 0,
            expected: "at least one data record".to_string(),
            found: "no records after @data".to_string(),
        });
    }

    let (channels, timesteps) = shape.expect("set by the first record");
    let features = Array3::from_shape_vec((labels.len(), channels, timesteps), values)
        .expect("record shapes were checked against the reference");

    Ok(RawSplit { features, labels })
}

/// Split a data row into its quoted relational field and its label token.
fn split_record(line: &str, index: usize) -> DataResult<(&str, &str)> {
    let malformed = |found: &str| DataError::MalformedRecord {
        index,
        expected: "'<series>',<label>".to_string(),
        found: found.to_string(),
    };

    let quote = match line.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(malformed("record does not start with a quoted series")),
    };
    let body = &line[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| malformed("unterminated quote"))?;
    let series = &body[..end];
    let rest = body[end + 1..].trim_start();
    let label = rest
        .strip_prefix(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| malformed("missing label after series"))?;
    Ok((series, label))
}

/// Parse the relational field into per-channel value sequences.
///
/// Channels are separated by the two-character `\n` escape; each channel is
/// a comma-separated list of numbers, `?` marking a missing value.
fn parse_channels(series: &str, index: usize) -> DataResult<Vec<Vec<f64>>> {
    let mut channels = Vec::new();
    for chunk in series.split("\\n") {
        let mut channel = Vec::new();
        for (column, token) in chunk.split(',').enumerate() {
            let trimmed = token.trim();
            if trimmed == "?" || trimmed.eq_ignore_ascii_case("nan") {
                channel.push(f64::NAN);
                continue;
            }
            let value = trimmed.parse::<f64>().map_err(|_| DataError::Parse {
                index,
                column,
                token: trimmed.to_string(),
            })?;
            channel.push(value);
        }
        channels.push(channel);
    }

    let timesteps = channels[0].len();
    if timesteps == 0 || channels.iter().any(|c| c.len() != timesteps) {
        return Err(DataError::MalformedRecord {
            index,
            expected: "equal-length channel sequences".to_string(),
            found: format!(
                "channel lengths {:?}",
                channels.iter().map(Vec::len).collect::<Vec<_>>()
            ),
        });
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TRAIN: &str = "\
% two-channel toy dataset
@relation Toy
@attribute series relational
@attribute dim_a numeric
@attribute dim_b numeric
@end series
@attribute target {walk,run}
@data
'1.0,2.0,3.0\\n4.0,5.0,6.0',walk
'2.0,3.0,4.0\\n5.0,6.0,7.0',run
";

    const TEST: &str = "\
@relation Toy
@attribute series relational
@attribute target {walk,run}
@DATA
'0.0,1.0,2.0\\n3.0,4.0,5.0',walk
";

    fn write_dataset(name: &str, train: &str, test: &str) -> std::path::PathBuf {
        let root = std::env::temp_dir().join(format!("relation-{}", uuid::Uuid::new_v4()));
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{name}_TRAIN.arff")), train).unwrap();
        fs::write(dir.join(format!("{name}_TEST.arff")), test).unwrap();
        root
    }

    #[test]
    fn test_load_multichannel_shapes() {
        let root = write_dataset("Toy", TRAIN, TEST);
        let (train, test) = load(&root, "Toy").unwrap();
        assert_eq!(train.features.dim(), (2, 2, 3));
        assert_eq!(test.features.dim(), (1, 2, 3));
        assert_eq!(train.labels, vec!["walk", "run"]);
        assert_eq!(train.features[[0, 1, 2]], 6.0);
        assert_eq!(test.features[[0, 1, 0]], 3.0);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_shape_fixed_by_first_record() {
        let bad_test = "@attribute series relational\n@attribute target {walk,run}\n@data\n'1.0,2.0\\n3.0,4.0',walk\n";
        let root = write_dataset("Toy", TRAIN, bad_test);
        let err = load(&root, "Toy").unwrap_err();
        assert!(matches!(err, DataError::MalformedRecord { index: 0, .. }));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_ragged_channels_within_record() {
        let train = "@attribute series relational\n@attribute target {a}\n@data\n'1.0,2.0,3.0\\n4.0,5.0',a\n";
        let root = write_dataset("Toy", train, TEST);
        let err = load(&root, "Toy").unwrap_err();
        assert!(matches!(err, DataError::MalformedRecord { .. }));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_marker_becomes_nan() {
        let train = "@attribute series relational\n@attribute target {a}\n@data\n'1.0,?,3.0\\n4.0,5.0,6.0',a\n";
        let test = "@attribute series relational\n@attribute target {a}\n@data\n'1.0,2.0,3.0\\n4.0,5.0,6.0',a\n";
        let root = write_dataset("Toy", train, test);
        let (train, _) = load(&root, "Toy").unwrap();
        assert!(train.features[[0, 0, 1]].is_nan());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_file_is_dataset_not_found() {
        let root = std::env::temp_dir().join(format!("relation-{}", uuid::Uuid::new_v4()));
        let err = load(&root, "Absent").unwrap_err();
        assert!(matches!(err, DataError::DatasetNotFound { .. }));
    }
}
