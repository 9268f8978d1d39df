use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::config::ConvertConfig;
use crate::convert::artifact::load_checkpoint;
use crate::convert::export::{read_saved, SavedArtifact};
use crate::error::ConvertError;

/// A problem found when re-reading a converted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum VerificationIssue {
    /// The converted root is not a flat tensor mapping.
    NotFlat { kind: String },
    /// The converted mapping has no keys.
    Empty,
    /// Fewer keys than the source checkpoint exposes.
    CountDrop { expected: usize, actual: usize },
}

impl fmt::Display for VerificationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationIssue::NotFlat { kind } => {
                write!(f, "converted file holds {kind}, expected a flat mapping")
            }
            VerificationIssue::Empty => write!(f, "converted mapping is empty"),
            VerificationIssue::CountDrop { expected, actual } => {
                write!(f, "parameter count dropped from {expected} to {actual}")
            }
        }
    }
}

const FLAT_CONTAINER: &str = "flat mapping";

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub container: String,
    pub key_count: usize,
    pub source_count: usize,
    pub sample_keys: Vec<String>,
    pub issues: Vec<VerificationIssue>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Re-read `converted` and compare it against the checkpoint at `original`.
///
/// Mismatches are collected in the report rather than returned as errors.
/// An `Err` means one of the files could not be read at all.
pub fn verify(
    original: &Path,
    converted: &Path,
    config: &ConvertConfig,
) -> Result<VerificationReport, ConvertError> {
    let source_count = load_checkpoint(original)?.source_count(config.include_buffers);

    let mut issues = Vec::new();
    let (container, keys): (String, Vec<String>) = match read_saved(converted)? {
        SavedArtifact::Flat(params) => (FLAT_CONTAINER.to_string(), params.into_keys().collect()),
        SavedArtifact::Other(kind) => {
            issues.push(VerificationIssue::NotFlat { kind: kind.clone() });
            (kind, Vec::new())
        }
    };

    if container == FLAT_CONTAINER && keys.is_empty() {
        issues.push(VerificationIssue::Empty);
    }
    if keys.len() < source_count {
        issues.push(VerificationIssue::CountDrop {
            expected: source_count,
            actual: keys.len(),
        });
    }
    for issue in &issues {
        log::warn!("verification of {}: {issue}", converted.display());
    }

    Ok(VerificationReport {
        container,
        key_count: keys.len(),
        source_count,
        sample_keys: keys.iter().take(config.sample_keys).cloned().collect(),
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::archive::{write_archive, Object, Tensor};
    use crate::convert::export::save_parameters;
    use crate::convert::artifact::ParameterMap;

    fn params(n: usize) -> ParameterMap {
        (0..n)
            .map(|i| {
                let value = Tensor::from_f32(vec![1], &[i as f32]).unwrap();
                (format!("layer{i}.weight"), value)
            })
            .collect()
    }

    fn source(dir: &Path, n: usize) -> std::path::PathBuf {
        let path = dir.join("source.pt");
        write_archive(&path, &Object::tensor_dict(params(n))).unwrap();
        path
    }

    #[test]
    fn test_matching_counts_pass() {
        let dir = tempfile::tempdir().unwrap();
        let original = source(dir.path(), 3);
        let converted = dir.path().join("converted.pt");
        save_parameters(&params(3), &converted).unwrap();

        let report = verify(&original, &converted, &ConvertConfig::default()).unwrap();
        assert!(report.is_ok(), "issues: {:?}", report.issues);
        assert_eq!(report.key_count, 3);
        assert_eq!(report.source_count, 3);
        assert_eq!(report.sample_keys.len(), 3);
    }

    #[test]
    fn test_count_drop_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let original = source(dir.path(), 4);
        let converted = dir.path().join("converted.pt");
        save_parameters(&params(2), &converted).unwrap();

        let report = verify(&original, &converted, &ConvertConfig::default()).unwrap();
        assert_eq!(
            report.issues,
            vec![VerificationIssue::CountDrop {
                expected: 4,
                actual: 2
            }]
        );
    }

    #[test]
    fn test_nested_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let original = source(dir.path(), 1);
        let converted = dir.path().join("converted.pt");
        let mut outer = std::collections::BTreeMap::new();
        outer.insert("state_dict".to_string(), Object::tensor_dict(params(1)));
        write_archive(&converted, &Object::Dict(outer)).unwrap();

        let report = verify(&original, &converted, &ConvertConfig::default()).unwrap();
        assert!(!report.is_ok());
        assert!(matches!(report.issues[0], VerificationIssue::NotFlat { .. }));
    }

    #[test]
    fn test_empty_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let original = source(dir.path(), 0);
        let converted = dir.path().join("converted.pt");
        save_parameters(&ParameterMap::new(), &converted).unwrap();

        let report = verify(&original, &converted, &ConvertConfig::default()).unwrap();
        assert_eq!(report.issues, vec![VerificationIssue::Empty]);
    }

    #[test]
    fn test_sample_keys_respects_config() {
        let dir = tempfile::tempdir().unwrap();
        let original = source(dir.path(), 8);
        let converted = dir.path().join("converted.pt");
        save_parameters(&params(8), &converted).unwrap();

        let config = ConvertConfig {
            sample_keys: 2,
            ..ConvertConfig::default()
        };
        let report = verify(&original, &converted, &config).unwrap();
        assert_eq!(report.sample_keys, vec!["layer0.weight", "layer1.weight"]);
    }
}
