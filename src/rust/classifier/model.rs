use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use super::error::ClassifierError;
use super::vectorizer::FeatureVector;

/// Tolerance used when checking that a probability pair sums to one
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Class probabilities produced for a single feature vector.
///
/// Both values lie in `[0, 1]` and sum to 1 within [`PROBABILITY_TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    pub spam: f64,
    pub ham: f64,
}

impl ClassProbabilities {
    pub fn new(spam: f64, ham: f64) -> Result<Self, ClassifierError> {
        let in_range = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
        if !in_range(spam) || !in_range(ham) {
            return Err(ClassifierError::ModelError(format!(
                "Class probabilities out of range: spam={}, ham={}",
                spam, ham
            )));
        }
        if (spam + ham - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ClassifierError::ModelError(format!(
                "Class probabilities do not sum to 1: spam={}, ham={}",
                spam, ham
            )));
        }
        Ok(Self { spam, ham })
    }

    /// Builds the pair from the positive-class probability alone
    pub fn from_spam(spam: f64) -> Result<Self, ClassifierError> {
        Self::new(spam, 1.0 - spam)
    }
}

/// Maps a feature vector to spam/ham probabilities.
///
/// Implementations hold only read-only fitted state and are shared across
/// request handlers without locking.
pub trait ProbabilityModel: Send + Sync + fmt::Debug {
    /// Length of the feature vectors this model accepts
    fn n_features(&self) -> usize;

    /// Short name of the backing artifact format, used in logs and info
    fn kind(&self) -> &'static str;

    /// Scores one feature vector.
    ///
    /// # Errors
    /// - `ModelError` if the vector has the wrong width or scoring fails
    fn score_probabilities(&self, features: &FeatureVector) -> Result<ClassProbabilities, ClassifierError>;
}

/// Evaluation metrics recorded by the training script
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelMetrics {
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub precision: Option<f64>,
    #[serde(default)]
    pub recall: Option<f64>,
    #[serde(default)]
    pub f1_score: Option<f64>,
}

/// Contents of the optional `metadata.json` written next to the artifacts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub metrics: Option<ModelMetrics>,
    #[serde(default)]
    pub model_params: Option<serde_json::Value>,
    #[serde(default)]
    pub data_summary: Option<serde_json::Value>,
    /// Artifact file name to lowercase hex SHA-256 digest
    #[serde(default)]
    pub checksums: HashMap<String, String>,
}

impl ModelMetadata {
    pub fn checksum_for(&self, file_name: &str) -> Option<&str> {
        self.checksums.get(file_name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probabilities_must_sum_to_one() {
        assert!(ClassProbabilities::new(0.7, 0.3).is_ok());
        assert!(matches!(
            ClassProbabilities::new(0.7, 0.4),
            Err(ClassifierError::ModelError(_))
        ));
    }

    #[test]
    fn test_probabilities_must_be_in_range() {
        assert!(ClassProbabilities::new(1.2, -0.2).is_err());
        assert!(ClassProbabilities::new(f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_from_spam() {
        let p = ClassProbabilities::from_spam(0.25).unwrap();
        assert_eq!(p.ham, 0.75);
    }

    #[test]
    fn test_metadata_parses_training_output() {
        let metadata: ModelMetadata = serde_json::from_str(
            r#"{
                "version": "2.0",
                "metrics": { "accuracy": 0.981, "precision": 0.97, "recall": 0.88, "f1_score": 0.92 },
                "confusion_matrix": [[1350, 3], [20, 180]],
                "model_params": { "features": 3000, "trees": 100, "ngrams": "(1,2)", "calibrated": true }
            }"#,
        )
        .unwrap();
        assert_eq!(metadata.version.as_deref(), Some("2.0"));
        assert_eq!(metadata.metrics.unwrap().accuracy, Some(0.981));
        assert!(metadata.checksums.is_empty());
    }
}
