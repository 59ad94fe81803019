mod error;
mod vectorizer;
mod model;
mod forest;
#[cfg(feature = "onnx")]
mod onnx;
mod verdict;
mod classifier;
pub mod builder;
mod utils;

pub use error::ClassifierError;
pub use vectorizer::{FeatureVector, Norm, TextVectorizer, TfidfVectorizer, VectorizerParams, DEFAULT_TOKEN_PATTERN};
pub use model::{ClassProbabilities, ModelMetadata, ModelMetrics, ProbabilityModel, PROBABILITY_TOLERANCE};
pub use forest::{DecisionTree, SigmoidCalibration, TreeEnsemble};
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;
pub use verdict::{Label, RoundedConfidence, Verdict};
pub use classifier::{validate_message, SpamClassifier, DEFAULT_MAX_MESSAGE_CHARS};
pub use builder::ClassifierBuilder;

/// Information about the artifacts backing a classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInfo {
    /// Width of the feature vectors produced by the vectorizer
    pub n_features: usize,
    /// Artifact format of the probability model
    pub model_kind: String,
    /// Maximum accepted message length, in characters
    pub max_message_chars: usize,
    /// Version string from the training metadata, if any
    pub model_version: Option<String>,
}
