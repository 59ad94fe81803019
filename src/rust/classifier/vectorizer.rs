use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use lazy_static::lazy_static;
use ndarray::Array1;
use regex::Regex;
use serde::Deserialize;

use super::error::ClassifierError;
use super::utils::normalize_vector;
use crate::model_manager::ArtifactError;

/// Dense TF-IDF feature vector. Its length is fixed by the fitted vocabulary.
pub type FeatureVector = Array1<f32>;

/// Token pattern used by the offline vectorizer when the artifact does not name one.
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

lazy_static! {
    static ref DEFAULT_TOKEN_REGEX: Regex =
        Regex::new(DEFAULT_TOKEN_PATTERN).expect("default token pattern is valid");
}

/// Converts raw text into a fixed-width numeric feature vector.
///
/// Implementations must be deterministic: the same text always yields a
/// bit-identical vector, and no call mutates shared state.
pub trait TextVectorizer: Send + Sync + fmt::Debug {
    /// Number of columns in every vector produced by [`TextVectorizer::transform`]
    fn n_features(&self) -> usize;

    /// Transforms one message into its feature vector.
    ///
    /// # Errors
    /// - `TransformError` if the fitted state cannot produce a vector
    fn transform(&self, text: &str) -> Result<FeatureVector, ClassifierError>;
}

/// Row normalization applied after TF-IDF weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    L2,
    None,
}

/// The fitted vectorizer state as exported by the training pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorizerParams {
    /// Term (unigram or space-joined n-gram) to column index
    pub vocabulary: HashMap<String, usize>,
    /// Inverse document frequency per column
    pub idf: Vec<f32>,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Norm,
    #[serde(default)]
    pub token_pattern: Option<String>,
}

fn default_lowercase() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// A pre-fitted TF-IDF vectorizer.
///
/// Analysis follows the training pipeline: lowercase, regex tokenization,
/// stop-word removal, then word n-grams over the remaining tokens.
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Array1<f32>,
    lowercase: bool,
    stop_words: HashSet<String>,
    ngram_range: (usize, usize),
    sublinear_tf: bool,
    norm: Norm,
    token_pattern: Option<Regex>,
}

impl fmt::Debug for TfidfVectorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TfidfVectorizer")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("n_features", &self.idf.len())
            .field("ngram_range", &self.ngram_range)
            .field("sublinear_tf", &self.sublinear_tf)
            .field("norm", &self.norm)
            .finish()
    }
}

impl TfidfVectorizer {
    /// Builds a vectorizer from fitted parameters, rejecting inconsistent state.
    pub fn new(params: VectorizerParams) -> Result<Self, ArtifactError> {
        if params.idf.is_empty() {
            return Err(ArtifactError::Invalid("Vectorizer has no features".into()));
        }
        if let Some(pos) = params.idf.iter().position(|w| !w.is_finite()) {
            return Err(ArtifactError::Invalid(format!("Non-finite idf weight at column {}", pos)));
        }
        let n_features = params.idf.len();
        if let Some((term, idx)) = params.vocabulary.iter().find(|(_, idx)| **idx >= n_features) {
            return Err(ArtifactError::Invalid(format!(
                "Term '{}' maps to column {} but only {} columns exist",
                term,
                idx,
                params.idf.len()
            )));
        }
        let (min_n, max_n) = params.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ArtifactError::Invalid(format!(
                "Invalid ngram range ({}, {})",
                min_n, max_n
            )));
        }
        let token_pattern = match params.token_pattern {
            Some(pattern) if pattern != DEFAULT_TOKEN_PATTERN => Some(
                Regex::new(&pattern)
                    .map_err(|e| ArtifactError::Invalid(format!("Invalid token pattern: {}", e)))?,
            ),
            _ => None,
        };

        Ok(Self {
            vocabulary: params.vocabulary,
            idf: Array1::from(params.idf),
            lowercase: params.lowercase,
            stop_words: params.stop_words.into_iter().collect(),
            ngram_range: params.ngram_range,
            sublinear_tf: params.sublinear_tf,
            norm: params.norm,
            token_pattern,
        })
    }

    /// Parses a `vectorizer.json` artifact
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let params: VectorizerParams = serde_json::from_slice(bytes)?;
        Self::new(params)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path)?;
        Self::from_json_slice(&bytes)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Splits text into the terms the vocabulary is keyed on.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let text: Cow<'_, str> = if self.lowercase {
            Cow::Owned(text.to_lowercase())
        } else {
            Cow::Borrowed(text)
        };
        let pattern = self.token_pattern.as_ref().unwrap_or(&*DEFAULT_TOKEN_REGEX);

        let tokens: Vec<&str> = pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(*token))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }
}

impl TextVectorizer for TfidfVectorizer {
    fn n_features(&self) -> usize {
        self.idf.len()
    }

    fn transform(&self, text: &str) -> Result<FeatureVector, ClassifierError> {
        let mut counts: Array1<f32> = Array1::zeros(self.idf.len());
        for term in self.analyze(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                counts[idx] += 1.0;
            }
        }

        if self.sublinear_tf {
            counts.mapv_inplace(|c| if c > 0.0 { 1.0 + c.ln() } else { 0.0 });
        }
        counts *= &self.idf;

        let features = match self.norm {
            Norm::L2 => normalize_vector(&counts),
            Norm::None => counts,
        };

        if features.iter().any(|x| !x.is_finite()) {
            return Err(ClassifierError::TransformError(
                "Vectorizer produced a non-finite feature".into(),
            ));
        }
        Ok(features)
    }
}
