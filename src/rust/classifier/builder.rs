use std::path::Path;
use std::sync::Arc;

use log::{error, info};

use super::classifier::{SpamClassifier, DEFAULT_MAX_MESSAGE_CHARS};
use super::error::ClassifierError;
use super::forest::TreeEnsemble;
use super::model::{ModelMetadata, ProbabilityModel};
use super::vectorizer::{TextVectorizer, TfidfVectorizer};
#[cfg(feature = "onnx")]
use crate::runtime::RuntimeConfig;

/// A builder for constructing a SpamClassifier with a fluent interface.
#[derive(Debug)]
pub struct ClassifierBuilder {
    vectorizer: Option<Arc<dyn TextVectorizer>>,
    model: Option<Arc<dyn ProbabilityModel>>,
    max_message_chars: usize,
    metadata: Option<Arc<ModelMetadata>>,
    #[cfg(feature = "onnx")]
    runtime_config: RuntimeConfig,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Creates an empty builder with the default 5000-character message limit
    pub fn new() -> Self {
        Self {
            vectorizer: None,
            model: None,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            metadata: None,
            #[cfg(feature = "onnx")]
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the maximum accepted message length, in characters
    pub fn with_max_message_chars(mut self, max_message_chars: usize) -> Self {
        self.max_message_chars = max_message_chars;
        self
    }

    /// Attaches training metadata reported through [`SpamClassifier::info`]
    pub fn with_metadata(mut self, metadata: ModelMetadata) -> Self {
        self.metadata = Some(Arc::new(metadata));
        self
    }

    /// Uses an already constructed vectorizer
    pub fn with_vectorizer(mut self, vectorizer: impl TextVectorizer + 'static) -> Self {
        self.vectorizer = Some(Arc::new(vectorizer));
        self
    }

    /// Loads a `vectorizer.json` artifact.
    ///
    /// # Errors
    /// - `TransformError` if the vectorizer is already set, or the file is missing or invalid
    pub fn with_vectorizer_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ClassifierError> {
        if self.vectorizer.is_some() {
            return Err(ClassifierError::TransformError("Vectorizer already set".into()));
        }
        let path = path.as_ref();
        let vectorizer = TfidfVectorizer::from_file(path).map_err(|e| {
            error!("Failed to load vectorizer from {:?}: {}", path, e);
            ClassifierError::TransformError(format!("Failed to load vectorizer: {}", e))
        })?;
        info!(
            "Vectorizer loaded successfully ({} terms, {} features)",
            vectorizer.vocabulary_size(),
            vectorizer.n_features()
        );
        Ok(self.with_vectorizer(vectorizer))
    }

    /// Uses an already constructed probability model
    pub fn with_model(mut self, model: impl ProbabilityModel + 'static) -> Self {
        self.model = Some(Arc::new(model));
        self
    }

    pub(crate) fn with_shared_model(mut self, model: Arc<dyn ProbabilityModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Loads a tree-ensemble `model.json` artifact.
    ///
    /// # Errors
    /// - `ModelError` if the model is already set, or the file is missing or invalid
    pub fn with_model_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ClassifierError> {
        if self.model.is_some() {
            return Err(ClassifierError::ModelError("Model already set".into()));
        }
        let path = path.as_ref();
        let model = TreeEnsemble::from_file(path).map_err(|e| {
            error!("Failed to load model from {:?}: {}", path, e);
            ClassifierError::ModelError(format!("Failed to load model: {}", e))
        })?;
        info!("Model loaded successfully ({} trees)", model.n_trees());
        Ok(self.with_model(model))
    }

    /// Sets the runtime configuration for ONNX model execution
    #[cfg(feature = "onnx")]
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Loads an ONNX classifier. The vectorizer must be set first so the input
    /// width is known.
    #[cfg(feature = "onnx")]
    pub fn with_onnx_model<P: AsRef<Path>>(self, path: P) -> Result<Self, ClassifierError> {
        if self.model.is_some() {
            return Err(ClassifierError::ModelError("Model already set".into()));
        }
        let n_features = self
            .vectorizer
            .as_ref()
            .map(|v| v.n_features())
            .ok_or_else(|| ClassifierError::ModelError("Vectorizer must be set before an ONNX model".into()))?;
        let model = super::onnx::OnnxModel::from_file(path.as_ref(), n_features, &self.runtime_config)?;
        info!("ONNX model loaded successfully");
        Ok(self.with_model(model))
    }

    /// Builds and returns the final SpamClassifier instance
    ///
    /// # Errors
    /// - `TransformError` if no vectorizer was set
    /// - `ModelError` if no model was set, or its input width differs from the vectorizer's output
    pub fn build(self) -> Result<SpamClassifier, ClassifierError> {
        let vectorizer = self
            .vectorizer
            .ok_or_else(|| ClassifierError::TransformError("No vectorizer loaded".into()))?;
        let model = self
            .model
            .ok_or_else(|| ClassifierError::ModelError("No model loaded".into()))?;

        if vectorizer.n_features() != model.n_features() {
            return Err(ClassifierError::ModelError(format!(
                "Model expects {} features but vectorizer produces {}",
                model.n_features(),
                vectorizer.n_features()
            )));
        }

        Ok(SpamClassifier {
            vectorizer,
            model,
            max_message_chars: self.max_message_chars,
            metadata: self.metadata,
        })
    }
}
