use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log;
use sha2::{Digest, Sha256};

use crate::classifier::{
    ClassifierBuilder, ClassifierError, ModelMetadata, ProbabilityModel, SpamClassifier,
    TextVectorizer, TfidfVectorizer, TreeEnsemble,
};

pub const VECTORIZER_FILE: &str = "vectorizer.json";
pub const MODEL_FILE: &str = "model.json";
pub const ONNX_MODEL_FILE: &str = "model.onnx";
pub const METADATA_FILE: &str = "metadata.json";

/// Subdirectory searched when an artifact is not directly in the artifacts directory
const FALLBACK_DIR: &str = "models";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Hash mismatch: expected {expected}, got {actual} for {file} file")]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("Invalid artifact: {0}")]
    Invalid(String),
}

/// Locates, verifies, and loads the offline-trained artifacts.
#[derive(Debug, Clone)]
pub struct ModelManager {
    artifacts_dir: PathBuf,
}

impl ModelManager {
    /// Creates a ModelManager over the default artifacts directory
    pub fn new_default() -> Self {
        Self::new(Self::get_default_artifacts_dir())
    }

    /// Returns the default artifacts directory path
    pub fn get_default_artifacts_dir() -> PathBuf {
        if let Ok(path) = env::var("SPAMSIFT_ARTIFACTS") {
            return PathBuf::from(path);
        }
        PathBuf::from(".")
    }

    pub fn new<P: AsRef<Path>>(artifacts_dir: P) -> Self {
        Self {
            artifacts_dir: artifacts_dir.as_ref().to_path_buf(),
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Finds an artifact directly in the artifacts directory, then under `models/`
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        [
            self.artifacts_dir.join(file_name),
            self.artifacts_dir.join(FALLBACK_DIR).join(file_name),
        ]
        .into_iter()
        .find(|path| path.is_file())
    }

    fn require(&self, file_name: &str) -> Result<PathBuf, ArtifactError> {
        self.resolve(file_name).ok_or_else(|| {
            log::warn!(
                "Ensure '{}' is in {:?} or its '{}' subdirectory",
                file_name,
                self.artifacts_dir,
                FALLBACK_DIR
            );
            ArtifactError::NotFound(file_name.to_string())
        })
    }

    pub fn vectorizer_path(&self) -> Result<PathBuf, ArtifactError> {
        self.require(VECTORIZER_FILE)
    }

    pub fn model_path(&self) -> Result<PathBuf, ArtifactError> {
        self.require(MODEL_FILE)
    }

    pub fn metadata_path(&self) -> Option<PathBuf> {
        self.resolve(METADATA_FILE)
    }

    /// True when both required artifacts can be located
    pub fn artifacts_present(&self) -> bool {
        let vectorizer = self.resolve(VECTORIZER_FILE);
        let model = self.resolve(MODEL_FILE).or_else(|| self.onnx_model_path());
        log::debug!("Checking artifacts: vectorizer={:?}, model={:?}", vectorizer, model);
        vectorizer.is_some() && model.is_some()
    }

    #[cfg(feature = "onnx")]
    fn onnx_model_path(&self) -> Option<PathBuf> {
        self.resolve(ONNX_MODEL_FILE)
    }

    #[cfg(not(feature = "onnx"))]
    fn onnx_model_path(&self) -> Option<PathBuf> {
        None
    }

    /// Loads `metadata.json` if present
    pub fn load_metadata(&self) -> Result<Option<ModelMetadata>, ArtifactError> {
        match self.metadata_path() {
            Some(path) => {
                log::info!("Loading metadata from {:?}", path);
                let bytes = fs::read(&path)?;
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            None => Ok(None),
        }
    }

    /// Computes the lowercase hex SHA-256 of a file
    pub fn file_hash(path: &Path) -> Result<String, ArtifactError> {
        let bytes = fs::read(path)?;
        Ok(Self::hash_bytes(&bytes))
    }

    fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    pub fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ArtifactError> {
        log::info!("Verifying file: {:?}", path);
        let hash = Self::file_hash(path)?;
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Reads an artifact, checking it against the metadata checksum when one is listed
    fn read_verified(
        &self,
        file_name: &str,
        metadata: Option<&ModelMetadata>,
    ) -> Result<(PathBuf, Vec<u8>), ArtifactError> {
        let path = self.require(file_name)?;
        let bytes = fs::read(&path)?;
        if let Some(expected) = metadata.and_then(|m| m.checksum_for(file_name)) {
            let actual = Self::hash_bytes(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                log::error!("{} hash mismatch: expected {}, got {}", file_name, expected, actual);
                return Err(ArtifactError::HashMismatch {
                    file: file_name.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }
        Ok((path, bytes))
    }

    pub fn load_vectorizer(&self, metadata: Option<&ModelMetadata>) -> Result<TfidfVectorizer, ArtifactError> {
        let (path, bytes) = self.read_verified(VECTORIZER_FILE, metadata)?;
        log::info!("Loading vectorizer from {:?}", path);
        TfidfVectorizer::from_json_slice(&bytes)
    }

    /// Loads the probability model. With the `onnx` feature a `model.onnx`
    /// artifact takes precedence over `model.json`.
    pub fn load_model(
        &self,
        metadata: Option<&ModelMetadata>,
        n_features: usize,
    ) -> Result<Arc<dyn ProbabilityModel>, ArtifactError> {
        if let Some(model) = self.load_onnx_model(metadata, n_features)? {
            return Ok(model);
        }

        let (path, bytes) = self.read_verified(MODEL_FILE, metadata)?;
        log::info!("Loading model from {:?}", path);
        let model = TreeEnsemble::from_json_slice(&bytes)?;
        if model.n_features() != n_features {
            return Err(ArtifactError::Invalid(format!(
                "Model expects {} features but vectorizer produces {}",
                model.n_features(),
                n_features
            )));
        }
        Ok(Arc::new(model))
    }

    #[cfg(feature = "onnx")]
    fn load_onnx_model(
        &self,
        metadata: Option<&ModelMetadata>,
        n_features: usize,
    ) -> Result<Option<Arc<dyn ProbabilityModel>>, ArtifactError> {
        if self.onnx_model_path().is_none() {
            return Ok(None);
        }
        let (path, _) = self.read_verified(ONNX_MODEL_FILE, metadata)?;
        log::info!("Loading ONNX model from {:?}", path);
        let model = crate::classifier::OnnxModel::from_file(
            &path,
            n_features,
            &crate::runtime::RuntimeConfig::default(),
        )
        .map_err(|e| ArtifactError::Invalid(e.to_string()))?;
        Ok(Some(Arc::new(model)))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx_model(
        &self,
        _metadata: Option<&ModelMetadata>,
        _n_features: usize,
    ) -> Result<Option<Arc<dyn ProbabilityModel>>, ArtifactError> {
        Ok(None)
    }

    /// Loads and verifies every artifact and assembles a classifier.
    ///
    /// Vectorizer failures surface as `TransformError`, everything else as `ModelError`.
    pub fn load_classifier(&self, max_message_chars: usize) -> Result<SpamClassifier, ClassifierError> {
        let metadata = self.load_metadata().map_err(|e| {
            log::error!("Failed to load metadata: {}", e);
            ClassifierError::ModelError(format!("Failed to load metadata: {}", e))
        })?;

        let vectorizer = self.load_vectorizer(metadata.as_ref()).map_err(|e| {
            log::error!("Failed to load vectorizer: {}", e);
            ClassifierError::TransformError(e.to_string())
        })?;

        let model = self.load_model(metadata.as_ref(), vectorizer.n_features()).map_err(|e| {
            log::error!("Failed to load model: {}", e);
            ClassifierError::ModelError(e.to_string())
        })?;

        let mut builder = ClassifierBuilder::new()
            .with_max_message_chars(max_message_chars)
            .with_vectorizer(vectorizer)
            .with_shared_model(model);
        if let Some(metadata) = metadata {
            builder = builder.with_metadata(metadata);
        }
        let classifier = builder.build()?;

        log::info!("Models loaded successfully");
        Ok(classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_artifacts_dir() {
        env::set_var("SPAMSIFT_ARTIFACTS", "/tmp/test-spamsift");
        let path = ModelManager::get_default_artifacts_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-spamsift"));
        env::remove_var("SPAMSIFT_ARTIFACTS");

        assert_eq!(ModelManager::get_default_artifacts_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_hash_bytes() {
        assert_eq!(
            ModelManager::hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_missing_artifacts() {
        let manager = ModelManager::new("/nonexistent/spamsift");
        assert!(!manager.artifacts_present());
        assert!(matches!(manager.vectorizer_path(), Err(ArtifactError::NotFound(_))));
        assert!(manager.load_metadata().unwrap().is_none());
        assert!(matches!(
            manager.load_classifier(5000),
            Err(ClassifierError::TransformError(_))
        ));
    }
}
