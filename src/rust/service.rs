use std::sync::Arc;

use log::{error, info};
use tokio::sync::OnceCell;

use crate::classifier::{validate_message, ClassifierError, ModelMetadata, SpamClassifier, Verdict};
use crate::model_manager::ModelManager;

/// Serves predictions from artifacts loaded once and shared read-only.
///
/// Loading happens behind a one-time initialization cell. A failed load
/// leaves the cell empty, so the next request retries instead of the
/// failure sticking for the life of the process.
#[derive(Debug)]
pub struct PredictionService {
    manager: ModelManager,
    max_message_chars: usize,
    classifier: OnceCell<Arc<SpamClassifier>>,
}

impl PredictionService {
    pub fn new(manager: ModelManager, max_message_chars: usize) -> Self {
        Self {
            manager,
            max_message_chars,
            classifier: OnceCell::new(),
        }
    }

    /// Wraps a classifier that is already loaded
    pub fn from_classifier(classifier: SpamClassifier) -> Self {
        let max_message_chars = classifier.max_message_chars();
        Self {
            manager: ModelManager::new_default(),
            max_message_chars,
            classifier: OnceCell::new_with(Some(Arc::new(classifier))),
        }
    }

    pub fn max_message_chars(&self) -> usize {
        self.max_message_chars
    }

    pub fn is_ready(&self) -> bool {
        self.classifier.initialized()
    }

    /// The loaded classifier, if loading has succeeded
    pub fn classifier(&self) -> Option<Arc<SpamClassifier>> {
        self.classifier.get().cloned()
    }

    /// Training metadata of the loaded artifacts
    pub fn metadata(&self) -> Option<ModelMetadata> {
        self.classifier.get().and_then(|c| c.metadata().cloned())
    }

    /// Loads the artifacts if they are not loaded yet.
    pub async fn warm_up(&self) -> Result<Arc<SpamClassifier>, ClassifierError> {
        let classifier = self
            .classifier
            .get_or_try_init(|| async {
                let manager = self.manager.clone();
                let max_message_chars = self.max_message_chars;
                info!("Loading artifacts from {:?}", manager.artifacts_dir());
                let classifier = tokio::task::spawn_blocking(move || manager.load_classifier(max_message_chars))
                    .await
                    .map_err(|e| ClassifierError::ModelError(format!("Artifact loading task failed: {}", e)))??;
                Ok::<_, ClassifierError>(Arc::new(classifier))
            })
            .await?;
        Ok(Arc::clone(classifier))
    }

    /// Validates, transforms, and scores one message.
    ///
    /// Input errors are reported before the artifacts are touched, so they are
    /// returned even while the model is unavailable.
    pub async fn predict(&self, raw_text: &str) -> Result<Verdict, ClassifierError> {
        let message = validate_message(raw_text, self.max_message_chars)?;
        let classifier = self.warm_up().await.map_err(|e| {
            error!("Classifier unavailable: {}", e);
            e
        })?;
        classifier.predict(message)
    }
}
