use std::sync::Arc;

use super::builder::ClassifierBuilder;
use super::error::ClassifierError;
use super::model::{ClassProbabilities, ModelMetadata, ProbabilityModel};
use super::vectorizer::TextVectorizer;
use super::verdict::Verdict;
use super::ClassifierInfo;

/// Default upper bound on message length, in characters
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 5000;

/// Checks a raw message and returns it with surrounding whitespace removed.
///
/// Length is counted in characters of the trimmed text. Over-long input is
/// rejected rather than truncated.
pub fn validate_message(raw_text: &str, max_chars: usize) -> Result<&str, ClassifierError> {
    let message = raw_text.trim();
    if message.is_empty() {
        return Err(ClassifierError::EmptyInput);
    }
    let length = message.chars().count();
    if length > max_chars {
        return Err(ClassifierError::InputTooLong { length, max: max_chars });
    }
    Ok(message)
}

/// A thread-safe spam classifier pairing a pre-fitted vectorizer with a
/// pre-fitted probability model.
///
/// # Thread Safety
///
/// All fitted state sits behind `Arc` and is never mutated after
/// construction, so one instance can serve concurrent requests:
///
/// ```rust,no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use spamsift::SpamClassifier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let classifier = Arc::new(
///     SpamClassifier::builder()
///         .with_vectorizer_file("vectorizer.json")?
///         .with_model_file("model.json")?
///         .build()?,
/// );
///
/// let classifier_clone = Arc::clone(&classifier);
/// thread::spawn(move || {
///     classifier_clone.predict("Hi, when are we meeting?").unwrap();
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SpamClassifier {
    pub(crate) vectorizer: Arc<dyn TextVectorizer>,
    pub(crate) model: Arc<dyn ProbabilityModel>,
    pub(crate) max_message_chars: usize,
    pub(crate) metadata: Option<Arc<ModelMetadata>>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<SpamClassifier>();
    }
};

impl SpamClassifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }

    /// Returns information about the loaded artifacts
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            n_features: self.vectorizer.n_features(),
            model_kind: self.model.kind().to_string(),
            max_message_chars: self.max_message_chars,
            model_version: self.metadata.as_ref().and_then(|m| m.version.clone()),
        }
    }

    pub fn max_message_chars(&self) -> usize {
        self.max_message_chars
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_deref()
    }

    /// Runs transform and scoring on an already validated message.
    pub fn score_probabilities(&self, message: &str) -> Result<ClassProbabilities, ClassifierError> {
        let features = self.vectorizer.transform(message)?;
        if features.len() != self.model.n_features() {
            return Err(ClassifierError::TransformError(format!(
                "Vectorizer produced {} features, model expects {}",
                features.len(),
                self.model.n_features()
            )));
        }
        self.model.score_probabilities(&features)
    }

    /// Classifies a message as spam or legitimate.
    ///
    /// Input is validated before any transform work is done.
    ///
    /// # Errors
    /// - `EmptyInput` if the message is empty after trimming
    /// - `InputTooLong` if it exceeds the configured maximum
    /// - `TransformError` / `ModelError` if the fitted artifacts fail
    pub fn predict(&self, raw_text: &str) -> Result<Verdict, ClassifierError> {
        let message = validate_message(raw_text, self.max_message_chars)?;
        let probabilities = self.score_probabilities(message)?;
        Ok(Verdict::from_probabilities(probabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::forest::{DecisionTree, TreeEnsemble};
    use crate::classifier::vectorizer::FeatureVector;
    use crate::classifier::verdict::Label;
    use crate::classifier::TfidfVectorizer;
    use serde_json::json;

    #[derive(Debug)]
    struct FixedModel(f64, f64);

    impl ProbabilityModel for FixedModel {
        fn n_features(&self) -> usize {
            2
        }

        fn kind(&self) -> &'static str {
            "fixed"
        }

        fn score_probabilities(&self, _: &FeatureVector) -> Result<ClassProbabilities, ClassifierError> {
            ClassProbabilities::new(self.0, self.1)
        }
    }

    fn vectorizer() -> TfidfVectorizer {
        let params = json!({ "vocabulary": { "prize": 0, "meeting": 1 }, "idf": [2.0, 1.5] });
        TfidfVectorizer::from_json_slice(params.to_string().as_bytes()).unwrap()
    }

    fn classifier_with(model: impl ProbabilityModel + 'static) -> SpamClassifier {
        SpamClassifier::builder()
            .with_vectorizer(vectorizer())
            .with_model(model)
            .build()
            .unwrap()
    }

    #[test]
    fn test_validate_message_trims() {
        assert_eq!(validate_message("  hello \n", 10).unwrap(), "hello");
    }

    #[test]
    fn test_validate_counts_characters_not_bytes() {
        let text = "é".repeat(5000);
        assert!(validate_message(&text, 5000).is_ok());
        assert!(validate_message(&format!("{}é", text), 5000).is_err());
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert_eq!(validate_message(" \t\n ", 10), Err(ClassifierError::EmptyInput));
    }

    #[test]
    fn test_tie_resolves_to_legitimate() {
        let classifier = classifier_with(FixedModel(0.5, 0.5));
        let verdict = classifier.predict("anything at all").unwrap();
        assert_eq!(verdict.label, Label::Legitimate);
        assert_eq!(verdict.confidence_percent, 50.0);
    }

    #[test]
    fn test_predict_with_tree_model() {
        let model = TreeEnsemble::new(
            2,
            vec![DecisionTree::stump(0, 0.0, [9.0, 1.0], [1.0, 9.0])],
            None,
        )
        .unwrap();
        let classifier = classifier_with(model);
        assert!(classifier.predict("Win a prize").unwrap().is_spam());
        assert!(!classifier.predict("Team meeting").unwrap().is_spam());
    }

    #[test]
    fn test_info() {
        let classifier = classifier_with(FixedModel(0.2, 0.8));
        let info = classifier.info();
        assert_eq!(info.n_features, 2);
        assert_eq!(info.model_kind, "fixed");
        assert_eq!(info.max_message_chars, DEFAULT_MAX_MESSAGE_CHARS);
        assert!(info.model_version.is_none());
    }
}
