use std::fmt;

/// Represents the different types of errors that can occur while classifying a message.
///
/// The first two variants are caused by the caller's input and can always be fixed by
/// resubmitting. The last two mean the backing artifacts are unavailable.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// The message was empty or contained only whitespace
    EmptyInput,
    /// The message exceeded the configured maximum number of characters
    InputTooLong { length: usize, max: usize },
    /// The vectorizer artifact is missing, corrupt, or produced an unusable vector
    TransformError(String),
    /// The classifier artifact is missing, corrupt, or failed to score
    ModelError(String),
}

impl ClassifierError {
    /// Returns true for errors caused by the submitted text rather than the service
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::InputTooLong { .. })
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Please enter a message to classify."),
            Self::InputTooLong { max, .. } => {
                write!(f, "Message is too long. Please limit to {} characters.", max)
            }
            Self::TransformError(msg) => write!(f, "Transform error: {}", msg),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

#[cfg(feature = "onnx")]
impl From<ort::Error> for ClassifierError {
    fn from(err: ort::Error) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}
