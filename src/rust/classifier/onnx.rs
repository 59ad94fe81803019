use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use log::info;
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;

use super::error::ClassifierError;
use super::model::{ClassProbabilities, ProbabilityModel};
use super::vectorizer::FeatureVector;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A classifier exported to ONNX, scored through ONNX Runtime.
///
/// The graph takes a `float[1, n_features]` input and exposes a `[1, 2]`
/// probabilities output ordered `[ham, spam]`.
pub struct OnnxModel {
    model_path: String,
    session: Session,
    input_name: String,
    probability_output: String,
    n_features: usize,
}

impl fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxModel")
            .field("model_path", &self.model_path)
            .field("input_name", &self.input_name)
            .field("probability_output", &self.probability_output)
            .field("n_features", &self.n_features)
            .finish()
    }
}

impl OnnxModel {
    pub fn from_file(path: &Path, n_features: usize, config: &RuntimeConfig) -> Result<Self, ClassifierError> {
        let session = create_session_builder(config)?.commit_from_file(path)?;
        let (input_name, probability_output) = Self::validate_model(&session)?;
        info!("ONNX model at {:?} uses input '{}' and output '{}'", path, input_name, probability_output);

        Ok(Self {
            model_path: path.to_string_lossy().to_string(),
            session,
            input_name,
            probability_output,
            n_features,
        })
    }

    /// Picks the feature input and the probabilities output
    fn validate_model(session: &Session) -> Result<(String, String), ClassifierError> {
        let input = session
            .inputs
            .first()
            .ok_or_else(|| ClassifierError::ModelError("Model has no inputs".into()))?;
        let output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .ok_or_else(|| ClassifierError::ModelError("Model has no outputs".into()))?;
        Ok((input.name.clone(), output.name.clone()))
    }
}

impl ProbabilityModel for OnnxModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn score_probabilities(&self, features: &FeatureVector) -> Result<ClassProbabilities, ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::ModelError(format!(
                "Expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let input_array = Array2::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create input array: {}", e)))?;
        let input_dyn = input_array.into_dyn();
        let input = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create input tensor: {}", e)))?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let probabilities = outputs[self.probability_output.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract probabilities: {}", e)))?;

        let values: Vec<f32> = probabilities.iter().copied().collect();
        if values.len() < 2 {
            return Err(ClassifierError::ModelError(format!(
                "Expected two class probabilities, got {}",
                values.len()
            )));
        }
        ClassProbabilities::from_spam(f64::from(values[1]).clamp(0.0, 1.0))
    }
}
