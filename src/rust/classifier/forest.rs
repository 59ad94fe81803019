use std::path::Path;

use serde::Deserialize;

use super::error::ClassifierError;
use super::model::{ClassProbabilities, ProbabilityModel};
use super::vectorizer::FeatureVector;
use crate::model_manager::ArtifactError;

const LEAF: i64 = -1;

/// One fitted decision tree in array-of-nodes layout.
///
/// Node `i` is a leaf when `children_left[i] == -1`. Otherwise a sample goes
/// left when `x[feature[i]] <= threshold[i]` and right otherwise. `value[i]`
/// holds the `[ham, spam]` class weights at that node.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<[f64; 2]>,
}

impl DecisionTree {
    pub fn new(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        feature: Vec<i64>,
        threshold: Vec<f64>,
        value: Vec<[f64; 2]>,
    ) -> Self {
        Self { children_left, children_right, feature, threshold, value }
    }

    /// A single split with two leaves
    pub fn stump(feature: usize, threshold: f64, left: [f64; 2], right: [f64; 2]) -> Self {
        Self::new(
            vec![1, LEAF, LEAF],
            vec![2, LEAF, LEAF],
            vec![feature as i64, -2, -2],
            vec![threshold, -2.0, -2.0],
            vec![[left[0] + right[0], left[1] + right[1]], left, right],
        )
    }

    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    /// Checks the node arrays. Children must point forward so traversal always terminates.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err("node arrays have different lengths".into());
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(format!("node {} has exactly one child", node));
                }
                let [ham, spam] = self.value[node];
                if !(ham.is_finite() && spam.is_finite()) || ham < 0.0 || spam < 0.0 || ham + spam <= 0.0 {
                    return Err(format!("leaf {} has invalid class weights", node));
                }
                continue;
            }
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {} has out-of-order child {}", node, child));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {} splits on unknown feature {}", node, feature));
            }
            if self.threshold[node].is_nan() {
                return Err(format!("node {} has a NaN threshold", node));
            }
        }
        Ok(())
    }

    fn leaf_index(&self, features: &FeatureVector) -> usize {
        let mut node = 0;
        loop {
            let left = self.children_left[node];
            if left == LEAF {
                return node;
            }
            let x = f64::from(features[self.feature[node] as usize]);
            node = if x <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
    }

    /// Spam probability at the leaf reached by `features`
    pub fn spam_probability(&self, features: &FeatureVector) -> f64 {
        let [ham, spam] = self.value[self.leaf_index(features)];
        spam / (ham + spam)
    }
}

/// Platt scaling applied to the averaged spam probability.
///
/// One pair covers the whole ensemble; per-fold calibrated members are not
/// representable and must be refit as a single calibrated model before export.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SigmoidCalibration {
    pub a: f64,
    pub b: f64,
}

impl SigmoidCalibration {
    pub fn apply(&self, p: f64) -> f64 {
        1.0 / (1.0 + (self.a * p + self.b).exp())
    }
}

#[derive(Debug, Deserialize)]
struct ForestParams {
    n_features: usize,
    trees: Vec<DecisionTree>,
    #[serde(default)]
    calibration: Option<SigmoidCalibration>,
}

/// A randomized tree ensemble loaded from `model.json`.
///
/// Probabilities are the mean of the per-tree leaf distributions, optionally
/// passed through a sigmoid calibration.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    n_features: usize,
    trees: Vec<DecisionTree>,
    calibration: Option<SigmoidCalibration>,
}

impl TreeEnsemble {
    pub fn new(
        n_features: usize,
        trees: Vec<DecisionTree>,
        calibration: Option<SigmoidCalibration>,
    ) -> Result<Self, ArtifactError> {
        if n_features == 0 {
            return Err(ArtifactError::Invalid("Model accepts zero features".into()));
        }
        if trees.is_empty() {
            return Err(ArtifactError::Invalid("Model has no trees".into()));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|e| ArtifactError::Invalid(format!("Tree {}: {}", i, e)))?;
        }
        if let Some(c) = calibration {
            if !(c.a.is_finite() && c.b.is_finite()) {
                return Err(ArtifactError::Invalid("Calibration parameters must be finite".into()));
            }
        }
        Ok(Self { n_features, trees, calibration })
    }

    /// Parses a `model.json` artifact
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let params: ForestParams = serde_json::from_slice(bytes)?;
        Self::new(params.n_features, params.trees, params.calibration)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path)?;
        Self::from_json_slice(&bytes)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl ProbabilityModel for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "tree-ensemble"
    }

    fn score_probabilities(&self, features: &FeatureVector) -> Result<ClassProbabilities, ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::ModelError(format!(
                "Expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let total: f64 = self.trees.iter().map(|tree| tree.spam_probability(features)).sum();
        let mut spam = total / self.trees.len() as f64;
        if let Some(calibration) = &self.calibration {
            spam = calibration.apply(spam);
        }
        ClassProbabilities::from_spam(spam.clamp(0.0, 1.0))
    }
}
