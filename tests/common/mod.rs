#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use spamsift::classifier::{TfidfVectorizer, TreeEnsemble};
use spamsift::{ModelManager, SpamClassifier};

pub const SPAM_MESSAGE: &str = "Congratulations! You've won a free prize. Call now to claim your prize!";
pub const CONGRATULATIONS_MESSAGE: &str = "Congratulations! You won! Claim your prize now!";
pub const HAM_MESSAGE: &str = "Hi, when are we meeting?";

/// Scores for the fixture forest, as percentages
pub const SPAM_MESSAGE_SPAM_PERCENT: f64 = 81.7;
pub const HAM_MESSAGE_SPAM_PERCENT: f64 = 10.0;

pub const N_FEATURES: usize = 16;

pub fn vectorizer_json() -> Value {
    json!({
        "vocabulary": {
            "congratulations": 0, "won": 1, "claim": 2, "prize": 3,
            "free": 4, "now": 5, "hi": 6, "meeting": 7,
            "lunch": 8, "tomorrow": 9, "claim prize": 10, "call": 11,
            "txt": 12, "see": 13, "later": 14, "urgent": 15
        },
        "idf": [2.3, 2.1, 2.4, 2.0, 1.7, 1.5, 1.8, 2.2, 2.1, 1.9, 2.5, 1.6, 2.4, 1.6, 1.7, 2.3],
        "lowercase": true,
        "stop_words": ["a", "are", "is", "the", "to", "we", "when", "you", "your"],
        "ngram_range": [1, 2],
        "sublinear_tf": true,
        "norm": "l2"
    })
}

/// Three trees keyed on "prize"/"won", "claim" and "meeting"
pub fn model_json() -> Value {
    json!({
        "n_features": N_FEATURES,
        "trees": [
            {
                "children_left": [1, 2, -1, -1, -1],
                "children_right": [4, 3, -1, -1, -1],
                "feature": [3, 1, -2, -2, -2],
                "threshold": [0.0, 0.0, -2.0, -2.0, -2.0],
                "value": [[10.5, 14.5], [10.0, 5.0], [9.0, 1.0], [1.0, 4.0], [0.5, 9.5]]
            },
            {
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [2, -2, -2],
                "threshold": [0.05, -2.0, -2.0],
                "value": [[9.0, 11.0], [8.0, 2.0], [1.0, 9.0]]
            },
            {
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [7, -2, -2],
                "threshold": [0.0, -2.0, -2.0],
                "value": [[14.0, 6.0], [4.0, 6.0], [10.0, 0.0]]
            }
        ]
    })
}

pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// Writes `vectorizer.json` and `model.json` into `dir`
pub fn write_artifacts(dir: &Path) {
    write_json(&dir.join("vectorizer.json"), &vectorizer_json());
    write_json(&dir.join("model.json"), &model_json());
}

/// Writes the artifacts plus a `metadata.json` listing their checksums
pub fn write_artifacts_with_metadata(dir: &Path, version: &str) {
    write_artifacts(dir);
    let checksums = json!({
        "vectorizer.json": ModelManager::file_hash(&dir.join("vectorizer.json")).unwrap(),
        "model.json": ModelManager::file_hash(&dir.join("model.json")).unwrap(),
    });
    write_json(
        &dir.join("metadata.json"),
        &json!({
            "version": version,
            "metrics": { "accuracy": 0.97, "precision": 0.95, "recall": 0.9, "f1_score": 0.92 },
            "checksums": checksums
        }),
    );
}

pub fn fixture_vectorizer() -> TfidfVectorizer {
    TfidfVectorizer::from_json_slice(vectorizer_json().to_string().as_bytes()).unwrap()
}

pub fn fixture_model() -> TreeEnsemble {
    TreeEnsemble::from_json_slice(model_json().to_string().as_bytes()).unwrap()
}

pub fn fixture_classifier() -> SpamClassifier {
    SpamClassifier::builder()
        .with_vectorizer(fixture_vectorizer())
        .with_model(fixture_model())
        .build()
        .unwrap()
}
