mod common;

use std::fs;

use common::*;
use serde_json::json;
use spamsift::{ArtifactError, ClassifierError, Label, ModelManager};
use tempfile::tempdir;

#[test]
fn test_loads_from_artifacts_dir() {
    let dir = tempdir().unwrap();
    write_artifacts(dir.path());

    let manager = ModelManager::new(dir.path());
    assert!(manager.artifacts_present());
    assert!(manager.load_metadata().unwrap().is_none());

    let classifier = manager.load_classifier(5000).unwrap();
    assert_eq!(classifier.predict(SPAM_MESSAGE).unwrap().label, Label::Spam);
    assert!(classifier.info().model_version.is_none());
}

#[test]
fn test_falls_back_to_models_subdirectory() {
    let dir = tempdir().unwrap();
    write_artifacts(&dir.path().join("models"));

    let manager = ModelManager::new(dir.path());
    assert_eq!(
        manager.vectorizer_path().unwrap(),
        dir.path().join("models").join("vectorizer.json")
    );
    let classifier = manager.load_classifier(5000).unwrap();
    assert_eq!(classifier.predict(HAM_MESSAGE).unwrap().label, Label::Legitimate);
}

#[test]
fn test_top_level_artifact_wins_over_fallback() {
    let dir = tempdir().unwrap();
    write_artifacts(dir.path());
    write_artifacts(&dir.path().join("models"));

    let manager = ModelManager::new(dir.path());
    assert_eq!(manager.model_path().unwrap(), dir.path().join("model.json"));
}

#[test]
fn test_metadata_and_checksums() {
    let dir = tempdir().unwrap();
    write_artifacts_with_metadata(dir.path(), "2024.06-rf");

    let manager = ModelManager::new(dir.path());
    let metadata = manager.load_metadata().unwrap().unwrap();
    assert_eq!(metadata.version.as_deref(), Some("2024.06-rf"));
    assert_eq!(metadata.metrics.as_ref().unwrap().accuracy, Some(0.97));

    let vectorizer_path = manager.vectorizer_path().unwrap();
    let expected = metadata.checksum_for("vectorizer.json").unwrap();
    assert!(manager.verify_file(&vectorizer_path, expected).unwrap());

    let classifier = manager.load_classifier(5000).unwrap();
    assert_eq!(classifier.info().model_version.as_deref(), Some("2024.06-rf"));
}

#[test]
fn test_checksum_mismatch_rejects_model() {
    let dir = tempdir().unwrap();
    write_artifacts_with_metadata(dir.path(), "v1");
    // Same content, different bytes
    fs::write(dir.path().join("model.json"), model_json().to_string()).unwrap();

    let manager = ModelManager::new(dir.path());
    assert!(matches!(
        manager.load_model(manager.load_metadata().unwrap().as_ref(), N_FEATURES),
        Err(ArtifactError::HashMismatch { .. })
    ));
    assert!(matches!(manager.load_classifier(5000), Err(ClassifierError::ModelError(_))));
}

#[test]
fn test_checksum_mismatch_rejects_vectorizer() {
    let dir = tempdir().unwrap();
    write_artifacts_with_metadata(dir.path(), "v1");
    fs::write(dir.path().join("vectorizer.json"), vectorizer_json().to_string()).unwrap();

    let manager = ModelManager::new(dir.path());
    assert!(matches!(manager.load_classifier(5000), Err(ClassifierError::TransformError(_))));
}

#[test]
fn test_missing_model_is_model_error() {
    let dir = tempdir().unwrap();
    write_json(&dir.path().join("vectorizer.json"), &vectorizer_json());

    let manager = ModelManager::new(dir.path());
    assert!(!manager.artifacts_present());
    assert!(matches!(manager.model_path(), Err(ArtifactError::NotFound(_))));
    assert!(matches!(manager.load_classifier(5000), Err(ClassifierError::ModelError(_))));
}

#[test]
fn test_corrupt_artifacts() {
    let dir = tempdir().unwrap();
    write_artifacts(dir.path());
    fs::write(dir.path().join("vectorizer.json"), b"{ not json").unwrap();
    let manager = ModelManager::new(dir.path());
    assert!(matches!(manager.load_classifier(5000), Err(ClassifierError::TransformError(_))));

    write_artifacts(dir.path());
    fs::write(dir.path().join("model.json"), b"[]").unwrap();
    assert!(matches!(manager.load_classifier(5000), Err(ClassifierError::ModelError(_))));
}

#[test]
fn test_model_width_must_match_vectorizer() {
    let dir = tempdir().unwrap();
    write_json(&dir.path().join("vectorizer.json"), &vectorizer_json());
    write_json(
        &dir.path().join("model.json"),
        &json!({
            "n_features": 3,
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "value": [[2.0, 2.0], [2.0, 0.0], [0.0, 2.0]]
            }]
        }),
    );

    let manager = ModelManager::new(dir.path());
    assert!(matches!(
        manager.load_model(None, N_FEATURES),
        Err(ArtifactError::Invalid(_))
    ));
    assert!(matches!(manager.load_classifier(5000), Err(ClassifierError::ModelError(_))));
}

#[test]
fn test_corrupt_metadata_is_model_error() {
    let dir = tempdir().unwrap();
    write_artifacts(dir.path());
    fs::write(dir.path().join("metadata.json"), b"version: 1").unwrap();

    let manager = ModelManager::new(dir.path());
    assert!(matches!(manager.load_metadata(), Err(ArtifactError::ParseError(_))));
    assert!(matches!(manager.load_classifier(5000), Err(ClassifierError::ModelError(_))));
}
