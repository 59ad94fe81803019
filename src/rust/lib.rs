//! A thread-safe spam classifier serving pre-trained TF-IDF and tree-ensemble
//! artifacts behind a small JSON API.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use spamsift::SpamClassifier;
//!
//! let classifier = SpamClassifier::builder()
//!     .with_vectorizer_file("vectorizer.json")?
//!     .with_model_file("model.json")?
//!     .build()?;
//!
//! let verdict = classifier.predict("Congratulations! You've won a free prize!")?;
//! println!("{} ({:.1}%)", verdict.label.as_str(), verdict.confidence_percent);
//! # Ok(())
//! # }
//! ```
//!
//! # Loading from an artifacts directory
//!
//! [`ModelManager`] finds `vectorizer.json`, `model.json` and the optional
//! `metadata.json` in a directory or its `models/` subdirectory, verifying
//! checksums listed in the metadata:
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use spamsift::ModelManager;
//!
//! let classifier = ModelManager::new("artifacts").load_classifier(5000)?;
//! assert!(!classifier.predict("Lunch tomorrow?")?.is_spam());
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod model_manager;
#[cfg(feature = "onnx")]
mod runtime;
pub mod server;
pub mod service;

pub use classifier::{
    ClassifierBuilder, ClassifierError, ClassifierInfo, Label, SpamClassifier, Verdict,
};
pub use config::{RateLimitConfig, ServiceConfig};
pub use model_manager::{ArtifactError, ModelManager};
#[cfg(feature = "onnx")]
pub use runtime::{create_session_builder, Optimization, RuntimeConfig};
pub use server::{app_router, AppState};
pub use service::PredictionService;

/// Initializes `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
/// Repeated calls are ignored.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
