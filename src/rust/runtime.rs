//! ONNX Runtime setup for the optional `onnx` model backend.

use std::sync::OnceLock;

use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

/// Graph optimization applied when a session is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Optimization {
    Disabled,
    Basic,
    Extended,
    #[default]
    All,
}

impl From<Optimization> for GraphOptimizationLevel {
    fn from(level: Optimization) -> Self {
        match level {
            Optimization::Disabled => GraphOptimizationLevel::Disable,
            Optimization::Basic => GraphOptimizationLevel::Level1,
            Optimization::Extended => GraphOptimizationLevel::Level2,
            Optimization::All => GraphOptimizationLevel::Level3,
        }
    }
}

/// Execution settings for ONNX classifier sessions.
///
/// A thread count of zero leaves the choice to ONNX Runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization: Optimization,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0,
            intra_threads: 1,
            optimization: Optimization::default(),
        }
    }
}

static ENVIRONMENT: OnceLock<bool> = OnceLock::new();

/// Commits the process-wide ONNX Runtime environment on first use.
///
/// Returns false if the named environment could not be created, in which
/// case sessions fall back to ONNX Runtime's default environment.
pub fn ensure_initialized() -> bool {
    *ENVIRONMENT.get_or_init(|| match ort::init().with_name("spamsift").commit() {
        Ok(_) => true,
        Err(e) => {
            log::error!("Failed to initialize ONNX Runtime environment: {}", e);
            false
        }
    })
}

pub fn create_session_builder(config: &RuntimeConfig) -> ort::Result<SessionBuilder> {
    ensure_initialized();
    let mut builder = Session::builder()?.with_optimization_level(config.optimization.into())?;
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    Ok(builder)
}
