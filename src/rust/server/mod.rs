//! HTTP surface: a JSON prediction endpoint, a health probe, and per-client
//! rate limiting on predictions.

mod error;
mod handlers;
mod rate_limit;
mod router;

use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::service::PredictionService;

pub use error::{ApiError, ApiResult, GENERIC_FAILURE_MESSAGE};
pub use handlers::{HealthResponse, PredictResponse};
pub use rate_limit::RateLimiter;
pub use router::{app_router, MAX_BODY_BYTES};

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(service: PredictionService, rate_limit: RateLimitConfig) -> Self {
        Self {
            service: Arc::new(service),
            limiter: Arc::new(RateLimiter::new(rate_limit)),
        }
    }
}
