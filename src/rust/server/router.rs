use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use log::warn;

use super::error::ApiError;
use super::handlers::{health, method_not_allowed, not_found, predict};
use super::AppState;

const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a minute and try again.";

/// Largest accepted `/predict` body, in bytes. A 5000-character message fits
/// even when every character is percent-encoded.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// Build the application router
pub fn app_router(state: AppState) -> Router {
    let predict_route = post(predict)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .fallback(method_not_allowed);

    Router::new()
        .route("/predict", predict_route)
        .route("/health", get(health).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(state)
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = state.limiter.client_key(&request);
    if !state.limiter.check(&client) {
        warn!("Rate limit exceeded for {}", client);
        return ApiError::too_many_requests(RATE_LIMITED_MESSAGE).into_response();
    }
    next.run(request).await
}
