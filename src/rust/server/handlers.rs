use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::classifier::{ClassifierError, Label};

/// Body of a successful prediction
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub error: bool,
    pub status: Label,
    pub message: &'static str,
    pub confidence: f64,
    pub spam_confidence: f64,
    pub ham_confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub model_version: Option<String>,
    pub max_message_chars: usize,
}

/// True for `application/json` and `+json` media types, ignoring case and parameters
fn is_json_content(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json" || (media_type.starts_with("application/") && media_type.ends_with("+json"))
}

/// Pulls `message` out of a JSON or form-encoded body. A missing field reads as empty.
fn extract_message(headers: &HeaderMap, body: &[u8]) -> ApiResult<String> {
    if is_json_content(headers) {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| ApiError::bad_request("Request body must be valid JSON."))?;
        return match value.get("message") {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(message)) => Ok(message.clone()),
            Some(_) => Err(ApiError::bad_request("Message must be a string.")),
        };
    }

    Ok(url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "message")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default())
}

fn body_rejection(rejection: BytesRejection, max_message_chars: usize) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(format!(
            "Message is too long. Please limit to {} characters.",
            max_message_chars
        ))
    } else {
        ApiError::bad_request("Request body could not be read.")
    }
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let body = body.map_err(|rejection| {
        warn!("Rejected request body: {}", rejection.body_text());
        body_rejection(rejection, state.service.max_message_chars())
    })?;
    let message = extract_message(&headers, &body).map_err(|e| {
        warn!("Rejected malformed request: {}", e);
        e
    })?;

    match state.service.predict(&message).await {
        Ok(verdict) => {
            let rounded = verdict.rounded();
            info!(
                "Classified {} chars as {} ({:.1}%)",
                message.trim().chars().count(),
                verdict.label.as_str(),
                rounded.confidence
            );
            Ok(Json(PredictResponse {
                error: false,
                status: verdict.label,
                message: verdict.label.display_message(),
                confidence: rounded.confidence,
                spam_confidence: rounded.spam,
                ham_confidence: rounded.ham,
            }))
        }
        Err(e @ (ClassifierError::EmptyInput | ClassifierError::InputTooLong { .. })) => {
            warn!("Rejected input: {:?}", e);
            Err(e.into())
        }
        Err(e) => {
            error!("Prediction failed: {}", e);
            Err(e.into())
        }
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ready: state.service.is_ready(),
        model_version: state.service.metadata().and_then(|m| m.version),
        max_message_chars: state.service.max_message_chars(),
    })
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Page not found. Please check the URL.")
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("Method not allowed for this URL.")
}
