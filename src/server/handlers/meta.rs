use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::chat::session::MODELS;
use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::state::AppState;

/// Starter questions shown over an empty conversation.
const SAMPLE_QUESTIONS: &[&str] = &[
    "What helps relieve a tension headache?",
    "What are common side effects of ibuprofen?",
    "How should this syrup be stored after opening?",
    "Which remedies here are suitable for children?",
];

pub async fn list_models(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    Ok(Json(json!({ "models": MODELS, "default": MODELS[0] })))
}

pub async fn list_samples(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    Ok(Json(json!({ "samples": SAMPLE_QUESTIONS })))
}
