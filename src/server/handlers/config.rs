use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::state::AppState;

pub async fn get_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    let config = state.config.load_config()?;
    let redacted = state.config.redact_sensitive_values(&config);
    Ok(Json(redacted))
}

pub async fn update_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    state.config.update_config(payload, false)?;
    apply_new_config(&state).await;
    Ok(Json(json!({"status": "success"})))
}

pub async fn patch_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    state.config.update_config(payload, true)?;
    apply_new_config(&state).await;
    Ok(Json(json!({"status": "success"})))
}

/// A failed reconnect leaves the save in place; the status endpoint shows
/// the degraded state.
async fn apply_new_config(state: &Arc<AppState>) {
    if let Err(err) = state.refresh_backends().await {
        tracing::warn!("Config saved but backend refresh failed: {}", err);
    }
}
