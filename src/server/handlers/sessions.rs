use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::chat::session::ChatOptions;
use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::server::display::escape_dollars;
use crate::state::AppState;

pub async fn get_options(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    let session = state.session(&session_id);
    Ok(Json(json!({ "options": session.options_snapshot() })))
}

/// Full replacement; omitted fields fall back to their defaults.
pub async fn put_options(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Json(options): Json<ChatOptions>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;

    let services = state.services_snapshot().await;
    options
        .validate(&services)
        .map_err(ApiError::BadRequest)?;

    let session = state.session(&session_id);
    session.set_options(options);
    Ok(Json(json!({ "options": session.options_snapshot() })))
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;

    let session = state.session(&session_id);
    let messages: Vec<Value> = session.with_transcript(|transcript| {
        transcript
            .messages()
            .iter()
            .map(|message| {
                json!({
                    "role": message.role,
                    "content": escape_dollars(&message.content),
                    "created_at": message.created_at
                })
            })
            .collect()
    });

    Ok(Json(json!({ "messages": messages })))
}

pub async fn clear_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;

    let session = state.session(&session_id);
    session.with_transcript(|transcript| transcript.clear());
    Ok(Json(json!({ "success": true })))
}
