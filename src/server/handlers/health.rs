use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::chat::session::MODELS;
use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "initialized": true
    }))
}

/// Open status summary. Counts only, never config contents.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let configured = state.settings().configured();
    let connected = state.backends().await.is_some();
    let services = state.services_snapshot().await.len();
    let chat_enabled = connected && services > 0;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0);

    Ok(Json(json!({
        "initialized": true,
        "configured": configured,
        "connected": connected,
        "services": services,
        "chat_enabled": chat_enabled,
        "degraded": configured && !chat_enabled,
        "models": MODELS,
        "uptime_secs": uptime_secs
    })))
}
