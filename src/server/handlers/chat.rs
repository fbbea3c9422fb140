use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::chat::turn::{run_turn, TurnRequest};
use crate::core::errors::ApiError;
use crate::core::security::require_api_key;
use crate::server::display::escape_dollars;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    pub question: String,
}

/// Blocking chat turn: rewrite, retrieve, generate, append. Returns once
/// the answer is in the transcript.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Json(payload): Json<ChatTurnRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;

    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let backends = state.backends().await.ok_or_else(|| {
        ApiError::ServiceUnavailable("backend is not configured".to_string())
    })?;
    let services = state.services_snapshot().await;
    let settings = state.settings();
    let session = state.session(&session_id);

    let outcome = run_turn(
        backends.completion.as_ref(),
        backends.retrieval.as_ref(),
        TurnRequest {
            session: &session,
            question: &payload.question,
            services: &services,
            system_prompt: &settings.system_prompt,
            filter: settings.search_filter,
        },
    )
    .await?;

    let mut body = json!({
        "answer": escape_dollars(&outcome.answer),
        "references": outcome.references,
    });
    if let Some(debug) = outcome.debug {
        body["debug"] = json!({
            "retrieval_query": escape_dollars(&debug.retrieval_query),
            "rewritten": debug.rewritten,
            "service": debug.service,
            "model": debug.model,
            "num_documents": debug.num_documents,
            "context": escape_dollars(&debug.context),
            "prompt": escape_dollars(&debug.prompt),
        });
    }

    Ok(Json(body))
}
