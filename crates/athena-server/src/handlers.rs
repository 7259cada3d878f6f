//! API route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::debug;

use crate::error::Result;
use crate::models::{ChatRequest, ChatResponse, StatusResponse};
use crate::state::AppState;

/// GET / - Liveness check.
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "Athena AI API is running",
    })
}

/// POST /chat - Run one chat turn through the pipeline.
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(req) = payload?;
    debug!(
        input_chars = req.user_input.chars().count(),
        history_len = req.history.len(),
        "Chat request"
    );

    let reply = state.pipeline.respond(&req).await?;
    Ok(Json(ChatResponse::from(reply)))
}
