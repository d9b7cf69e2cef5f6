use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    let reply = state
        .recommender
        .reply(&state.oracle, state.embedder.as_ref(), message)
        .await
        .map_err(|e| AppError::Ai(format!("{e:#}")))?;

    Ok(Json(ChatResponse { reply }))
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.recommender.reset();
    Json(json!({ "status": "cleared" }))
}
