use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{AgentState, ConversationMessage, PatientId};
use crate::services::agent::StopReason;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExecuteRequest {
    pub id_number: i64,
    pub query: String,
}

#[derive(Serialize)]
pub struct ExecuteResponse {
    pub messages: Vec<ConversationMessage>,
}

/// Runs the appointment agent for one patient query and returns the full
/// transcript.
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, AppError> {
    let patient = PatientId::new(req.id_number)?;
    let query = req.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }

    let span = tracing::info_span!(
        "execute",
        request_id = %Uuid::new_v4(),
        patient_id = patient.value(),
    );

    let messages = run_agent(&state, patient, query).instrument(span).await?;
    Ok(Json(ExecuteResponse { messages }))
}

async fn run_agent(
    state: &AppState,
    patient: PatientId,
    query: &str,
) -> Result<Vec<ConversationMessage>, AppError> {
    tracing::info!(query, "agent request");

    let run = state
        .graph(patient)
        .run(AgentState::new(patient.value(), query))
        .await?;

    if run.stop == StopReason::StepLimit {
        tracing::warn!(steps = run.steps, "agent stopped before finishing");
    }
    tracing::info!(
        steps = run.steps,
        messages = run.state.messages.len(),
        "agent request complete"
    );

    Ok(run.state.messages)
}
