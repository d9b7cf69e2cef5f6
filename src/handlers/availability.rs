use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::db::seed;
use crate::errors::AppError;
use crate::state::AppState;

/// The whole availability table in its spreadsheet layout.
pub async fn download_csv(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let csv = {
        let db = state
            .db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("availability store lock poisoned")))?;
        seed::export_to_string(&db)?
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"doctor_availability.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
