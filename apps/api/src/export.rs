use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub applications: usize,
    pub summary_days: usize,
}

/// POST /api/v1/export
///
/// Rewrites the master ledger and flushes the daily summaries, including any
/// count or checklist edits not yet saved.
pub async fn handle_export(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<ExportResponse>, AppError> {
    ctx.require_user()?;

    let ledger = state.ledger.write().await;
    ledger.save_master()?;
    let mut summaries = state.summaries.write().await;
    summaries.save()?;

    info!("Exported {} applications", ledger.len());
    Ok(Json(ExportResponse {
        applications: ledger.len(),
        summary_days: summaries.day_count(),
    }))
}
