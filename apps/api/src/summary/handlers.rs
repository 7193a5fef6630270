use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;

use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::state::AppState;
use crate::summary::DailySummary;

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: DailySummary,
    pub total: u32,
    /// Edits not yet flushed by logging an application or exporting.
    pub unsaved_changes: bool,
}

impl SummaryResponse {
    fn new(date: NaiveDate, summary: &DailySummary, unsaved_changes: bool) -> Self {
        Self {
            date,
            summary: summary.clone(),
            total: summary.total(),
            unsaved_changes,
        }
    }
}

/// GET /api/v1/summary/:date
pub async fn handle_get_summary(
    State(state): State<AppState>,
    CurrentSession(_ctx): CurrentSession,
    Path(date): Path<NaiveDate>,
) -> Json<SummaryResponse> {
    let mut store = state.summaries.write().await;
    let summary = store.get_or_create(date).clone();
    Json(SummaryResponse::new(date, &summary, store.has_unsaved_changes()))
}

/// PUT /api/v1/summary/:date/counts
pub async fn handle_set_counts(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(date): Path<NaiveDate>,
    Json(counts): Json<BTreeMap<String, u32>>,
) -> Result<Json<SummaryResponse>, AppError> {
    ctx.require_user()?;
    let mut store = state.summaries.write().await;
    let summary = store.set_counts(date, counts)?.clone();
    Ok(Json(SummaryResponse::new(date, &summary, store.has_unsaved_changes())))
}

/// PUT /api/v1/summary/:date/checklist
pub async fn handle_set_checklist(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(date): Path<NaiveDate>,
    Json(items): Json<BTreeMap<String, bool>>,
) -> Result<Json<SummaryResponse>, AppError> {
    ctx.require_user()?;
    let mut store = state.summaries.write().await;
    let summary = store.set_checklist(date, items)?.clone();
    Ok(Json(SummaryResponse::new(date, &summary, store.has_unsaved_changes())))
}
