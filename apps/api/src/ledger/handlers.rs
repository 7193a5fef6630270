use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::ledger::models::{Application, ApplicationRecord, ApplicationStatus, ApplicationUpdate};
use crate::resumes::is_pdf;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Fields of the "log an application" form, collected from multipart parts.
#[derive(Debug, Default)]
struct LogForm {
    date: Option<NaiveDate>,
    platform: Option<String>,
    company: String,
    job_link: String,
    status: Option<ApplicationStatus>,
    notes: String,
    resume: Option<(String, Bytes)>,
}

#[derive(Debug, Serialize)]
pub struct DayLogResponse {
    pub date: NaiveDate,
    pub applications: Vec<Application>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/applications
///
/// Newest first.
pub async fn handle_list_applications(
    State(state): State<AppState>,
    CurrentSession(_ctx): CurrentSession,
) -> Json<Vec<ApplicationRecord>> {
    let ledger = state.ledger.read().await;
    Json(ledger.newest_first().cloned().collect())
}

/// POST /api/v1/applications
///
/// Multipart form: `platform`, `company`, `job_link`, `status`, `notes`,
/// optional `date` (defaults to today) and optional `resume` PDF. Saves the
/// resume, appends to the ledger, then flushes the daily summary. A failed
/// append discards the freshly saved resume.
pub async fn handle_log_application(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApplicationRecord>), AppError> {
    ctx.require_user()?;
    let form = read_log_form(multipart).await?;

    let date = form.date.unwrap_or_else(|| Local::now().date_naive());
    let platform = form
        .platform
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("platform is required".to_string()))?;

    let stored = match &form.resume {
        Some((filename, bytes)) => Some(state.resumes.save(date, &form.company, filename, bytes)?),
        None => None,
    };

    let application = Application {
        date,
        platform,
        company: form.company,
        job_link: form.job_link,
        status: form.status.unwrap_or(ApplicationStatus::Applied),
        notes: form.notes,
        resume: stored.as_ref().map(|s| s.path.clone()),
    };

    // Lock order: ledger, then summaries.
    let mut ledger = state.ledger.write().await;
    let record = match ledger.append(application) {
        Ok(record) => record,
        Err(e) => {
            if let Some(stored) = stored {
                stored.discard();
            }
            return Err(e);
        }
    };
    // The record is on disk at this point; a summary flush failure does not
    // undo it.
    let mut summaries = state.summaries.write().await;
    summaries.get_or_create(date);
    if let Err(e) = summaries.save() {
        error!("Application {} logged but daily summary not saved: {e}", record.id);
    }

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    CurrentSession(_ctx): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationRecord>, AppError> {
    let ledger = state.ledger.read().await;
    ledger
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// POST /api/v1/applications/:id/edit
///
/// Opens the record in the caller's edit form.
pub async fn handle_begin_edit(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationRecord>, AppError> {
    ctx.require_user()?;
    let record = state
        .ledger
        .read()
        .await
        .get(id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
    state.sessions.set_edit_target(ctx.token, Some(id)).await;
    Ok(Json(record))
}

/// PUT /api/v1/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<Uuid>,
    Json(update): Json<ApplicationUpdate>,
) -> Result<Json<ApplicationRecord>, AppError> {
    ctx.require_user()?;
    if update.platform.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err(AppError::Validation("platform cannot be empty".to_string()));
    }
    let record = state.ledger.write().await.update(id, update)?;
    state.sessions.finish_edit(ctx.token, id).await;
    Ok(Json(record))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ctx.require_user()?;
    state.ledger.write().await.delete(id)?;
    state.sessions.finish_edit(ctx.token, id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/logs
pub async fn handle_list_log_dates(
    State(state): State<AppState>,
    CurrentSession(_ctx): CurrentSession,
) -> Result<Json<Vec<NaiveDate>>, AppError> {
    Ok(Json(state.ledger.read().await.available_dates()?))
}

/// GET /api/v1/logs/:date
///
/// Reads the day's snapshot file, newest first like the history view.
pub async fn handle_get_day_log(
    State(state): State<AppState>,
    CurrentSession(_ctx): CurrentSession,
    Path(date): Path<NaiveDate>,
) -> Result<Json<DayLogResponse>, AppError> {
    let mut applications = state
        .ledger
        .read()
        .await
        .query_by_date(date)?
        .ok_or_else(|| AppError::NotFound(format!("No applications logged on {date}")))?;
    applications.reverse();
    Ok(Json(DayLogResponse { date, applications }))
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart parsing
// ────────────────────────────────────────────────────────────────────────────

async fn read_log_form(mut multipart: Multipart) -> Result<LogForm, AppError> {
    let mut form = LogForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "resume" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
            // An empty file input still sends a part with no filename.
            if filename.is_empty() && bytes.is_empty() {
                continue;
            }
            if !is_pdf(&filename) {
                return Err(AppError::Validation(
                    "resume must be a PDF file".to_string(),
                ));
            }
            form.resume = Some((filename, bytes));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read field '{name}': {e}")))?;
        match name.as_str() {
            "date" if !value.trim().is_empty() => {
                let date = value
                    .trim()
                    .parse::<NaiveDate>()
                    .map_err(|_| AppError::Validation(format!("invalid date '{value}'")))?;
                form.date = Some(date);
            }
            "platform" => form.platform = Some(value),
            "company" => form.company = value,
            "job_link" => form.job_link = value,
            "status" => {
                form.status = Some(value.parse().map_err(AppError::Validation)?);
            }
            "notes" => form.notes = value,
            _ => {}
        }
    }

    Ok(form)
}
