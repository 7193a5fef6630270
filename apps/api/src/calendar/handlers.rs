use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::CurrentSession;
use crate::calendar::{CalendarEvent, NewEvent};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: CalendarEvent,
    pub label: String,
}

impl From<&CalendarEvent> for EventView {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            label: event.label(),
            event: event.clone(),
        }
    }
}

/// GET /api/v1/events
pub async fn handle_list_events(
    State(state): State<AppState>,
    CurrentSession(_ctx): CurrentSession,
) -> Json<Vec<EventView>> {
    let store = state.calendar.read().await;
    Json(store.list_sorted().map(EventView::from).collect())
}

/// POST /api/v1/events
pub async fn handle_add_event(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(req): Json<NewEvent>,
) -> Result<(StatusCode, Json<EventView>), AppError> {
    ctx.require_user()?;
    let event = state.calendar.write().await.add(req)?;
    Ok((StatusCode::CREATED, Json(EventView::from(&event))))
}

/// DELETE /api/v1/events/:id
pub async fn handle_remove_event(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ctx.require_user()?;
    state.calendar.write().await.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}
