use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::auth::CurrentSession;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/resumes/:name
pub async fn handle_download(
    State(state): State<AppState>,
    CurrentSession(_ctx): CurrentSession,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state.resumes.open(&name)?;
    let ascii_name: String = name
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"')
        .collect();
    let disposition = format!("attachment; filename=\"{ascii_name}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
