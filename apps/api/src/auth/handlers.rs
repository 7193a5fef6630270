use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{CurrentSession, Role};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub username: String,
    pub role: Role,
    pub edit_target: Option<Uuid>,
}

/// POST /api/v1/session
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let ctx = state
        .sessions
        .login(state.authenticator.as_ref(), &req.username, &req.password)
        .await?;
    Ok(Json(LoginResponse {
        token: ctx.token,
        username: ctx.username,
        role: ctx.role,
    }))
}

/// GET /api/v1/session
pub async fn handle_whoami(CurrentSession(ctx): CurrentSession) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        username: ctx.username,
        role: ctx.role,
        edit_target: ctx.edit_target,
    })
}

/// DELETE /api/v1/session
pub async fn handle_logout(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> StatusCode {
    state.sessions.logout(ctx.token).await;
    StatusCode::NO_CONTENT
}
