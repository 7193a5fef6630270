//! Auth gate: static credential table plus per-session context.
//!
//! A successful login creates a `SessionContext` keyed by a random token.
//! Handlers receive it through the `CurrentSession` extractor; there is no
//! ambient session state.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "tracker_session";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full read/write access.
    User,
    /// Read-only access.
    Viewer,
}

// ────────────────────────────────────────────────────────────────────────────
// Credential check
// ────────────────────────────────────────────────────────────────────────────

/// Resolves a username/password pair to a role.
///
/// Carried in `AppState` as `Arc<dyn Authenticator>`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Option<Role>;
}

/// Fixed in-source credential table. No hashing, no lockout.
pub struct StaticCredentials {
    users: HashMap<&'static str, (&'static str, Role)>,
}

impl StaticCredentials {
    pub fn builtin() -> Self {
        let users = HashMap::from([
            ("aishwarya", ("applydaily", Role::User)),
            ("Prasad", ("seetracker", Role::Viewer)),
        ]);
        Self { users }
    }
}

#[async_trait]
impl Authenticator for StaticCredentials {
    async fn authenticate(&self, username: &str, password: &str) -> Option<Role> {
        self.users
            .get(username)
            .filter(|(expected, _)| *expected == password)
            .map(|(_, role)| *role)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sessions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub token: Uuid,
    pub username: String,
    pub role: Role,
    /// Application currently opened in the edit form, if any.
    pub edit_target: Option<Uuid>,
}

impl SessionContext {
    /// Mutations are reserved for the `user` role.
    pub fn require_user(&self) -> Result<(), AppError> {
        match self.role {
            Role::User => Ok(()),
            Role::Viewer => {
                warn!("Viewer {} attempted a write", self.username);
                Err(AppError::Forbidden)
            }
        }
    }
}

/// In-memory session table. Sessions never expire; logout removes them.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionContext>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the credentials and opens a session on success.
    /// A failed check leaves the table untouched.
    pub async fn login(
        &self,
        authenticator: &dyn Authenticator,
        username: &str,
        password: &str,
    ) -> Result<SessionContext, AppError> {
        let Some(role) = authenticator.authenticate(username, password).await else {
            warn!("Rejected login for '{username}'");
            return Err(AppError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        };

        let ctx = SessionContext {
            token: Uuid::new_v4(),
            username: username.to_string(),
            role,
            edit_target: None,
        };
        self.sessions.write().await.insert(ctx.token, ctx.clone());
        info!("Session opened for {username} ({role:?})");
        Ok(ctx)
    }

    pub async fn get(&self, token: Uuid) -> Option<SessionContext> {
        self.sessions.read().await.get(&token).cloned()
    }

    pub async fn logout(&self, token: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&token);
        if let Some(ctx) = &removed {
            info!("Session closed for {}", ctx.username);
        }
        removed.is_some()
    }

    pub async fn set_edit_target(&self, token: Uuid, target: Option<Uuid>) {
        if let Some(ctx) = self.sessions.write().await.get_mut(&token) {
            ctx.edit_target = target;
        }
    }

    /// Clears the edit target only when it still points at `record_id`.
    pub async fn finish_edit(&self, token: Uuid, record_id: Uuid) {
        if let Some(ctx) = self.sessions.write().await.get_mut(&token) {
            if ctx.edit_target == Some(record_id) {
                ctx.edit_target = None;
            }
        }
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Reads the session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<Uuid> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|t| Uuid::parse_str(t.trim()).ok());
    if bearer.is_some() {
        return bearer;
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// Extractor resolving the caller's session; rejects with 401 when absent.
pub struct CurrentSession(pub SessionContext);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))?;
        let ctx = state
            .sessions
            .get(token)
            .await
            .ok_or_else(|| AppError::Unauthorized("Session expired or unknown".to_string()))?;
        Ok(CurrentSession(ctx))
    }
}
