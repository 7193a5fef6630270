//! Server-rendered dashboard. Read-only view of every store for the logged-in
//! session; writes go through the JSON API.

use askama::Template;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Local, NaiveDate};

use crate::auth::handlers::LoginRequest;
use crate::auth::{session_token, Role, SessionContext, SESSION_COOKIE};
use crate::errors::AppError;
use crate::ledger::models::ApplicationRecord;
use crate::state::AppState;
use crate::summary::{checklist_label, DailySummary, DEFAULT_CHECKLIST, PLATFORM_LIMITS};

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "login.html")]
struct LoginPage<'a> {
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardPage<'a> {
    username: &'a str,
    role: &'static str,
    today: NaiveDate,
    platforms: Vec<PlatformRow>,
    total: u32,
    unsaved: bool,
    checklist: Vec<ChecklistItem>,
    events: Vec<String>,
    viewer: bool,
    editing: Option<String>,
    history: Vec<HistoryEntry>,
    log_dates: Vec<NaiveDate>,
}

struct PlatformRow {
    name: String,
    count: u32,
    max: Option<u32>,
}

struct ChecklistItem {
    label: String,
    done: bool,
}

struct HistoryEntry {
    headline: String,
    date: NaiveDate,
    job_link: Option<String>,
    notes: String,
    resume: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /
pub async fn handle_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    let session = match session_token(&headers) {
        Some(token) => state.sessions.get(token).await,
        None => None,
    };
    match session {
        Some(ctx) => render_dashboard(&state, &ctx, Local::now().date_naive()).await,
        None => Ok(Html(LoginPage { error: None }.render()?)),
    }
}

/// POST /login
pub async fn handle_login_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<LoginRequest>,
) -> Result<Response, AppError> {
    match state
        .sessions
        .login(state.authenticator.as_ref(), &req.username, &req.password)
        .await
    {
        Ok(ctx) => {
            let cookie = Cookie::build((SESSION_COOKIE, ctx.token.to_string()))
                .http_only(true)
                .path("/")
                .same_site(SameSite::Lax);
            Ok((jar.add(cookie), Redirect::to("/")).into_response())
        }
        Err(_) => {
            let page = LoginPage {
                error: Some("Invalid username or password."),
            };
            Ok((StatusCode::UNAUTHORIZED, Html(page.render()?)).into_response())
        }
    }
}

/// POST /logout
pub async fn handle_logout_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        state.sessions.logout(token).await;
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/"),
    )
}

// ────────────────────────────────────────────────────────────────────────────
// View building
// ────────────────────────────────────────────────────────────────────────────

async fn render_dashboard(
    state: &AppState,
    ctx: &SessionContext,
    today: NaiveDate,
) -> Result<Html<String>, AppError> {
    let ledger = state.ledger.read().await;
    let (summary, unsaved) = {
        let mut summaries = state.summaries.write().await;
        let summary = summaries.get_or_create(today).clone();
        (summary, summaries.has_unsaved_changes())
    };
    let calendar = state.calendar.read().await;

    let page = DashboardPage {
        username: &ctx.username,
        role: role_name(ctx.role),
        today,
        platforms: platform_rows(&summary),
        total: summary.total(),
        unsaved,
        checklist: checklist_items(&summary),
        events: calendar.list_sorted().map(|e| e.label()).collect(),
        viewer: ctx.role == Role::Viewer,
        editing: ctx.edit_target.and_then(|id| ledger.get(id)).map(headline),
        history: ledger.newest_first().map(history_entry).collect(),
        log_dates: ledger.available_dates()?,
    };
    Ok(Html(page.render()?))
}

/// Built-in platforms first (zero when unset), then any others in name order.
fn platform_rows(summary: &DailySummary) -> Vec<PlatformRow> {
    let builtin = PLATFORM_LIMITS.iter().map(|(name, max)| PlatformRow {
        name: name.to_string(),
        count: summary.counts.get(*name).copied().unwrap_or(0),
        max: Some(*max),
    });
    let others = summary
        .counts
        .iter()
        .filter(|(p, _)| !PLATFORM_LIMITS.iter().any(|(name, _)| *name == p.as_str()))
        .map(|(name, count)| PlatformRow {
            name: name.clone(),
            count: *count,
            max: None,
        });
    builtin.chain(others).collect()
}

fn checklist_items(summary: &DailySummary) -> Vec<ChecklistItem> {
    let extra = summary
        .checklist
        .keys()
        .map(String::as_str)
        .filter(|task| !DEFAULT_CHECKLIST.contains(task));
    DEFAULT_CHECKLIST
        .into_iter()
        .chain(extra)
        .filter_map(|task| {
            summary.checklist.get(task).map(|done| ChecklistItem {
                label: checklist_label(task),
                done: *done,
            })
        })
        .collect()
}

fn history_entry(record: &ApplicationRecord) -> HistoryEntry {
    let app = &record.application;
    HistoryEntry {
        headline: headline(record),
        date: app.date,
        job_link: web_link(&app.job_link).map(str::to_string),
        notes: app.notes.clone(),
        resume: app
            .resume
            .as_deref()
            .and_then(|r| r.rsplit('/').next())
            .map(str::to_string),
    }
}

fn headline(record: &ApplicationRecord) -> String {
    let app = &record.application;
    format!("{} ({}) - {}", app.company, app.platform, app.status)
}

/// Only `http` and `https` links become anchors.
fn web_link(link: &str) -> Option<&str> {
    let link = link.trim();
    let lower = link.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")).then_some(link)
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Viewer => "viewer",
    }
}
