pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::calendar::handlers as calendar;
use crate::dashboard;
use crate::export;
use crate::ledger::handlers as ledger;
use crate::resumes::handlers as resumes;
use crate::state::AppState;
use crate::summary::handlers as summary;

/// Resume uploads ride on the log-application request.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Dashboard
        .route("/", get(dashboard::handle_dashboard))
        .route("/login", post(dashboard::handle_login_form))
        .route("/logout", post(dashboard::handle_logout_form))
        // Session
        .route(
            "/api/v1/session",
            post(auth::handle_login)
                .get(auth::handle_whoami)
                .delete(auth::handle_logout),
        )
        // Application ledger
        .route(
            "/api/v1/applications",
            get(ledger::handle_list_applications).post(ledger::handle_log_application),
        )
        .route(
            "/api/v1/applications/:id",
            get(ledger::handle_get_application)
                .put(ledger::handle_update_application)
                .delete(ledger::handle_delete_application),
        )
        .route(
            "/api/v1/applications/:id/edit",
            post(ledger::handle_begin_edit),
        )
        .route("/api/v1/logs", get(ledger::handle_list_log_dates))
        .route("/api/v1/logs/:date", get(ledger::handle_get_day_log))
        // Daily summary
        .route("/api/v1/summary/:date", get(summary::handle_get_summary))
        .route(
            "/api/v1/summary/:date/counts",
            put(summary::handle_set_counts),
        )
        .route(
            "/api/v1/summary/:date/checklist",
            put(summary::handle_set_checklist),
        )
        // Calendar
        .route(
            "/api/v1/events",
            get(calendar::handle_list_events).post(calendar::handle_add_event),
        )
        .route(
            "/api/v1/events/:id",
            axum::routing::delete(calendar::handle_remove_event),
        )
        // Resumes and export
        .route("/api/v1/resumes/:name", get(resumes::handle_download))
        .route("/api/v1/export", post(export::handle_export))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    use crate::config::Config;

    const BOUNDARY: &str = "tracker-test-boundary";

    fn setup() -> (TempDir, Router) {
        let dir = tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            port: 0,
            rust_log: "info".to_string(),
        };
        let state = AppState::open(&config).unwrap();
        (dir, build_router(state))
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn multipart_request(
        token: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/applications")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn login(app: &Router, username: &str, password: &str) -> String {
        let resp = send(
            app,
            json_request(
                "POST",
                "/api/v1/session",
                None,
                json!({ "username": username, "password": password }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        body_json(resp).await["token"].as_str().unwrap().to_string()
    }

    const ACME: [(&str, &str); 5] = [
        ("date", "2024-01-01"),
        ("platform", "LinkedIn"),
        ("company", "Acme"),
        ("job_link", "https://acme.example/jobs/42"),
        ("status", "Applied"),
    ];

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = setup();
        let resp = send(
            &app,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_login_is_unauthorized() {
        let (_dir, app) = setup();
        let resp = send(
            &app,
            json_request(
                "POST",
                "/api/v1/session",
                None,
                json!({ "username": "aishwarya", "password": "wrong" }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_requests_without_session_are_rejected() {
        let (_dir, app) = setup();
        let resp = send(
            &app,
            Request::builder()
                .uri("/api/v1/applications")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_log_acme_scenario() {
        let (dir, app) = setup();
        let token = login(&app, "aishwarya", "applydaily").await;

        let resp = send(&app, multipart_request(&token, &ACME, None)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let record = body_json(resp).await;
        assert_eq!(record["company"], "Acme");
        assert_eq!(record["status"], "Applied");

        let master = fs::read_to_string(dir.path().join("job_applications.csv")).unwrap();
        assert_eq!(master.lines().count(), 2);
        assert!(master.contains("2024-01-01,LinkedIn,Acme,https://acme.example/jobs/42,Applied,,"));

        let snapshot =
            fs::read_to_string(dir.path().join("logs/2024-01-01_applications.csv")).unwrap();
        assert_eq!(snapshot, master);

        // Logging flushes the summary document with the day's entry.
        let summary: Value = serde_json::from_slice(
            &fs::read(dir.path().join("daily_summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(summary["2024-01-01"]["checklist"]["resume_custom"], false);

        let resp = send(&app, get_request("/api/v1/logs/2024-01-01", &token)).await;
        let day = body_json(resp).await;
        assert_eq!(day["applications"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_upload_and_download() {
        let (dir, app) = setup();
        let token = login(&app, "aishwarya", "applydaily").await;

        let fields = [("date", "2024-01-01"), ("platform", "Indeed"), ("company", "Big Co")];
        let resp = send(
            &app,
            multipart_request(&token, &fields, Some(("cv.pdf", &b"%PDF-1.4 test"[..]))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let record = body_json(resp).await;
        assert_eq!(record["resume"], "uploaded_resumes/2024-01-01_Big_Co_cv.pdf");
        assert!(dir
            .path()
            .join("uploaded_resumes/2024-01-01_Big_Co_cv.pdf")
            .exists());

        let resp = send(
            &app,
            get_request("/api/v1/resumes/2024-01-01_Big_Co_cv.pdf", &token),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_non_pdf_upload_rejected() {
        let (dir, app) = setup();
        let token = login(&app, "aishwarya", "applydaily").await;

        let resp = send(
            &app,
            multipart_request(&token, &ACME, Some(("cv.docx", &b"not a pdf"[..]))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(!dir.path().join("job_applications.csv").exists());
    }

    #[tokio::test]
    async fn test_failed_ledger_write_is_storage_error() {
        let (dir, app) = setup();
        let token = login(&app, "aishwarya", "applydaily").await;
        fs::create_dir_all(dir.path().join("logs/2024-01-01_applications.csv/occupied")).unwrap();

        let resp = send(
            &app,
            multipart_request(&token, &ACME, Some(("cv.pdf", &b"%PDF-1.4 test"[..]))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], "STORAGE_ERROR");

        // Memory, master file and uploads all agree that nothing was logged.
        let resp = send(&app, get_request("/api/v1/applications", &token)).await;
        assert_eq!(body_json(resp).await, json!([]));
        let master = fs::read_to_string(dir.path().join("job_applications.csv")).unwrap();
        assert_eq!(master.lines().count(), 1);
        assert!(!dir
            .path()
            .join("uploaded_resumes/2024-01-01_Acme_cv.pdf")
            .exists());
    }

    #[tokio::test]
    async fn test_summary_flush_failure_keeps_logged_application() {
        let (dir, app) = setup();
        let token = login(&app, "aishwarya", "applydaily").await;
        fs::create_dir_all(dir.path().join("daily_summary.json/occupied")).unwrap();

        let resp = send(&app, multipart_request(&token, &ACME, None)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = send(&app, get_request("/api/v1/applications", &token)).await;
        let list = body_json(resp).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["company"], "Acme");
    }

    #[tokio::test]
    async fn test_viewer_is_read_only() {
        let (_dir, app) = setup();
        let user = login(&app, "aishwarya", "applydaily").await;
        let viewer = login(&app, "Prasad", "seetracker").await;

        let resp = send(&app, multipart_request(&user, &ACME, None)).await;
        let id = body_json(resp).await["id"].as_str().unwrap().to_string();

        let resp = send(&app, multipart_request(&viewer, &ACME, None)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/applications/{id}"))
                .header(header::AUTHORIZATION, format!("Bearer {viewer}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = send(
            &app,
            json_request(
                "POST",
                "/api/v1/events",
                Some(&viewer),
                json!({ "title": "x", "date": "2024-01-02", "time": "09:00:00" }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = send(&app, get_request("/api/v1/applications", &viewer)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_flow_updates_by_id_and_clears_target() {
        let (_dir, app) = setup();
        let token = login(&app, "aishwarya", "applydaily").await;

        let resp = send(&app, multipart_request(&token, &ACME, None)).await;
        let first = body_json(resp).await["id"].as_str().unwrap().to_string();
        send(&app, multipart_request(&token, &ACME, None)).await;

        let resp = send(
            &app,
            json_request(
                "POST",
                &format!("/api/v1/applications/{first}/edit"),
                Some(&token),
                json!({}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let me = body_json(send(&app, get_request("/api/v1/session", &token)).await).await;
        assert_eq!(me["edit_target"], first.as_str());

        let resp = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/v1/applications/{first}"),
                Some(&token),
                json!({ "status": "Followed Up", "notes": "emailed recruiter" }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = body_json(resp).await;
        assert_eq!(updated["status"], "Followed Up");
        assert_eq!(updated["company"], "Acme");

        let me = body_json(send(&app, get_request("/api/v1/session", &token)).await).await;
        assert!(me["edit_target"].is_null());

        let list = body_json(send(&app, get_request("/api/v1/applications", &token)).await).await;
        let statuses: Vec<_> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["status"].as_str().unwrap().to_string())
            .collect();
        // Newest first: the untouched second record leads.
        assert_eq!(statuses, vec!["Applied", "Followed Up"]);
    }

    #[tokio::test]
    async fn test_summary_edits_wait_for_export() {
        let (dir, app) = setup();
        let token = login(&app, "aishwarya", "applydaily").await;

        let resp = send(
            &app,
            json_request(
                "PUT",
                "/api/v1/summary/2024-01-01/counts",
                Some(&token),
                json!({ "LinkedIn": 3, "Dice": 2 }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let summary = body_json(resp).await;
        assert_eq!(summary["total"], 5);
        assert_eq!(summary["unsaved_changes"], true);
        assert!(!dir.path().join("daily_summary.json").exists());

        let resp = send(
            &app,
            json_request(
                "PUT",
                "/api/v1/summary/2024-01-01/counts",
                Some(&token),
                json!({ "Handshake": 11 }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(
            &app,
            json_request("POST", "/api/v1/export", Some(&token), json!({})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(dir.path().join("daily_summary.json").exists());
        assert!(dir.path().join("job_applications.csv").exists());

        let summary =
            body_json(send(&app, get_request("/api/v1/summary/2024-01-01", &token)).await).await;
        assert_eq!(summary["unsaved_changes"], false);
        assert_eq!(summary["counts"]["Dice"], 2);
    }

    #[tokio::test]
    async fn test_events_sorted_and_removed_by_id() {
        let (_dir, app) = setup();
        let token = login(&app, "aishwarya", "applydaily").await;

        for (title, date) in [("later", "2024-02-01"), ("sooner", "2024-01-15")] {
            let resp = send(
                &app,
                json_request(
                    "POST",
                    "/api/v1/events",
                    Some(&token),
                    json!({ "title": title, "date": date, "time": "10:30:00", "note": "" }),
                ),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let events = body_json(send(&app, get_request("/api/v1/events", &token)).await).await;
        let events = events.as_array().unwrap();
        assert_eq!(events[0]["title"], "sooner");
        assert_eq!(events[0]["start"], "2024-01-15T10:30:00");
        assert_eq!(events[0]["label"], "sooner on 2024-01-15");

        let id = events[0]["id"].as_str().unwrap();
        let resp = send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/events/{id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let events = body_json(send(&app, get_request("/api/v1/events", &token)).await).await;
        assert_eq!(events.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dashboard_login_sets_cookie() {
        let (_dir, app) = setup();

        let resp = send(&app, Request::builder().uri("/").body(Body::empty()).unwrap()).await;
        let html = String::from_utf8(
            to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec(),
        )
        .unwrap();
        assert!(html.contains("action=\"/login\""));

        let resp = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=Prasad&password=seetracker"))
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Path=/"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let resp = send(
            &app,
            Request::builder()
                .uri("/")
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let html = String::from_utf8(
            to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec(),
        )
        .unwrap();
        assert!(html.contains("Viewer Mode"));
        assert!(html.contains("Total Applications Today: 0"));

        let resp = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let cleared = resp
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cleared.starts_with("tracker_session=;"));
        assert!(cleared.contains("Max-Age=0"));

        let resp = send(
            &app,
            Request::builder()
                .uri("/")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let html = String::from_utf8(
            to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec(),
        )
        .unwrap();
        assert!(html.contains("action=\"/login\""));
    }
}
