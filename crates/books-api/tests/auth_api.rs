//! Login, token handling and admin-only pipeline endpoints.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{StatusCode, header};
use books_persistence::queries;
use books_pipeline::{
    ImportJob, ImportMode, ImportReport, PipelineConfig, PipelineOrchestrator, ScrapeJob,
};
use common::{TEST_PASSWORD, TestApp};
use serde_json::json;
use tokio::sync::Notify;

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::spawn(&[]).await;
    app.create_user("reader", false, true).await;

    let login = app.login("reader", TEST_PASSWORD).await;
    assert_eq!(login.status, StatusCode::OK);
    let tokens = login.json();
    assert_eq!(tokens["token_type"], "bearer");
    let access = tokens["access_token"].as_str().unwrap();

    let me = app.get_authorized("/api/v1/auth/me", access).await;
    assert_eq!(me.status, StatusCode::OK);
    let body = me.json();
    assert_eq!(body["username"], "reader");
    assert_eq!(body["is_admin"], false);
    assert!(body.get("hashed_password").is_none());
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::spawn(&[]).await;
    app.create_user("reader", false, true).await;
    app.create_user("dormant", false, false).await;

    let wrong = app.login("reader", "not-the-password").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.error_code(), "INVALID_CREDENTIALS");

    let unknown = app.login("nobody", TEST_PASSWORD).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.error_code(), "INVALID_CREDENTIALS");

    let inactive = app.login("dormant", TEST_PASSWORD).await;
    assert_eq!(inactive.status, StatusCode::FORBIDDEN);
    assert_eq!(inactive.error_code(), "ACCOUNT_INACTIVE");
}

#[tokio::test]
async fn test_me_requires_access_token() {
    let app = TestApp::spawn(&[]).await;
    app.create_user("reader", false, true).await;
    let tokens = app.login("reader", TEST_PASSWORD).await.json();
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let anonymous = app.get("/api/v1/auth/me").await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        anonymous.headers.get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );

    let with_refresh = app.get_authorized("/api/v1/auth/me", refresh).await;
    assert_eq!(with_refresh.status, StatusCode::UNAUTHORIZED);
    assert_eq!(with_refresh.error_code(), "INVALID_TOKEN");

    let garbage = app.get_authorized("/api/v1/auth/me", "not.a.jwt").await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh() {
    let app = TestApp::spawn(&[]).await;
    app.create_user("reader", false, true).await;
    let tokens = app.login("reader", TEST_PASSWORD).await.json();

    let refreshed = app
        .post_json(
            "/api/v1/auth/refresh",
            &json!({ "refresh_token": tokens["refresh_token"] }),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let access = refreshed.json()["access_token"].as_str().unwrap().to_string();
    assert_eq!(
        app.get_authorized("/api/v1/auth/me", &access).await.status,
        StatusCode::OK
    );

    let with_access = app
        .post_json(
            "/api/v1/auth/refresh",
            &json!({ "refresh_token": tokens["access_token"] }),
        )
        .await;
    assert_eq!(with_access.status, StatusCode::UNAUTHORIZED);

    let malformed = app.post_json("/api/v1/auth/refresh", &json!({})).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.error_code(), "VALIDATION_ERROR");
}

// =============================================================================
// ADMIN PIPELINE
// =============================================================================

/// Scraper that blocks until released
struct GatedScraper {
    release: Arc<Notify>,
}

#[async_trait]
impl ScrapeJob for GatedScraper {
    async fn scrape(&self) -> books_pipeline::error::Result<()> {
        self.release.notified().await;
        Ok(())
    }
}

struct NoopImporter;

#[async_trait]
impl ImportJob for NoopImporter {
    async fn import(&self, mode: ImportMode) -> books_pipeline::error::Result<ImportReport> {
        Ok(ImportReport {
            mode,
            existing: 0,
            deleted: 0,
            inserted: 0,
            skipped: false,
        })
    }
}

#[tokio::test]
async fn test_scraping_requires_admin() {
    let app = TestApp::spawn(&[]).await;
    let reader = app.access_token("reader", false).await;

    let anonymous = app.get("/api/v1/scraping/status").await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = app.post_authorized("/api/v1/scraping/trigger", &reader).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.error_code(), "FORBIDDEN");

    let forbidden = app.get_authorized("/api/v1/scraping/status", &reader).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_trigger_runs_in_background_one_at_a_time() {
    let release = Arc::new(Notify::new());
    let scraper_release = release.clone();
    let app = TestApp::spawn_with(
        &[],
        |_| {},
        move |state| {
            let pipeline = PipelineOrchestrator::new(
                Arc::new(GatedScraper {
                    release: scraper_release,
                }),
                Arc::new(NoopImporter),
                state.analytics.cache().clone(),
                PipelineConfig::default(),
            );
            state.with_pipeline(pipeline)
        },
    )
    .await;
    let admin = app.access_token("admin", true).await;

    let accepted = app
        .post_authorized("/api/v1/scraping/trigger?mode=skip_if_populated", &admin)
        .await;
    assert_eq!(accepted.status, StatusCode::ACCEPTED);
    let body = accepted.json();
    assert_eq!(body["mode"], "skip_if_populated");
    assert_eq!(body["triggered_by"], "admin");
    let run_id = body["run_id"].as_str().unwrap().to_string();

    let running = app.get_authorized("/api/v1/scraping/status", &admin).await.json();
    assert_eq!(running["state"], "running");
    assert_eq!(running["stage"], "scrape");
    assert_eq!(running["last_run"]["run_id"], run_id.as_str());

    let conflict = app.post_authorized("/api/v1/scraping/trigger", &admin).await;
    assert_eq!(conflict.status, StatusCode::CONFLICT);
    assert_eq!(conflict.error_code(), "PIPELINE_RUNNING");

    release.notify_one();

    let mut status = running;
    for _ in 0..100 {
        status = app.get_authorized("/api/v1/scraping/status", &admin).await.json();
        if status["state"] == "idle" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status["state"], "idle");
    assert_eq!(status["last_run"]["outcome"]["status"], "succeeded");
}

#[tokio::test]
async fn test_authenticated_requests_record_user_id() {
    let app = TestApp::spawn(&[]).await;
    let user = app.create_user("reader", false, true).await;
    let tokens = app.login("reader", TEST_PASSWORD).await.json();

    app.get_authorized("/api/v1/auth/me", tokens["access_token"].as_str().unwrap())
        .await;

    app.wait_for_api_logs(2).await;
    let mut session = app.db.acquire_session().await.unwrap();
    let logs = queries::api_logs::recent(&mut session, 10).await.unwrap();

    let me = logs.iter().find(|l| l.endpoint == "/api/v1/auth/me").unwrap();
    assert_eq!(me.user_id, Some(user.id));

    let login = logs.iter().find(|l| l.endpoint == "/api/v1/auth/login").unwrap();
    assert_eq!(login.user_id, None);
}
