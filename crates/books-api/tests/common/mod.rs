//! Shared harness for router-level tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use books_api::auth::hash_password;
use books_api::{AppState, Config, build_router};
use books_domain::{Book, NewUser, User};
use books_persistence::{AuditLogger, Database, queries};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "correct-horse";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db: Database,
    pub dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn error_code(&self) -> String {
        self.json()["error"]["code"].as_str().unwrap().to_string()
    }
}

pub fn book(id: i64, title: &str, price: f64, rating: i32, category: &str) -> Book {
    Book {
        id,
        title: title.to_string(),
        price,
        rating,
        availability: 5,
        category: category.to_string(),
        image_url: None,
    }
}

fn test_config(dir: &TempDir) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("SECRET_KEY", "test-secret".to_string()),
        (
            "DATABASE_URL",
            dir.path().join("books.db").to_string_lossy().into_owned(),
        ),
        (
            "BOOKS_CSV_PATH",
            dir.path().join("books.csv").to_string_lossy().into_owned(),
        ),
        ("PASSWORD_HASH_COST", "4".to_string()),
        ("AUDIT_SETTLE_DELAY_MS", "0".to_string()),
        ("RETRY_INITIAL_DELAY_MS", "5".to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

impl TestApp {
    pub async fn spawn(books: &[Book]) -> Self {
        Self::spawn_with(books, |_| {}, |state| state).await
    }

    /// `configure` adjusts the config before services are built;
    /// `customize` replaces services on the finished state.
    pub async fn spawn_with(
        books: &[Book],
        configure: impl FnOnce(&mut Config),
        customize: impl FnOnce(AppState) -> AppState,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        configure(&mut config);

        let db = Database::connect(config.database_config()).await.unwrap();
        if !books.is_empty() {
            let mut session = db.acquire_session().await.unwrap();
            queries::books::insert_batch(&mut session, books)
                .await
                .unwrap();
            session.commit().await.unwrap();
        }

        let (audit, _worker) = AuditLogger::spawn(db.clone(), config.audit_config());
        let state = customize(AppState::new(config, db.clone(), audit));
        let router = build_router(state.clone());

        Self {
            router,
            state,
            db,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_authorized(&self, uri: &str, token: &str) -> TestResponse {
        self.send(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_authorized(&self, uri: &str, token: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("username={username}&password={password}")))
                .unwrap(),
        )
        .await
    }

    /// Access token for a freshly created user
    pub async fn access_token(&self, username: &str, is_admin: bool) -> String {
        self.create_user(username, is_admin, true).await;
        let response = self.login(username, TEST_PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK);
        response.json()["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_user(&self, username: &str, is_admin: bool, is_active: bool) -> User {
        let hashed_password = hash_password(TEST_PASSWORD.to_string(), 4).await.unwrap();
        self.state
            .users
            .create(&NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                hashed_password,
                is_active,
                is_admin,
            })
            .await
            .unwrap()
    }

    pub async fn api_log_count(&self) -> i64 {
        let mut session = self.db.acquire_session().await.unwrap();
        queries::api_logs::count(&mut session).await.unwrap()
    }

    /// Wait until the audit worker has written at least `expected` records.
    pub async fn wait_for_api_logs(&self, expected: i64) -> i64 {
        for _ in 0..100 {
            let count = self.api_log_count().await;
            if count >= expected {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.api_log_count().await
    }
}
