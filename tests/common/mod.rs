//! Shared helpers for HTTP API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use fileshelf::config::{QuotaConfig, WebConfig};
use fileshelf::storage::MemoryObjectStore;
use fileshelf::web::handlers::AppState;
use fileshelf::web::middleware::{JwtState, RateLimitState};
use fileshelf::web::router::{create_health_router, create_router};
use fileshelf::{Database, FileService, QuotaPolicy, UrlSigner};
use serde_json::{json, Value};

/// Base URL the test signer puts in front of signed paths.
pub const SIGNED_BASE_URL: &str = "http://files.test";

/// Create a test configuration.
pub fn create_test_config() -> WebConfig {
    WebConfig {
        cors_origins: vec![],
        jwt_secret: "test-secret-key-for-testing-only".to_string(),
        jwt_expiry_secs: 900,
        secure_cookies: false,
        login_rate_limit: 1000,
        api_rate_limit: 10000,
    }
}

/// Handles to the pieces behind a test server.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub store: Arc<MemoryObjectStore>,
}

/// Create a test server with an in-memory database and object store.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(QuotaConfig::default(), create_test_config()).await
}

/// Create a test server with custom quota and web settings.
pub async fn create_test_app_with(quota: QuotaConfig, config: WebConfig) -> TestApp {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");

    let signer = UrlSigner::new(&config.jwt_secret, SIGNED_BASE_URL);
    let store = Arc::new(MemoryObjectStore::new(signer.clone()));
    let max_users = quota.max_users;
    let files = Arc::new(FileService::new(store.clone(), QuotaPolicy::new(quota)));

    let app_state = Arc::new(
        AppState::new(
            db.clone(),
            files,
            signer,
            &config.jwt_secret,
            config.jwt_expiry_secs,
        )
        .with_max_users(max_users),
    );
    let jwt_state = Arc::new(JwtState::new(&config.jwt_secret));
    let rate_limit = Arc::new(RateLimitState::new(
        config.login_rate_limit,
        config.api_rate_limit,
    ));

    let router =
        create_router(app_state, jwt_state, rate_limit, &config).merge(create_health_router());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp { server, db, store }
}

/// Register a user and return the response.
pub async fn register_user(server: &TestServer, username: &str, password: &str) -> TestResponse {
    server
        .post("/api/auth/register")
        .json(&json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "password": password
        }))
        .await
}

/// Log in and return the response.
pub async fn login_user(server: &TestServer, username: &str, password: &str) -> TestResponse {
    server
        .post("/api/auth/login")
        .json(&json!({
            "username": username,
            "password": password
        }))
        .await
}

/// Register and log in a user, returning `(user_id, access_token)`.
pub async fn register_and_login(server: &TestServer, username: &str) -> (String, String) {
    register_user(server, username, "password123").await;
    let body = login_user(server, username, "password123")
        .await
        .json::<Value>();
    (
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
        body["data"]["access_token"].as_str().unwrap().to_string(),
    )
}

/// Bearer header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Upload `data` as `file_name` and return the response.
pub async fn upload(
    server: &TestServer,
    token: &str,
    file_name: &str,
    data: &[u8],
    mime: &str,
) -> TestResponse {
    let part = Part::bytes(data.to_vec())
        .file_name(file_name.to_string())
        .mime_type(mime.to_string());
    server
        .post("/api/files")
        .add_header(AUTHORIZATION, bearer(token))
        .multipart(MultipartForm::new().add_part("file", part))
        .await
}

/// Stored name of the file in an upload response.
pub fn stored_name(response: &TestResponse) -> String {
    response.json::<Value>()["data"]["file"]["name"]
        .as_str()
        .unwrap()
        .to_string()
}

/// List the caller's files and return the `data` object.
pub async fn list(server: &TestServer, token: &str) -> Value {
    server
        .get("/api/files")
        .add_header(AUTHORIZATION, bearer(token))
        .await
        .json::<Value>()["data"]
        .clone()
}
