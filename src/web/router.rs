//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::WebConfig;

use super::handlers::{
    change_password, delete_file, download_file, list_files, login, logout, me, register,
    rename_file, serve_signed, upload_file, view_file, AppState,
};
use super::middleware::{
    api_rate_limit, create_cors_layer, jwt_auth, login_rate_limit, security_headers, JwtState,
    RateLimitState,
};

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the main API router.
///
/// Login and registration share the stricter login rate limit; every other
/// `/api` route is under the general API limit.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    rate_limit: Arc<RateLimitState>,
    config: &WebConfig,
) -> Router {
    let login_limit = rate_limit.clone();
    let credential_routes = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .layer(middleware::from_fn(move |req, next| {
            let state = login_limit.clone();
            login_rate_limit(state, req, next)
        }));

    let auth_routes = Router::new()
        .merge(credential_routes)
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/change-password", post(change_password));

    let body_limit = app_state.files.policy().config().max_file_size_bytes as usize
        + MULTIPART_OVERHEAD_BYTES;
    let file_routes = Router::new()
        .route("/", get(list_files).post(upload_file))
        .route("/delete", post(delete_file))
        .route("/rename", post(rename_file))
        .route("/:file_name", get(download_file))
        .route("/:file_name/view", get(view_file))
        .layer(DefaultBodyLimit::max(body_limit));

    let api_limit = rate_limit;
    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/files", file_routes)
        .layer(middleware::from_fn(move |req, next| {
            let state = api_limit.clone();
            api_rate_limit(state, req, next)
        }));

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .route("/signed/*path", get(serve_signed))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
