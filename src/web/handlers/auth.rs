//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::auth::{self, PasswordChange, RegistrationRequest};
use crate::db::{User, UserProfile, UserRepository};
use crate::service::FileService;
use crate::storage::UrlSigner;
use crate::web::dto::{
    ApiResponse, ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    RegisterRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims, TOKEN_COOKIE};
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account database.
    pub db: Database,
    /// File operations against the object store.
    pub files: Arc<FileService>,
    /// Verifies `/signed/...` URLs issued by local backends.
    pub signer: UrlSigner,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Session token expiry in seconds.
    pub jwt_expiry: u64,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
    /// Maximum number of registered users.
    pub max_users: i64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Database,
        files: Arc<FileService>,
        signer: UrlSigner,
        jwt_secret: &str,
        jwt_expiry: u64,
    ) -> Self {
        Self {
            db,
            files,
            signer,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            jwt_expiry,
            secure_cookies: false,
            max_users: 15,
        }
    }

    /// Set whether the session cookie is marked `Secure`.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Set the maximum number of registered users.
    pub fn with_max_users(mut self, max_users: i64) -> Self {
        self.max_users = max_users;
        self
    }

    /// Generate a session token for a user.
    pub fn generate_token(&self, user: &User) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now,
            exp: now + self.jwt_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((TOKEN_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .build()
    }
}

/// POST /api/auth/register - Create an account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let request = RegistrationRequest::new(req.username, req.email, req.password);
    let user = auth::register(&repo, request, state.max_users).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(user.profile()))))
}

/// POST /api/auth/login - Verify credentials and start a session.
///
/// The token is returned in the body and set as the `token` cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = auth::authenticate(&repo, &req.username, &req.password).await?;

    let access_token = state.generate_token(&user)?;
    let jar = jar.add(state.session_cookie(access_token.clone()));

    let response = LoginResponse {
        access_token,
        expires_in: state.jwt_expiry,
        user: user.profile(),
    };

    Ok((jar, Json(ApiResponse::new(response))))
}

/// POST /api/auth/logout - Clear the session cookie.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<MessageResponse>>) {
    // Always send the expired cookie, even when the request carried none.
    let mut removal = Cookie::build((TOKEN_COOKIE, "")).path("/").build();
    removal.make_removal();
    let jar = jar.add(removal);
    (jar, Json(ApiResponse::new(MessageResponse::new("Logged out"))))
}

/// GET /api/auth/me - Profile of the caller.
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let profile = auth::get_profile(&repo, auth_user.user_id()).await?;
    Ok(Json(ApiResponse::new(profile)))
}

/// POST /api/auth/change-password - Replace the caller's password.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let change = PasswordChange {
        current: req.current_password,
        new: req.new_password,
        confirm: req.confirm_password,
    };
    auth::change_password(&repo, auth_user.user_id(), &change).await?;

    Ok(Json(ApiResponse::new(MessageResponse::new(
        "Password changed successfully",
    ))))
}
