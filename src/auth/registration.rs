//! User registration and login for fileshelf.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_registration, ValidationError};
use crate::auth::{hash_password, verify_password, PasswordError};
use crate::db::{NewUser, User, UserRepository};
use crate::ShelfError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The configured user limit has been reached.
    #[error("registration closed: maximum number of users ({max}) reached")]
    RegistrationClosed {
        /// Configured limit.
        max: i64,
    },

    /// Username or email already registered.
    #[error("username or email already registered")]
    AlreadyRegistered,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Desired username (at least 3 characters).
    pub username: String,
    /// Email address.
    pub email: String,
    /// Password (at least 5 characters).
    pub password: String,
}

impl RegistrationRequest {
    /// Create a new registration request.
    ///
    /// Username and email are trimmed.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into().trim().to_string(),
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }
}

/// Register a new user.
///
/// This function:
/// 1. Validates all input fields
/// 2. Checks the user limit
/// 3. Checks that neither username nor email is taken
/// 4. Hashes the password
/// 5. Creates the user in the database
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
    max_users: i64,
) -> std::result::Result<User, RegistrationError> {
    validate_registration(&request.username, &request.email, &request.password)?;

    let count = repo
        .count()
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?;
    if count >= max_users {
        info!(count, max_users, "Registration rejected: user limit reached");
        return Err(RegistrationError::RegistrationClosed { max: max_users });
    }

    if repo
        .find_by_username_or_email(&request.username, &request.email)
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?
        .is_some()
    {
        return Err(RegistrationError::AlreadyRegistered);
    }

    let password_hash = hash_password(&request.password)?;

    let user = repo
        .create(&NewUser::new(&request.username, &request.email, password_hash))
        .await
        .map_err(|e| match e {
            ShelfError::Conflict(_) => RegistrationError::AlreadyRegistered,
            other => RegistrationError::Database(other.to_string()),
        })?;

    info!(
        username = %user.username,
        user_id = %user.id,
        "New user registered"
    );

    Ok(user)
}

/// Login errors.
#[derive(Error, Debug)]
pub enum LoginError {
    /// Unknown username or wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Check a username and password, returning the matching user.
///
/// Unknown users and wrong passwords are indistinguishable to the caller.
pub async fn authenticate(
    repo: &UserRepository<'_>,
    username: &str,
    password: &str,
) -> std::result::Result<User, LoginError> {
    let user = repo
        .get_by_username(username.trim())
        .await
        .map_err(|e| LoginError::Database(e.to_string()))?
        .ok_or(LoginError::InvalidCredentials)?;

    verify_password(password, &user.password).map_err(|_| LoginError::InvalidCredentials)?;

    info!(username = %user.username, user_id = %user.id, "User logged in");
    Ok(user)
}
