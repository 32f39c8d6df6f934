//! Profile lookup and password changes.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_new_password, ValidationError};
use crate::auth::{hash_password, verify_password, PasswordError};
use crate::db::{UserProfile, UserRepository};

/// Profile-related errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Password error.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Current password is incorrect.
    #[error("current password is incorrect")]
    WrongPassword,

    /// New password and confirmation differ.
    #[error("new password and confirmation do not match")]
    PasswordMismatch,

    /// New password equals the current one.
    #[error("new password must differ from the current password")]
    SamePassword,

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Password change request.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    /// Current password.
    pub current: String,
    /// New password.
    pub new: String,
    /// New password again.
    pub confirm: String,
}

/// Get a user's profile by ID.
pub async fn get_profile(
    repo: &UserRepository<'_>,
    user_id: &str,
) -> Result<UserProfile, ProfileError> {
    let user = repo
        .get_by_id(user_id)
        .await
        .map_err(|e| ProfileError::Database(e.to_string()))?
        .ok_or(ProfileError::UserNotFound)?;

    Ok(user.profile())
}

/// Change a user's password.
///
/// Checks, in order: lengths of all three fields, that new and confirm
/// match, that the current password verifies, and that the new one differs.
pub async fn change_password(
    repo: &UserRepository<'_>,
    user_id: &str,
    change: &PasswordChange,
) -> Result<(), ProfileError> {
    validate_new_password(&change.current)?;
    validate_new_password(&change.new)?;
    validate_new_password(&change.confirm)?;

    if change.new != change.confirm {
        return Err(ProfileError::PasswordMismatch);
    }

    let user = repo
        .get_by_id(user_id)
        .await
        .map_err(|e| ProfileError::Database(e.to_string()))?
        .ok_or(ProfileError::UserNotFound)?;

    match verify_password(&change.current, &user.password) {
        Ok(()) => {}
        Err(PasswordError::VerificationFailed) => return Err(ProfileError::WrongPassword),
        Err(e) => return Err(e.into()),
    }

    if change.new == change.current {
        return Err(ProfileError::SamePassword);
    }

    let hash = hash_password(&change.new)?;
    let updated = repo
        .update_password(user_id, &hash)
        .await
        .map_err(|e| ProfileError::Database(e.to_string()))?;
    if !updated {
        return Err(ProfileError::UserNotFound);
    }

    info!(user_id, "Password changed");
    Ok(())
}
