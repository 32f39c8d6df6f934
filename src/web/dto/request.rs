//! Request DTOs for the HTTP API.
//!
//! These validate shape only (presence, maximum lengths, control characters).
//! Account rules live in [`crate::auth`] and file name rules in
//! [`crate::policy`].

use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub email: String,
    /// Username.
    #[validate(custom(function = "no_control_chars"))]
    pub username: String,
    /// Password.
    pub password: String,
}

/// Password change request.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// Current password.
    pub current_password: String,
    /// New password.
    pub new_password: String,
    /// New password again.
    pub confirm_password: String,
}

/// File deletion request.
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteFileRequest {
    /// Stored file name.
    #[validate(length(min = 1, max = 255, message = "File name must be 1-255 characters"))]
    pub file_name: String,
}

/// File rename request.
#[derive(Debug, Deserialize, Validate)]
pub struct RenameFileRequest {
    /// Current stored file name.
    #[validate(length(min = 1, max = 255, message = "File name must be 1-255 characters"))]
    pub old_file_name: String,
    /// New display name (sanitized server-side).
    #[validate(
        length(max = 255, message = "File name must be at most 255 characters"),
        custom(function = "not_empty_trimmed")
    )]
    pub new_file_name: String,
}

/// Query string of a signed URL.
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    /// Expiry (unix seconds).
    pub expires: i64,
    /// Hex HMAC signature.
    pub signature: String,
}
