//! Response DTOs for the HTTP API.

use serde::Serialize;

use crate::db::UserProfile;
use crate::service::StoredFile;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Session token (JWT), also set as the `token` cookie.
    pub access_token: String,
    /// Token expiry in seconds.
    pub expires_in: u64,
    /// The logged-in user.
    pub user: UserProfile,
}

/// Generic message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

impl MessageResponse {
    /// Create a message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Upload result.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// The stored file.
    pub file: StoredFile,
}

/// Delete result.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Object path that was removed.
    pub deleted: String,
}

/// Rename result.
#[derive(Debug, Serialize)]
pub struct RenameResponse {
    /// New stored name.
    pub new_file_name: String,
}
