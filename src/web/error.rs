//! API error handling for the fileshelf HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::auth::{LoginError, ProfileError, RegistrationError};
use crate::ShelfError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Conflict (409).
    Conflict,
    /// Upload larger than the per-file limit (413).
    FileTooLarge,
    /// Per-user file limit reached (403).
    QuotaExceeded,
    /// Rename target already exists (409).
    RenameConflict,
    /// Validation error (422).
    ValidationError,
    /// Too many requests (429).
    TooManyRequests,
    /// Multi-step storage operation left partial state (500).
    PartialFailure,
    /// Internal server error (500).
    InternalError,
    /// Object storage failed (502).
    UpstreamUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden | ErrorCode::QuotaExceeded => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict | ErrorCode::RenameConflict => StatusCode::CONFLICT,
            ErrorCode::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::PartialFailure | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Field-level validation error details (only present for validation errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with field-level details.
    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Create a validation error without field details.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create a too-many-requests error.
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a validation error with field-level details.
    pub fn validation(details: HashMap<String, Vec<String>>) -> Self {
        Self::with_details(ErrorCode::ValidationError, "Validation failed", details)
    }

    /// Create a validation error from validator::ValidationErrors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut details: HashMap<String, Vec<String>> = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            details.insert(field.to_string(), messages);
        }

        Self::validation(details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ShelfError> for ApiError {
    fn from(err: ShelfError) -> Self {
        match &err {
            ShelfError::Auth(msg) => ApiError::unauthorized(msg.clone()),
            ShelfError::NotFound(_) => ApiError::not_found(err.to_string()),
            ShelfError::Validation(msg) => ApiError::unprocessable(msg.clone()),
            ShelfError::Conflict(msg) => ApiError::conflict(msg.clone()),
            ShelfError::FileTooLarge { max, .. } => ApiError::new(
                ErrorCode::FileTooLarge,
                format!("File exceeds the maximum size of {} MB", max / (1024 * 1024)),
            ),
            ShelfError::QuotaExceeded { max } => ApiError::new(
                ErrorCode::QuotaExceeded,
                format!("Maximum file limit of {max} reached"),
            ),
            ShelfError::RenameConflict(_) => ApiError::new(
                ErrorCode::RenameConflict,
                "A file with that name already exists",
            ),
            ShelfError::PartialFailure(detail) => {
                tracing::error!(detail = %detail, "Partial storage failure");
                ApiError::new(
                    ErrorCode::PartialFailure,
                    "The operation did not complete; some changes may remain",
                )
            }
            ShelfError::UpstreamUnavailable(detail) => {
                tracing::error!(detail = %detail, "Object storage unavailable");
                ApiError::new(
                    ErrorCode::UpstreamUnavailable,
                    "File storage is temporarily unavailable",
                )
            }
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(e) => ApiError::unprocessable(e.to_string()),
            RegistrationError::RegistrationClosed { .. } => ApiError::forbidden(err.to_string()),
            RegistrationError::AlreadyRegistered => ApiError::conflict(err.to_string()),
            RegistrationError::Password(_) | RegistrationError::Database(_) => {
                tracing::error!("Registration failed: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::InvalidCredentials => ApiError::unauthorized("Invalid username or password"),
            LoginError::Database(_) => {
                tracing::error!("Login failed: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::UserNotFound => ApiError::not_found("User not found"),
            ProfileError::Validation(e) => ApiError::unprocessable(e.to_string()),
            ProfileError::WrongPassword => ApiError::unauthorized(err.to_string()),
            ProfileError::PasswordMismatch | ProfileError::SamePassword => {
                ApiError::bad_request(err.to_string())
            }
            ProfileError::Password(_) | ProfileError::Database(_) => {
                tracing::error!("Profile operation failed: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::FileTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(ErrorCode::QuotaExceeded.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::RenameConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::ValidationError.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::TooManyRequests.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::PartialFailure.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::UpstreamUnavailable.status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_code_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::FileTooLarge).unwrap(),
            "\"FILE_TOO_LARGE\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::UpstreamUnavailable).unwrap(),
            "\"UPSTREAM_UNAVAILABLE\""
        );
    }

    #[test]
    fn test_from_shelf_error() {
        let err: ApiError = ShelfError::FileTooLarge {
            size: 6 * 1024 * 1024,
            max: 5 * 1024 * 1024,
        }
        .into();
        assert_eq!(err.code, ErrorCode::FileTooLarge);
        assert_eq!(err.message, "File exceeds the maximum size of 5 MB");

        let err: ApiError = ShelfError::QuotaExceeded { max: 12 }.into();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);

        let err: ApiError = ShelfError::NotFound("file a.txt".to_string()).into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: ApiError = ShelfError::RenameConflict("u1/1-a.txt".to_string()).into();
        assert_eq!(err.code, ErrorCode::RenameConflict);

        let err: ApiError = ShelfError::Validation("bad name".to_string()).into();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err: ApiError = ShelfError::UpstreamUnavailable("timeout".to_string()).into();
        assert_eq!(err.code, ErrorCode::UpstreamUnavailable);
        assert!(!err.message.contains("timeout"));

        let err: ApiError = ShelfError::Database("disk I/O".to_string()).into();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_from_auth_errors() {
        let err: ApiError = RegistrationError::AlreadyRegistered.into();
        assert_eq!(err.code, ErrorCode::Conflict);

        let err: ApiError = RegistrationError::RegistrationClosed { max: 15 }.into();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err: ApiError = LoginError::InvalidCredentials.into();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let err: ApiError = ProfileError::PasswordMismatch.into();
        assert_eq!(err.code, ErrorCode::BadRequest);

        let err: ApiError = ProfileError::WrongPassword.into();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_validation_error() {
        let mut details = HashMap::new();
        details.insert("username".to_string(), vec!["Too short".to_string()]);

        let err = ApiError::validation(details);
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Validation failed");

        let details = err.details.unwrap();
        assert_eq!(
            details.get("username").unwrap(),
            &vec!["Too short".to_string()]
        );
    }
}
