//! Error types for fileshelf.

use thiserror::Error;

use crate::storage::StorageError;

/// Common error type for fileshelf.
#[derive(Error, Debug)]
pub enum ShelfError {
    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Upload exceeds the per-file size limit.
    #[error("file size {size} exceeds limit of {max} bytes")]
    FileTooLarge {
        /// Size of the rejected upload.
        size: u64,
        /// Configured limit.
        max: u64,
    },

    /// User already holds the maximum number of files.
    #[error("maximum file limit of {max} reached")]
    QuotaExceeded {
        /// Configured limit.
        max: usize,
    },

    /// Rename target already exists.
    #[error("rename conflict: {0}")]
    RenameConflict(String),

    /// A multi-step operation left storage in an inconsistent state.
    #[error("partial failure: {0}")]
    PartialFailure(String),

    /// The object storage collaborator failed.
    #[error("storage unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for ShelfError {
    fn from(e: sqlx::Error) -> Self {
        ShelfError::Database(e.to_string())
    }
}

impl From<StorageError> for ShelfError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(path) => ShelfError::NotFound(format!("file {path}")),
            StorageError::AlreadyExists(path) => ShelfError::Conflict(format!("{path} already exists")),
            StorageError::InvalidPath(msg) => ShelfError::Validation(msg),
            StorageError::Unavailable(msg) => ShelfError::UpstreamUnavailable(msg),
        }
    }
}

/// Result type alias for fileshelf operations.
pub type Result<T> = std::result::Result<T, ShelfError>;
