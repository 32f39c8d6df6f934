//! Object storage for fileshelf.
//!
//! Files live in an external key/blob store addressed by `"<namespace>/<name>"`
//! paths. This module defines the narrow capability the rest of the crate
//! consumes plus the available backends:
//! - `SupabaseObjectStore`: Supabase Storage REST API
//! - `DiskObjectStore`: local filesystem with HMAC-signed URLs
//! - `MemoryObjectStore`: in-process map, for tests and demos

mod disk;
mod memory;
mod signer;
mod supabase;

pub use disk::DiskObjectStore;
pub use memory::MemoryObjectStore;
pub use signer::UrlSigner;
pub use supabase::SupabaseObjectStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

/// Name of the entry some stores use to represent an otherwise empty folder.
///
/// It is a storage artifact, never a user file.
pub const PLACEHOLDER_NAME: &str = ".emptyFolderPlaceholder";

/// Content type used when a store has no metadata for an object.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors reported by storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No object at the given path.
    #[error("object not found: {0}")]
    NotFound(String),

    /// An object already exists at the given path (uploads never overwrite).
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// The path is not a valid object path.
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// The backend could not be reached or answered with an error.
    #[error("storage backend error: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// One entry of a namespace listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Object name relative to the listed prefix.
    pub name: String,
    /// Size in bytes (0 when the backend reports none).
    pub size: u64,
    /// Stored content type, if known.
    pub mimetype: Option<String>,
    /// Creation timestamp (RFC 3339), if known.
    pub created_at: Option<String>,
}

impl ObjectInfo {
    /// Whether this entry is the empty-folder placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.name == PLACEHOLDER_NAME
    }
}

/// Object storage capability.
///
/// `list` returns the direct children of a prefix (no recursion). `upload`
/// never overwrites: an existing path yields `StorageError::AlreadyExists`.
/// `remove` returns the paths that were actually removed.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str;

    /// List the entries directly under `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Store `data` at `path` with the given content type.
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Fetch the bytes stored at `path`.
    async fn download(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Remove the given paths, returning those that existed.
    async fn remove(&self, paths: &[String]) -> StorageResult<Vec<String>>;

    /// Issue a time-limited URL granting read access to `path`.
    async fn signed_url(&self, path: &str, ttl_secs: u64) -> StorageResult<String>;
}

/// Shared handle to a storage backend.
pub type SharedObjectStore = Arc<dyn ObjectStore>;

/// Check that `path` is a relative object path without empty or dot segments.
pub(crate) fn check_object_path(path: &str) -> StorageResult<()> {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Percent-encode each segment of an object path, keeping the separators.
pub(crate) fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the configured storage backend.
///
/// `signer` is used by the local backends to issue signed URLs that this
/// process serves itself.
pub async fn open_store(config: &StorageConfig, signer: UrlSigner) -> crate::Result<SharedObjectStore> {
    let store: SharedObjectStore = match config.backend {
        StorageBackend::Disk => Arc::new(DiskObjectStore::new(&config.disk_path, signer).await?),
        StorageBackend::Memory => Arc::new(MemoryObjectStore::new(signer)),
        StorageBackend::Supabase => Arc::new(SupabaseObjectStore::new(
            &config.supabase_url,
            &config.supabase_key,
            &config.bucket,
            config.request_timeout_secs,
        )?),
    };
    tracing::info!(backend = store.backend_name(), "Object storage initialized");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_object_path_valid() {
        assert!(check_object_path("user-1/123-file.txt").is_ok());
        assert!(check_object_path("user-1").is_ok());
    }

    #[test]
    fn test_check_object_path_invalid() {
        assert!(check_object_path("").is_err());
        assert!(check_object_path("/abs/path").is_err());
        assert!(check_object_path("user//file").is_err());
        assert!(check_object_path("user/../other/file").is_err());
        assert!(check_object_path("user/./file").is_err());
        assert!(check_object_path("user\\file").is_err());
        assert!(check_object_path("user/").is_err());
    }

    #[test]
    fn test_encode_object_path() {
        assert_eq!(encode_object_path("u1/a b.txt"), "u1/a%20b.txt");
        assert_eq!(encode_object_path("u1/1-report.pdf"), "u1/1-report.pdf");
        assert_eq!(encode_object_path("u1/x?y#z"), "u1/x%3Fy%23z");
    }

    #[test]
    fn test_placeholder_detection() {
        let info = ObjectInfo {
            name: PLACEHOLDER_NAME.to_string(),
            size: 0,
            mimetype: None,
            created_at: None,
        };
        assert!(info.is_placeholder());

        let info = ObjectInfo {
            name: "1-a.txt".to_string(),
            ..info
        };
        assert!(!info.is_placeholder());
    }
}
