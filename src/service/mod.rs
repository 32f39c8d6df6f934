//! File service for fileshelf.
//!
//! This module executes the plans produced by [`QuotaPolicy`] against the
//! object store:
//! - Listing with quota information
//! - Upload under the per-user lock
//! - Rename as download, upload, delete with cleanup
//! - Read and signed view with access confined to the caller's namespace

mod locks;

pub use locks::UserLocks;

use std::sync::Arc;

use serde::Serialize;

use crate::policy::{display_name, ObjectPath, QuotaPolicy, UploadCandidate};
use crate::storage::{ObjectInfo, SharedObjectStore, StorageError, DEFAULT_CONTENT_TYPE};
use crate::{Result, ShelfError};

/// Mimetype shown for objects without stored metadata.
const UNKNOWN_MIMETYPE: &str = "unknown";

/// A user file as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Stored name (`<timestamp>-<display name>`).
    pub name: String,
    /// Name without the timestamp token.
    pub display_name: String,
    /// Full object path including the user namespace.
    pub full_path: String,
    /// Download URL for the owner.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type, `"unknown"` when not recorded.
    pub mimetype: String,
    /// Creation timestamp, if known.
    pub created_at: Option<String>,
}

impl StoredFile {
    fn from_info(user_id: &str, info: ObjectInfo) -> Self {
        Self {
            display_name: display_name(&info.name).to_string(),
            full_path: format!("{user_id}/{}", info.name),
            url: format!("/api/files/{}", urlencoding::encode(&info.name)),
            size: info.size,
            mimetype: info.mimetype.unwrap_or_else(|| UNKNOWN_MIMETYPE.to_string()),
            created_at: info.created_at,
            name: info.name,
        }
    }
}

/// A user's files together with the quota they count against.
#[derive(Debug, Clone, Serialize)]
pub struct FileListing {
    /// Files sorted by stored name.
    pub files: Vec<StoredFile>,
    /// Number of files counted against the quota.
    pub file_count: usize,
    /// Maximum number of files allowed.
    pub max_files: usize,
    /// Maximum size of a single file in bytes.
    pub max_file_size: u64,
}

/// Downloaded file contents.
#[derive(Debug, Clone)]
pub struct FileContent {
    /// Stored name.
    pub name: String,
    /// Content type recorded at upload.
    pub content_type: String,
    /// File bytes.
    pub data: Vec<u8>,
}

/// File service shared by all request handlers.
pub struct FileService {
    store: SharedObjectStore,
    policy: QuotaPolicy,
    locks: Arc<UserLocks>,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(store: SharedObjectStore, policy: QuotaPolicy) -> Self {
        Self {
            store,
            policy,
            locks: Arc::new(UserLocks::new()),
        }
    }

    /// The quota policy in effect.
    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// The underlying object store.
    pub fn store(&self) -> &SharedObjectStore {
        &self.store
    }

    /// The per-user lock registry.
    pub fn locks(&self) -> &Arc<UserLocks> {
        &self.locks
    }

    async fn list_entries(&self, user_id: &str) -> Result<Vec<ObjectInfo>> {
        let mut entries: Vec<ObjectInfo> = self
            .store
            .list(user_id)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_placeholder())
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// List the caller's files.
    pub async fn list_files(&self, user_id: &str) -> Result<FileListing> {
        crate::policy::validate_namespace(user_id)?;
        let files: Vec<StoredFile> = self
            .list_entries(user_id)
            .await?
            .into_iter()
            .map(|info| StoredFile::from_info(user_id, info))
            .collect();

        let config = self.policy.config();
        Ok(FileListing {
            file_count: files.len(),
            files,
            max_files: config.max_files_per_user,
            max_file_size: config.max_file_size_bytes,
        })
    }

    /// Store a new file for `user_id`.
    pub async fn upload(&self, user_id: &str, candidate: UploadCandidate) -> Result<StoredFile> {
        let _guard = self.locks.acquire(user_id).await;

        let plan = self
            .policy
            .authorize_upload(user_id, &candidate, self.store.as_ref())
            .await?;
        let size = candidate.size();
        let path = plan.path.to_string();

        match self
            .store
            .upload(&path, candidate.data, &plan.content_type)
            .await
        {
            Ok(()) => {}
            Err(StorageError::AlreadyExists(_)) => {
                return Err(ShelfError::Conflict(format!(
                    "{} already exists",
                    plan.path.name()
                )))
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id, path = %path, size, "File uploaded");
        Ok(StoredFile::from_info(
            user_id,
            ObjectInfo {
                name: plan.path.name().to_string(),
                size,
                mimetype: Some(plan.content_type),
                created_at: Some(chrono::Utc::now().to_rfc3339()),
            },
        ))
    }

    /// Delete one of the caller's files, returning its path.
    pub async fn delete(&self, user_id: &str, file_name: &str) -> Result<String> {
        let path = self.policy.authorize_delete(user_id, file_name)?.to_string();

        let removed = self.store.remove(std::slice::from_ref(&path)).await?;
        if !removed.iter().any(|p| p == &path) {
            return Err(ShelfError::NotFound(format!("file {file_name}")));
        }

        tracing::info!(user_id, path = %path, "File deleted");
        Ok(path)
    }

    /// Rename one of the caller's files, returning the new stored name.
    ///
    /// The object is copied to its new path and the old copy removed. If the
    /// old copy cannot be removed, the new one is removed again and
    /// `PartialFailure` is returned.
    pub async fn rename(
        &self,
        user_id: &str,
        old_file_name: &str,
        new_display_name: &str,
    ) -> Result<String> {
        let plan = self
            .policy
            .authorize_rename(user_id, old_file_name, new_display_name)?;

        let _guard = self.locks.acquire(user_id).await;

        let entries = self.list_entries(user_id).await?;
        let Some(old_entry) = entries.iter().find(|e| e.name == plan.old_path.name()) else {
            return Err(ShelfError::NotFound(format!("file {old_file_name}")));
        };
        if entries.iter().any(|e| e.name == plan.new_path.name()) {
            return Err(ShelfError::RenameConflict(format!(
                "{} already exists",
                plan.new_path.name()
            )));
        }
        let content_type = old_entry
            .mimetype
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let old_path = plan.old_path.to_string();
        let new_path = plan.new_path.to_string();

        let data = self.store.download(&old_path).await.map_err(|e| match e {
            StorageError::NotFound(_) => ShelfError::NotFound(format!("file {old_file_name}")),
            other => other.into(),
        })?;

        self.store
            .upload(&new_path, data, &content_type)
            .await
            .map_err(|e| match e {
                StorageError::AlreadyExists(_) => ShelfError::RenameConflict(format!(
                    "{} already exists",
                    plan.new_path.name()
                )),
                other => other.into(),
            })?;

        if let Err(e) = self.store.remove(std::slice::from_ref(&old_path)).await {
            return Err(self.undo_copy(&plan.new_path, &old_path, e).await);
        }

        tracing::info!(user_id, from = %old_path, to = %new_path, "File renamed");
        Ok(plan.new_path.name().to_string())
    }

    /// Remove the new copy after the old one could not be deleted.
    async fn undo_copy(&self, new: &ObjectPath, old_path: &str, cause: StorageError) -> ShelfError {
        let new_path = new.to_string();
        match self.store.remove(std::slice::from_ref(&new_path)).await {
            Ok(_) => {
                tracing::warn!(old = %old_path, new = %new_path, error = %cause, "Rename rolled back: old file could not be deleted");
                ShelfError::PartialFailure(format!(
                    "could not delete {old_path} ({cause}); rename was rolled back"
                ))
            }
            Err(cleanup) => {
                tracing::error!(
                    old = %old_path,
                    new = %new_path,
                    error = %cause,
                    cleanup_error = %cleanup,
                    "Rename left both copies in storage"
                );
                ShelfError::PartialFailure(format!(
                    "could not delete {old_path} ({cause}) nor remove {new_path} ({cleanup}); both copies remain"
                ))
            }
        }
    }

    /// Fetch one of the caller's files.
    ///
    /// The content type comes from the namespace listing and falls back to
    /// `application/octet-stream`.
    pub async fn read(&self, user_id: &str, file_name: &str) -> Result<FileContent> {
        let path = self.policy.authorize_read(user_id, file_name)?;

        let data = self
            .store
            .download(&path.to_string())
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => ShelfError::NotFound(format!("file {file_name}")),
                other => other.into(),
            })?;

        let content_type = self
            .list_entries(user_id)
            .await?
            .into_iter()
            .find(|e| e.name == path.name())
            .and_then(|e| e.mimetype)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Ok(FileContent {
            name: path.name().to_string(),
            content_type,
            data,
        })
    }

    /// Issue a time-limited URL for one of the caller's files.
    pub async fn signed_view(&self, user_id: &str, file_name: &str) -> Result<String> {
        let plan = self.policy.authorize_signed_view(user_id, file_name)?;

        self.store
            .signed_url(&plan.path.to_string(), plan.ttl_secs)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => ShelfError::NotFound(format!("file {file_name}")),
                other => other.into(),
            })
    }
}
