//! Quota and path policy.
//!
//! `QuotaPolicy` decides whether a file operation may proceed and where the
//! affected objects live. It performs no writes: callers execute the returned
//! plans against the object store.

mod path;

pub use path::{
    display_name, extract_timestamp, sanitize_display_name, stored_name, validate_file_name,
    validate_namespace, ObjectPath,
};

use crate::config::QuotaConfig;
use crate::storage::{ObjectStore, DEFAULT_CONTENT_TYPE};
use crate::{Result, ShelfError};

/// A file offered for upload.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    /// Original file name as supplied by the client.
    pub name: String,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Vec<u8>,
}

impl UploadCandidate {
    /// Size of the contents in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Approved upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    /// Where to write the object.
    pub path: ObjectPath,
    /// Content type to store with the object.
    pub content_type: String,
}

/// Approved rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    /// Current location.
    pub old_path: ObjectPath,
    /// Target location.
    pub new_path: ObjectPath,
}

/// Approved signed view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedViewPlan {
    /// Object to sign.
    pub path: ObjectPath,
    /// URL lifetime in seconds.
    pub ttl_secs: u64,
}

/// Current time in epoch milliseconds.
fn system_clock() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Per-user quota and path rules.
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    config: QuotaConfig,
    clock: fn() -> i64,
}

impl QuotaPolicy {
    /// Create a policy using the system clock.
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            config,
            clock: system_clock,
        }
    }

    /// Replace the clock used for timestamp tokens.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Configured limits.
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Number of user files currently stored for `user_id`.
    ///
    /// The empty-folder placeholder is not counted.
    pub async fn file_count(&self, user_id: &str, store: &dyn ObjectStore) -> Result<usize> {
        validate_namespace(user_id)?;
        let entries = store.list(user_id).await?;
        Ok(entries.iter().filter(|entry| !entry.is_placeholder()).count())
    }

    /// Decide whether `candidate` may be stored for `user_id`.
    ///
    /// Size is checked before the namespace is listed, so an oversized file
    /// never reaches storage.
    pub async fn authorize_upload(
        &self,
        user_id: &str,
        candidate: &UploadCandidate,
        store: &dyn ObjectStore,
    ) -> Result<UploadPlan> {
        validate_namespace(user_id)?;
        validate_file_name(&candidate.name)?;

        let size = candidate.size();
        if size > self.config.max_file_size_bytes {
            return Err(ShelfError::FileTooLarge {
                size,
                max: self.config.max_file_size_bytes,
            });
        }

        let count = self.file_count(user_id, store).await?;
        if count >= self.config.max_files_per_user {
            tracing::info!(user_id, count, "Upload rejected: file limit reached");
            return Err(ShelfError::QuotaExceeded {
                max: self.config.max_files_per_user,
            });
        }

        let stored = stored_name((self.clock)(), &candidate.name);
        let content_type = candidate
            .content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&candidate.name)
                    .first_raw()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string()
            });

        Ok(UploadPlan {
            path: ObjectPath::new(user_id, &stored)?,
            content_type,
        })
    }

    /// Locate `file_name` for deletion.
    pub fn authorize_delete(&self, user_id: &str, file_name: &str) -> Result<ObjectPath> {
        ObjectPath::new(user_id, file_name)
    }

    /// Plan a rename of `old_file_name` to `new_display_name`.
    ///
    /// The timestamp token of the old name is kept; a name without one gets
    /// a fresh token from the clock. The new display name is sanitized.
    pub fn authorize_rename(
        &self,
        user_id: &str,
        old_file_name: &str,
        new_display_name: &str,
    ) -> Result<RenamePlan> {
        let old_path = ObjectPath::new(user_id, old_file_name)?;

        if new_display_name.trim().is_empty() {
            return Err(ShelfError::Validation(
                "new file name must not be empty".to_string(),
            ));
        }
        let sanitized = sanitize_display_name(new_display_name);

        let new_stored = match extract_timestamp(old_file_name) {
            Some(token) => stored_name(token, &sanitized),
            None => stored_name((self.clock)(), &sanitized),
        };
        let new_path = ObjectPath::new(user_id, &new_stored)?;

        if new_path == old_path {
            return Err(ShelfError::RenameConflict(format!(
                "{new_stored} is already the current name"
            )));
        }

        Ok(RenamePlan { old_path, new_path })
    }

    /// Locate `file_name` for download.
    pub fn authorize_read(&self, user_id: &str, file_name: &str) -> Result<ObjectPath> {
        ObjectPath::new(user_id, file_name)
    }

    /// Locate `file_name` for a time-limited signed URL.
    pub fn authorize_signed_view(&self, user_id: &str, file_name: &str) -> Result<SignedViewPlan> {
        Ok(SignedViewPlan {
            path: ObjectPath::new(user_id, file_name)?,
            ttl_secs: self.config.signed_url_ttl_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryObjectStore, UrlSigner, PLACEHOLDER_NAME};

    const NOW: i64 = 1_700_000_000_000;

    fn fixed_clock() -> i64 {
        NOW
    }

    fn policy() -> QuotaPolicy {
        QuotaPolicy::new(QuotaConfig::default()).with_clock(fixed_clock)
    }

    fn store() -> MemoryObjectStore {
        MemoryObjectStore::new(UrlSigner::new("secret", "http://localhost:3000"))
    }

    fn candidate(name: &str, size: usize) -> UploadCandidate {
        UploadCandidate {
            name: name.to_string(),
            content_type: Some("text/plain".to_string()),
            data: vec![b'x'; size],
        }
    }

    async fn fill(store: &MemoryObjectStore, user_id: &str, n: usize) {
        for i in 0..n {
            store
                .upload(&format!("{user_id}/{i}-f.txt"), vec![1], "text/plain")
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_authorize_upload_builds_path() {
        let store = store();
        let plan = policy()
            .authorize_upload("u1", &candidate("report.txt", 10), &store)
            .await
            .unwrap();

        assert_eq!(plan.path.to_string(), "u1/1700000000000-report.txt");
        assert_eq!(plan.path.name(), "1700000000000-report.txt");
        assert_eq!(plan.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_authorize_upload_guesses_content_type() {
        let store = store();
        let mut c = candidate("photo.png", 10);
        c.content_type = None;
        let plan = policy().authorize_upload("u1", &c, &store).await.unwrap();
        assert_eq!(plan.content_type, "image/png");

        let mut c = candidate("blob", 10);
        c.content_type = Some(String::new());
        let plan = policy().authorize_upload("u1", &c, &store).await.unwrap();
        assert_eq!(plan.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_authorize_upload_size_limit() {
        let store = store();
        let max = QuotaConfig::default().max_file_size_bytes as usize;

        assert!(policy()
            .authorize_upload("u1", &candidate("ok.bin", max), &store)
            .await
            .is_ok());

        let result = policy()
            .authorize_upload("u1", &candidate("big.bin", max + 1), &store)
            .await;
        assert!(matches!(
            result,
            Err(ShelfError::FileTooLarge { size, max: limit }) if size == max as u64 + 1 && limit == max as u64
        ));
    }

    #[tokio::test]
    async fn test_authorize_upload_quota() {
        let store = store();
        fill(&store, "u1", 11).await;

        assert!(policy()
            .authorize_upload("u1", &candidate("twelfth.txt", 1), &store)
            .await
            .is_ok());

        store.upload("u1/11-f.txt", vec![1], "text/plain").await.unwrap();
        let result = policy()
            .authorize_upload("u1", &candidate("thirteenth.txt", 1), &store)
            .await;
        assert!(matches!(result, Err(ShelfError::QuotaExceeded { max: 12 })));
    }

    #[tokio::test]
    async fn test_placeholder_not_counted() {
        let store = store();
        fill(&store, "u1", 11).await;
        store
            .upload(&format!("u1/{PLACEHOLDER_NAME}"), vec![], "text/plain")
            .await
            .unwrap();

        assert_eq!(policy().file_count("u1", &store).await.unwrap(), 11);
        assert!(policy()
            .authorize_upload("u1", &candidate("a.txt", 1), &store)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_quota_is_per_user() {
        let store = store();
        fill(&store, "u2", 12).await;

        assert!(policy()
            .authorize_upload("u1", &candidate("a.txt", 1), &store)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_authorize_upload_rejects_traversal() {
        let store = store();
        let result = policy()
            .authorize_upload("u1", &candidate("../u2/x.txt", 1), &store)
            .await;
        assert!(matches!(result, Err(ShelfError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_authorize_rename_preserves_token() {
        let plan = policy()
            .authorize_rename("u1", "1699999999999-old.txt", "my file!.pdf")
            .unwrap();
        assert_eq!(plan.old_path.to_string(), "u1/1699999999999-old.txt");
        assert_eq!(plan.new_path.to_string(), "u1/1699999999999-my_file_.pdf");
    }

    #[test]
    fn test_authorize_rename_synthesizes_token() {
        let plan = policy().authorize_rename("u1", "legacy.txt", "new.txt").unwrap();
        assert_eq!(plan.new_path.name(), "1700000000000-new.txt");
    }

    #[test]
    fn test_authorize_rename_sanitizes_surrounding_whitespace() {
        let plan = policy().authorize_rename("u1", "5-a.txt", " b.txt ").unwrap();
        assert_eq!(plan.new_path.name(), "5-_b.txt_");
    }

    #[test]
    fn test_authorize_rename_same_name_conflicts() {
        let result = policy().authorize_rename("u1", "5-a.txt", "a.txt");
        assert!(matches!(result, Err(ShelfError::RenameConflict(_))));
    }

    #[test]
    fn test_authorize_rename_rejects_bad_names() {
        assert!(matches!(
            policy().authorize_rename("u1", "5-a.txt", "   "),
            Err(ShelfError::Validation(_))
        ));
        assert!(matches!(
            policy().authorize_rename("u1", "../u2/5-a.txt", "b.txt"),
            Err(ShelfError::Validation(_))
        ));
    }

    #[test]
    fn test_authorize_read_delete_and_view() {
        let p = policy();
        assert_eq!(p.authorize_read("u1", "1-a.txt").unwrap().to_string(), "u1/1-a.txt");
        assert_eq!(p.authorize_delete("u1", "1-a.txt").unwrap().to_string(), "u1/1-a.txt");

        let view = p.authorize_signed_view("u1", "1-a.txt").unwrap();
        assert_eq!(view.path.to_string(), "u1/1-a.txt");
        assert_eq!(view.ttl_secs, 300);

        assert!(p.authorize_read("u1", "../u2/1-a.txt").is_err());
        assert!(p.authorize_delete("u1", "").is_err());
    }
}
