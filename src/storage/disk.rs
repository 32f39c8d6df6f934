//! Local filesystem storage backend.
//!
//! Objects are stored as plain files with a JSON metadata sidecar:
//! ```text
//! {root}/
//! ├── objects/
//! │   └── {namespace}/{name}
//! └── meta/
//!     └── {namespace}/{name}.json
//! ```

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{
    check_object_path, ObjectInfo, ObjectStore, StorageError, StorageResult, UrlSigner,
};

/// Metadata kept next to each object.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
    size: u64,
    created_at: String,
}

/// Filesystem-backed object store.
#[derive(Debug, Clone)]
pub struct DiskObjectStore {
    root: PathBuf,
    signer: UrlSigner,
}

impl DiskObjectStore {
    /// Create a store rooted at `root`, creating the directory layout if needed.
    pub async fn new(root: impl Into<PathBuf>, signer: UrlSigner) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("objects")).await?;
        fs::create_dir_all(root.join("meta")).await?;
        Ok(Self { root, signer })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, path: &str) -> PathBuf {
        self.root.join("objects").join(path)
    }

    fn meta_path(&self, path: &str) -> PathBuf {
        self.root.join("meta").join(format!("{path}.json"))
    }

    async fn read_meta(&self, path: &str) -> Option<ObjectMeta> {
        let raw = fs::read(self.meta_path(path)).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }

    async fn write_object(
        &self,
        file: &mut fs::File,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> StorageResult<()> {
        file.write_all(data).await.map_err(unavailable)?;
        file.flush().await.map_err(unavailable)?;

        let meta = ObjectMeta {
            content_type: content_type.to_string(),
            size: data.len() as u64,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let meta_path = self.meta_path(path);
        Self::ensure_parent(&meta_path).await?;
        let encoded =
            serde_json::to_vec(&meta).map_err(|e| StorageError::Unavailable(e.to_string()))?;
        fs::write(&meta_path, encoded).await.map_err(unavailable)
    }

    async fn ensure_parent(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(unavailable)?;
        }
        Ok(())
    }
}

fn unavailable(e: io::Error) -> StorageError {
    StorageError::Unavailable(e.to_string())
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    fn backend_name(&self) -> &'static str {
        "disk"
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        check_object_path(prefix)?;
        let dir = self.object_path(prefix);

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(unavailable(e)),
        };

        let mut result = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let file_type = entry.file_type().await.map_err(unavailable)?;
            if !file_type.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            let full = format!("{prefix}/{name}");
            let info = match self.read_meta(&full).await {
                Some(meta) => ObjectInfo {
                    name,
                    size: meta.size,
                    mimetype: Some(meta.content_type),
                    created_at: Some(meta.created_at),
                },
                None => {
                    let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
                    ObjectInfo {
                        name,
                        size,
                        mimetype: None,
                        created_at: None,
                    }
                }
            };
            result.push(info);
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        check_object_path(path)?;
        let object_path = self.object_path(path);
        Self::ensure_parent(&object_path).await?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&object_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(path.to_string()))
            }
            Err(e) => return Err(unavailable(e)),
        };

        // Remove the object again when it or its metadata could not be written.
        if let Err(e) = self.write_object(&mut file, path, &data, content_type).await {
            drop(file);
            let _ = fs::remove_file(&object_path).await;
            return Err(e);
        }

        Ok(())
    }

    async fn download(&self, path: &str) -> StorageResult<Vec<u8>> {
        check_object_path(path)?;
        match fs::read(self.object_path(path)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<Vec<String>> {
        let mut removed = Vec::new();
        for path in paths {
            check_object_path(path)?;
            match fs::remove_file(self.object_path(path)).await {
                Ok(()) => {
                    let _ = fs::remove_file(self.meta_path(path)).await;
                    removed.push(path.clone());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(unavailable(e)),
            }
        }
        Ok(removed)
    }

    async fn signed_url(&self, path: &str, ttl_secs: u64) -> StorageResult<String> {
        check_object_path(path)?;
        if !fs::try_exists(self.object_path(path)).await.map_err(unavailable)? {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(self.signer.sign(path, ttl_secs))
    }
}
