//! In-memory storage backend.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{check_object_path, ObjectInfo, ObjectStore, StorageError, StorageResult, UrlSigner};

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Vec<u8>,
    content_type: String,
    created_at: String,
}

/// Object store held entirely in process memory.
///
/// Contents are lost when the process exits.
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, MemoryObject>>,
    signer: UrlSigner,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            signer,
        }
    }

    /// Whether an object exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .read()
            .map(|objects| objects.contains_key(path))
            .unwrap_or(false)
    }

    /// Total number of stored objects across all namespaces.
    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::Unavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        check_object_path(prefix)?;
        let folder = format!("{prefix}/");
        let objects = self.objects.read().map_err(|_| poisoned())?;

        // BTreeMap iteration keeps the listing sorted by name.
        Ok(objects
            .range(folder.clone()..)
            .take_while(|(key, _)| key.starts_with(&folder))
            .filter_map(|(key, object)| {
                let name = &key[folder.len()..];
                (!name.contains('/')).then(|| ObjectInfo {
                    name: name.to_string(),
                    size: object.data.len() as u64,
                    mimetype: Some(object.content_type.clone()),
                    created_at: Some(object.created_at.clone()),
                })
            })
            .collect())
    }

    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        check_object_path(path)?;
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        if objects.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        objects.insert(
            path.to_string(),
            MemoryObject {
                data,
                content_type: content_type.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        Ok(())
    }

    async fn download(&self, path: &str) -> StorageResult<Vec<u8>> {
        check_object_path(path)?;
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(path)
            .map(|object| object.data.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<Vec<String>> {
        for path in paths {
            check_object_path(path)?;
        }
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        Ok(paths
            .iter()
            .filter(|path| objects.remove(path.as_str()).is_some())
            .cloned()
            .collect())
    }

    async fn signed_url(&self, path: &str, ttl_secs: u64) -> StorageResult<String> {
        check_object_path(path)?;
        if !self.contains(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(self.signer.sign(path, ttl_secs))
    }
}
