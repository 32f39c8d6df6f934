//! Supabase Storage backend.
//!
//! Talks to the Storage REST API under `{project}/storage/v1` with the
//! service key sent both as bearer token and `apikey` header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{check_object_path, encode_object_path, ObjectInfo, ObjectStore, StorageError, StorageResult};

/// Page size used when listing a namespace.
const LIST_LIMIT: u32 = 100;

/// Supabase Storage client bound to one bucket.
#[derive(Clone)]
pub struct SupabaseObjectStore {
    client: Client,
    base_url: String,
    key: String,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    metadata: Option<ListMetadata>,
}

#[derive(Debug, Deserialize)]
struct ListMetadata {
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    mimetype: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
    sort_by: SortBy,
}

#[derive(Debug, Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct RemovedEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

/// Error body returned by the Storage API.
///
/// Some failures arrive as HTTP 400 with the real status in `statusCode`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    status_code: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorBody {
    fn embedded_status(&self) -> Option<u16> {
        match self.status_code.as_ref()? {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            _ => None,
        }
    }

    fn describe(&self, status: StatusCode) -> String {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => format!("{status}: {error}: {message}"),
            (Some(text), None) | (None, Some(text)) => format!("{status}: {text}"),
            (None, None) => status.to_string(),
        }
    }
}

impl SupabaseObjectStore {
    /// Create a client for `bucket` in the project at `project_url`.
    pub fn new(project_url: &str, key: &str, bucket: &str, timeout_secs: u64) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("fileshelf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("{}/storage/v1", project_url.trim_end_matches('/')),
            key: key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_object_path(path)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.key).header("apikey", &self.key)
    }

    async fn send(&self, request: RequestBuilder) -> StorageResult<Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    /// Turn a non-success response into a storage error.
    async fn failure(response: Response, path: &str) -> StorageError {
        let status = response.status();
        let body: ApiErrorBody = response.json().await.unwrap_or_default();
        let effective = body.embedded_status().unwrap_or(status.as_u16());
        let error = body.error.as_deref().unwrap_or_default();

        if effective == 404 || error.eq_ignore_ascii_case("not_found") {
            StorageError::NotFound(path.to_string())
        } else if effective == 409 || error.eq_ignore_ascii_case("duplicate") {
            StorageError::AlreadyExists(path.to_string())
        } else {
            StorageError::Unavailable(body.describe(status))
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    fn backend_name(&self) -> &'static str {
        "supabase"
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        check_object_path(prefix)?;
        let url = format!(
            "{}/object/list/{}",
            self.base_url,
            urlencoding::encode(&self.bucket)
        );
        let body = ListRequest {
            prefix,
            limit: LIST_LIMIT,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };

        let response = self.send(self.client.post(url).json(&body)).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response, prefix).await);
        }

        let entries: Vec<ListEntry> = response
            .json()
            .await
            .map_err(|e| StorageError::Unavailable(format!("invalid list response: {e}")))?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let (size, mimetype) = match entry.metadata {
                    Some(meta) => (meta.size.unwrap_or(0), meta.mimetype),
                    None => (0, None),
                };
                ObjectInfo {
                    name: entry.name,
                    size,
                    mimetype,
                    created_at: entry.created_at,
                }
            })
            .collect())
    }

    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        check_object_path(path)?;
        let request = self
            .client
            .post(self.object_url(path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data);

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response, path).await);
        }
        tracing::debug!(path, "Uploaded object to Supabase");
        Ok(())
    }

    async fn download(&self, path: &str) -> StorageResult<Vec<u8>> {
        check_object_path(path)?;
        let response = self.send(self.client.get(self.object_url(path))).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response, path).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<Vec<String>> {
        for path in paths {
            check_object_path(path)?;
        }
        let url = format!("{}/object/{}", self.base_url, urlencoding::encode(&self.bucket));
        let response = self
            .send(self.client.delete(url).json(&json!({ "prefixes": paths })))
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure(response, &paths.join(",")).await);
        }

        let removed: Vec<RemovedEntry> = response
            .json()
            .await
            .map_err(|e| StorageError::Unavailable(format!("invalid remove response: {e}")))?;
        Ok(removed.into_iter().map(|entry| entry.name).collect())
    }

    async fn signed_url(&self, path: &str, ttl_secs: u64) -> StorageResult<String> {
        check_object_path(path)?;
        let url = format!(
            "{}/object/sign/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_object_path(path)
        );
        let response = self
            .send(self.client.post(url).json(&json!({ "expiresIn": ttl_secs })))
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure(response, path).await);
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Unavailable(format!("invalid sign response: {e}")))?;
        Ok(format!("{}{}", self.base_url, signed.signed_url))
    }
}

impl std::fmt::Debug for SupabaseObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseObjectStore")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}
