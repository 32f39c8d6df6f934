//! File handlers.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::policy::UploadCandidate;
use crate::service::{FileContent, FileListing};
use crate::web::dto::{
    ApiResponse, DeleteFileRequest, DeleteResponse, RenameFileRequest, RenameResponse,
    SignedQuery, UploadResponse, ValidatedJson,
};
use crate::web::error::{ApiError, ErrorCode};
use crate::web::middleware::AuthUser;
use crate::ShelfError;

use super::AppState;

/// Build a `Content-Disposition: inline` header value.
///
/// Control characters, quotes and backslashes are replaced in the plain
/// `filename` parameter; non-ASCII names also get an RFC 5987 `filename*`.
fn content_disposition_header(filename: &str) -> String {
    let needs_escape = |c: char| c.is_control() || c == '"' || c == '\\';

    if filename.is_ascii() && !filename.chars().any(needs_escape) {
        return format!("inline; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if needs_escape(c) { '_' } else { c })
        .collect();

    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

fn file_response(content: FileContent) -> Result<Response, ApiError> {
    let disposition = content_disposition_header(crate::policy::display_name(&content.name));
    let length = content.data.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content.content_type)
        .header(CONTENT_DISPOSITION, disposition)
        .header(CONTENT_LENGTH, length)
        .header(CACHE_CONTROL, "private, no-store")
        .body(Body::from(content.data))
        .map_err(|e| {
            tracing::error!("Failed to build file response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(ErrorCode::FileTooLarge, "File exceeds the maximum upload size");
    }
    tracing::warn!("Failed to read multipart data: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

/// GET /api/files - List the caller's files with quota information.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<FileListing>>, ApiError> {
    let listing = state.files.list_files(auth_user.user_id()).await?;
    Ok(Json(ApiResponse::new(listing)))
}

/// POST /api/files - Upload a file (multipart field `file`).
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponse>>), ApiError> {
    let mut candidate: Option<UploadCandidate> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::bad_request("No file provided"))?;
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await.map_err(multipart_error)?.to_vec();

        candidate = Some(UploadCandidate {
            name,
            content_type,
            data,
        });
    }

    let candidate = candidate.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let file = state.files.upload(auth_user.user_id(), candidate).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UploadResponse { file })),
    ))
}

/// POST /api/files/delete - Delete one of the caller's files.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(req): ValidatedJson<DeleteFileRequest>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    let deleted = state
        .files
        .delete(auth_user.user_id(), &req.file_name)
        .await?;
    Ok(Json(ApiResponse::new(DeleteResponse { deleted })))
}

/// POST /api/files/rename - Rename one of the caller's files.
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(req): ValidatedJson<RenameFileRequest>,
) -> Result<Json<ApiResponse<RenameResponse>>, ApiError> {
    let new_file_name = state
        .files
        .rename(auth_user.user_id(), &req.old_file_name, &req.new_file_name)
        .await?;
    Ok(Json(ApiResponse::new(RenameResponse { new_file_name })))
}

/// GET /api/files/:file_name - Download one of the caller's files.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    let content = state.files.read(auth_user.user_id(), &file_name).await?;
    file_response(content)
}

/// GET /api/files/:file_name/view - Redirect to a short-lived signed URL.
pub async fn view_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    let url = state
        .files
        .signed_view(auth_user.user_id(), &file_name)
        .await?;
    Ok((StatusCode::FOUND, [(LOCATION, url)]).into_response())
}

/// GET /signed/*path - Serve an object through a signed URL.
///
/// No session is required; the signature and expiry are the credential.
pub async fn serve_signed(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Result<Response, ApiError> {
    let path = path.trim_start_matches('/');

    if !state.signer.verify(path, query.expires, &query.signature) {
        tracing::debug!(path = %path, "Rejected signed URL");
        return Err(ApiError::forbidden("Invalid or expired signature"));
    }

    let (user_id, file_name) = path
        .split_once('/')
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let content = state
        .files
        .read(user_id, file_name)
        .await
        .map_err(|e| match e {
            ShelfError::Validation(_) => ApiError::not_found("File not found"),
            other => other.into(),
        })?;
    file_response(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("report.pdf"),
            "inline; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_escapes_quotes() {
        assert_eq!(
            content_disposition_header("a\"b\\c.txt"),
            "inline; filename=\"a_b_c.txt\"; filename*=UTF-8''a%22b%5Cc.txt"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let header = content_disposition_header("résumé.txt");
        assert!(header.starts_with("inline; filename=\"résumé.txt\"; filename*=UTF-8''"));
        assert!(header.ends_with("r%C3%A9sum%C3%A9.txt"));
    }

    #[test]
    fn test_file_response_headers() {
        let response = file_response(FileContent {
            name: "1700000000000-notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            data: b"hello".to_vec(),
        })
        .unwrap();

        let headers = response.headers();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get(CONTENT_LENGTH).unwrap(), "5");
        assert_eq!(
            headers.get(CONTENT_DISPOSITION).unwrap(),
            "inline; filename=\"notes.txt\""
        );
    }
}
