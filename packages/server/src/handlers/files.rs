use std::path::PathBuf;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use common::BoxReader;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;
use vault_core::FileRecord;

use crate::error::{AppError, ErrorBody};
use crate::extractors::user::UserId;
use crate::models::file::{FileListResponse, FileResponse, ListQuery, StatsResponse};
use crate::state::AppState;

pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(128 * 1024 * 1024) // 128 MB
}

#[utoipa::path(
    post,
    path = "/api/files",
    tag = "Files",
    operation_id = "uploadFile",
    summary = "Upload a file",
    description = "Uploads a file for the calling user. The `file` multipart field is required. \
        Content is deduplicated by SHA-256 hash: re-uploading known bytes creates a reference \
        record without storing a second physical copy, and a user re-uploading their own content \
        is not charged additional quota.",
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 201, description = "File stored", body = FileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Missing UserId header (USER_ID_MISSING)", body = ErrorBody),
        (status = 429, description = "Quota or rate limit exceeded (QUOTA_EXCEEDED, RATE_LIMITED)", body = ErrorBody),
        (status = 503, description = "Physical storage failure (STORAGE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, user, multipart))]
pub async fn upload_file(
    user: UserId,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    state.throttle.check(user.as_str())?;

    let mut staged: Option<(PathBuf, String, Option<String>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue; // Ignore unknown fields.
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
        let declared_type = field.content_type().map(|s| s.to_string());
        let temp_path = stream_field_to_temp(field, state.config.storage.max_blob_size).await?;
        staged = Some((temp_path, file_name, declared_type));
        // First file field wins; later fields are never read, so exactly
        // one temp file exists at a time.
        break;
    }

    let (temp_path, filename, declared_type) =
        staged.ok_or_else(|| AppError::Validation("No file provided".into()))?;

    let content_type = declared_type
        .filter(|t| !t.is_empty() && t != "application/octet-stream")
        .or_else(|| {
            mime_guess::from_path(&filename)
                .first()
                .map(|m| m.to_string())
        });

    let result = async {
        let file = tokio::fs::File::open(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(file);

        let record = state
            .vault
            .ingest(user.as_str(), &filename, content_type, reader)
            .await?;
        Ok::<FileRecord, AppError>(record)
    }
    .await;

    // Best effort.
    let _ = tokio::fs::remove_file(&temp_path).await;

    let record = result?;
    let reference_count = state.vault.reference_count(&record);
    Ok((
        StatusCode::CREATED,
        Json(FileResponse::new(record, reference_count)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/files",
    tag = "Files",
    operation_id = "listFiles",
    summary = "List the caller's files",
    description = "Returns the calling user's file records, newest first. Supports filtering by \
        filename substring, MIME type, size range and upload date range.",
    params(ListQuery),
    responses(
        (status = 200, description = "File list", body = FileListResponse),
        (status = 403, description = "Missing UserId header (USER_ID_MISSING)", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, user))]
pub async fn list_files(
    user: UserId,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FileListResponse>, AppError> {
    state.throttle.check(user.as_str())?;

    let records = state.vault.list(user.as_str(), &query.into());
    let total = records.len() as u64;
    let files = records
        .into_iter()
        .map(|record| {
            let reference_count = state.vault.reference_count(&record);
            FileResponse::new(record, reference_count)
        })
        .collect();

    Ok(Json(FileListResponse { files, total }))
}

#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "Files",
    operation_id = "getFile",
    summary = "Get file metadata",
    description = "Returns metadata for one of the caller's files. Files of other users are \
        invisible and report 404.",
    params(("id" = String, Path, description = "File record ID (UUID)")),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 403, description = "Missing UserId header (USER_ID_MISSING)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, user))]
pub async fn get_file(
    user: UserId,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, AppError> {
    state.throttle.check(user.as_str())?;

    let record_id = parse_record_id(&id)?;
    let record = state.vault.get(user.as_str(), record_id)?;
    let reference_count = state.vault.reference_count(&record);
    Ok(Json(FileResponse::new(record, reference_count)))
}

#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download file content",
    description = "Streams the file's bytes. Supports ETag-based caching via If-None-Match; the \
        ETag is the content hash, so references and originals of the same bytes share it.",
    params(("id" = String, Path, description = "File record ID (UUID)")),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 403, description = "Missing UserId header (USER_ID_MISSING)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, user, headers))]
pub async fn download_file(
    user: UserId,
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    state.throttle.check(user.as_str())?;

    let record_id = parse_record_id(&id)?;
    let etag_probe = state.vault.get(user.as_str(), record_id)?;
    let etag_value = format!("\"{}\"", etag_probe.content_hash.to_hex());
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let (record, reader) = state.vault.open(user.as_str(), record_id).await?;
    let stream = ReaderStream::new(reader);
    let body = Body::from_stream(stream);

    let content_type = record
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, record.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&record.filename),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "Files",
    operation_id = "deleteFile",
    summary = "Delete a file record",
    description = "Removes one of the caller's records. Deleting the canonical copy of shared \
        content promotes the earliest surviving reference; deleting the last record for some \
        content removes the physical payload.",
    params(("id" = String, Path, description = "File record ID (UUID)")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 403, description = "Missing UserId header or foreign record (USER_ID_MISSING, FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, user))]
pub async fn delete_file(
    user: UserId,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.throttle.check(user.as_str())?;

    let record_id = parse_record_id(&id)?;
    state.vault.remove(user.as_str(), record_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/files/storage_stats",
    tag = "Files",
    operation_id = "storageStats",
    summary = "Per-user storage statistics",
    description = "Reports logical vs deduplicated usage and the savings between them.",
    responses(
        (status = 200, description = "Storage statistics", body = StatsResponse),
        (status = 403, description = "Missing UserId header (USER_ID_MISSING)", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, user))]
pub async fn storage_stats(
    user: UserId,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    state.throttle.check(user.as_str())?;

    let stats = state.vault.stats(user.as_str());
    Ok(Json(StatsResponse::new(user.0, stats)))
}

#[utoipa::path(
    get,
    path = "/api/files/file_types",
    tag = "Files",
    operation_id = "fileTypes",
    summary = "Distinct content types",
    description = "Returns the distinct MIME types across the caller's files.",
    responses(
        (status = 200, description = "Distinct MIME types", body = Vec<String>),
        (status = 403, description = "Missing UserId header (USER_ID_MISSING)", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("user_id" = [])),
)]
#[instrument(skip(state, user))]
pub async fn file_types(
    user: UserId,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    state.throttle.check(user.as_str())?;

    Ok(Json(state.vault.file_types(user.as_str())))
}

// A malformed id can't name any record, so it is indistinguishable from an
// unknown one.
fn parse_record_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::NotFound("File not found".into()))
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("inline; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}

/// Stream a multipart field to a temp file so the vault can re-read it as an
/// async reader. The vault's own staging re-hashes; this copy only decouples
/// the multipart body from storage.
async fn stream_field_to_temp(
    mut field: axum::extract::multipart::Field<'_>,
    max_size: u64,
) -> Result<PathBuf, AppError> {
    let temp_path = std::env::temp_dir().join(format!("vault-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;

        Ok(())
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    Ok(temp_path)
}
