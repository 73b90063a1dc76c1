use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use vault_core::{FileRecord, ListFilter, StorageStats};

/// Response DTO for a single file record.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileResponse {
    /// Record ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    /// Original upload filename.
    #[schema(example = "report.pdf")]
    pub filename: String,
    /// MIME content type.
    #[schema(example = "application/pdf")]
    pub content_type: Option<String>,
    /// Payload size in bytes.
    #[schema(example = 142857)]
    pub size: u64,
    /// SHA-256 content hash shared by all records with identical bytes.
    #[schema(example = "a1b2c3d4e5f6...")]
    pub content_hash: String,
    pub uploaded_at: DateTime<Utc>,
    /// Whether this record is a dedup reference to an existing blob.
    pub is_reference: bool,
    /// Live number of records sharing the blob. A property of the canonical
    /// copy; always 0 on references.
    #[schema(example = 2)]
    pub reference_count: u32,
}

impl FileResponse {
    pub fn new(record: FileRecord, reference_count: u32) -> Self {
        Self {
            id: record.id.to_string(),
            filename: record.filename,
            content_type: record.content_type,
            size: record.size,
            content_hash: record.content_hash.to_hex(),
            uploaded_at: record.uploaded_at,
            is_reference: record.role == vault_core::RecordRole::Reference,
            reference_count,
        }
    }
}

/// Response DTO for listing files.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
    pub total: u64,
}

/// Query parameters for listing files. Every present filter must match.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Case-insensitive filename substring.
    pub search: Option<String>,
    /// Exact MIME type.
    pub file_type: Option<String>,
    /// Minimum payload size in bytes.
    pub min_size: Option<u64>,
    /// Maximum payload size in bytes.
    pub max_size: Option<u64>,
    /// Uploaded at or after this RFC 3339 timestamp.
    pub start_date: Option<DateTime<Utc>>,
    /// Uploaded at or before this RFC 3339 timestamp.
    pub end_date: Option<DateTime<Utc>>,
}

impl From<ListQuery> for ListFilter {
    fn from(query: ListQuery) -> Self {
        ListFilter {
            search: query.search,
            content_type: query.file_type,
            min_size: query.min_size,
            max_size: query.max_size,
            uploaded_after: query.start_date,
            uploaded_before: query.end_date,
        }
    }
}

/// Response DTO for per-user storage statistics.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    #[schema(example = "u1")]
    pub user_id: String,
    /// Bytes of distinct content the user holds (what quota charges).
    pub total_storage_used: u64,
    /// Bytes as if nothing were deduplicated.
    pub original_storage_used: u64,
    /// `original_storage_used - total_storage_used`.
    pub storage_savings: u64,
    /// Savings as a percentage, rounded to two decimals.
    #[schema(example = 33.33)]
    pub savings_percentage: f64,
}

impl StatsResponse {
    pub fn new(user_id: String, stats: StorageStats) -> Self {
        Self {
            user_id,
            total_storage_used: stats.total_storage_used,
            original_storage_used: stats.original_storage_used,
            storage_savings: stats.storage_savings,
            savings_percentage: stats.savings_percentage,
        }
    }
}
