use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use vault_core::VaultError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `USER_ID_MISSING`, `NOT_FOUND`, `FORBIDDEN`, `QUOTA_EXCEEDED`,
    /// `RATE_LIMITED`, `STORAGE_UNAVAILABLE`, `INTERNAL_ERROR`.
    #[schema(example = "QUOTA_EXCEEDED")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Storage quota exceeded")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    MissingUserId,
    NotFound(String),
    Forbidden,
    QuotaExceeded { requested: u64, limit: u64 },
    /// Rate limit exceeded. Contains seconds until retry is allowed.
    RateLimited { retry_after: u64 },
    StorageUnavailable(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::MissingUserId => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "USER_ID_MISSING",
                    message: "Missing required UserId header".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "FORBIDDEN",
                    message: "File belongs to a different owner".into(),
                },
            ),
            AppError::QuotaExceeded { requested, limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody {
                    code: "QUOTA_EXCEEDED",
                    message: format!(
                        "Storage quota exceeded: {requested} bytes do not fit in a {limit} byte quota"
                    ),
                },
            ),
            AppError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody {
                    code: "RATE_LIMITED",
                    message: format!("Rate limit exceeded. Try again in {} seconds", retry_after),
                },
            ),
            AppError::StorageUnavailable(detail) => {
                tracing::error!("Storage unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        code: "STORAGE_UNAVAILABLE",
                        message: "Physical storage is unavailable, retry later".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = if let AppError::RateLimited { retry_after } = &self {
            Some(*retry_after)
        } else {
            None
        };

        let (status, body) = self.status_and_body();

        if let Some(seconds) = retry_after {
            (status, [("Retry-After", seconds.to_string())], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::NotFound => AppError::NotFound("File not found".into()),
            VaultError::Forbidden => AppError::Forbidden,
            VaultError::QuotaExceeded {
                requested, limit, ..
            } => AppError::QuotaExceeded { requested, limit },
            VaultError::Storage(e) => AppError::StorageUnavailable(e.to_string()),
        }
    }
}
