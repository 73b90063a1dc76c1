use common::StorageError;
use thiserror::Error;

/// Typed results surfaced by vault operations. These are the only error
/// kinds the HTTP layer has to translate.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No record with the given id is visible to the caller.
    #[error("file not found")]
    NotFound,

    /// The record exists but belongs to a different owner.
    #[error("file belongs to a different owner")]
    Forbidden,

    /// Charging the upload would push the owner past their storage limit.
    #[error("storage quota exceeded ({consumed} + {requested} > {limit} bytes)")]
    QuotaExceeded {
        requested: u64,
        consumed: u64,
        limit: u64,
    },

    /// The physical store failed; transient and safe to retry.
    #[error("physical storage unavailable: {0}")]
    Storage(#[from] StorageError),
}
