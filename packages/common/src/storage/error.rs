use thiserror::Error;

/// Errors surfaced by physical blob storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No payload is stored under the given hash.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The underlying read or write failed (disk full, permissions, ...).
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A hex string could not be parsed as a content hash.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// The payload is larger than the store is configured to accept.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}
