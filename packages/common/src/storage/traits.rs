use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// A payload that has been written to a staging area but not yet published
/// under its content hash. Callers decide between [`PhysicalStore::commit`]
/// and [`PhysicalStore::discard`] once they know whether the bytes are new
/// and whether the upload is authorized.
#[derive(Debug)]
pub struct StagedBlob {
    pub hash: ContentHash,
    pub size: u64,
    /// Store-specific location of the staged bytes.
    pub staging_path: PathBuf,
}

/// Physical byte storage, addressed by content hash.
///
/// The vault core owns all bookkeeping (refcounts, ownership, quotas); a
/// `PhysicalStore` only moves bytes. Staging is a two-phase write: `stage`
/// hashes the stream into a scratch location, `commit` publishes it
/// atomically, `discard` throws it away. An aborted ingest therefore never
/// leaves a partially written payload at a published path.
#[async_trait]
pub trait PhysicalStore: Send + Sync {
    /// Stream bytes into the staging area, hashing them on the way.
    async fn stage(&self, reader: BoxReader) -> Result<StagedBlob, StorageError>;

    /// Publish a staged payload under its content hash. Idempotent when the
    /// payload already exists; the staged copy is consumed either way.
    async fn commit(&self, staged: StagedBlob) -> Result<(), StorageError>;

    /// Drop a staged payload without publishing it.
    async fn discard(&self, staged: StagedBlob);

    /// Open a published payload for streaming reads.
    async fn open(&self, hash: &ContentHash) -> Result<BoxReader, StorageError>;

    /// Whether a payload is published under this hash.
    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Delete a published payload. Returns `false` if nothing was stored
    /// under the hash; deleting an absent payload is not an error.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Size in bytes of a published payload.
    async fn size(&self, hash: &ContentHash) -> Result<u64, StorageError>;

    /// Convenience: stage and immediately commit an in-memory payload.
    async fn write(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        let staged = self.stage(reader).await?;
        let hash = staged.hash;
        self.commit(staged).await?;
        Ok(hash)
    }

    /// Convenience: read a full payload into memory.
    async fn read(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.open(hash).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}
