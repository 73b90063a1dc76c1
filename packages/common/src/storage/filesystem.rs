use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{BoxReader, PhysicalStore, StagedBlob};

/// Filesystem-backed physical store.
///
/// Published payloads live in a Git-style sharded layout:
/// `{base_path}/{first 2 hex chars}/{remaining 62 hex chars}`.
/// Staged payloads live under `{base_path}/.staging/` with UUID names and
/// are moved into place with a rename, so readers never see partial writes.
pub struct FilesystemStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemStore {
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".staging")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.base_path
            .join(hash.shard_prefix())
            .join(hash.shard_suffix())
    }

    fn staging_path(&self) -> PathBuf {
        self.base_path
            .join(".staging")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl PhysicalStore for FilesystemStore {
    async fn stage(&self, mut reader: BoxReader) -> Result<StagedBlob, StorageError> {
        let staging_path = self.staging_path();
        let mut file = fs::File::create(&staging_path).await?;
        let mut hasher = Sha256::new();
        let mut size: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(&staging_path).await;
                    return Err(e.into());
                }
            };

            size += n as u64;
            if size > self.max_size {
                drop(file);
                let _ = fs::remove_file(&staging_path).await;
                return Err(StorageError::SizeLimitExceeded {
                    actual: size,
                    limit: self.max_size,
                });
            }

            hasher.update(&buf[..n]);
            if let Err(e) = file.write_all(&buf[..n]).await {
                drop(file);
                let _ = fs::remove_file(&staging_path).await;
                return Err(e.into());
            }
        }

        if let Err(e) = file.flush().await {
            drop(file);
            let _ = fs::remove_file(&staging_path).await;
            return Err(e.into());
        }

        Ok(StagedBlob {
            hash: ContentHash::from_bytes(hasher.finalize().into()),
            size,
            staging_path,
        })
    }

    async fn commit(&self, staged: StagedBlob) -> Result<(), StorageError> {
        let blob_path = self.blob_path(&staged.hash);

        if fs::try_exists(&blob_path).await? {
            let _ = fs::remove_file(&staged.staging_path).await;
            return Ok(());
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&staged.staging_path, &blob_path).await {
            let _ = fs::remove_file(&staged.staging_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn discard(&self, staged: StagedBlob) {
        if let Err(e) = fs::remove_file(&staged.staging_path).await {
            tracing::warn!(path = %staged.staging_path.display(), "failed to remove staged blob: {e}");
        }
    }

    async fn open(&self, hash: &ContentHash) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.blob_path(hash)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(hash)).await?)
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(hash)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, hash: &ContentHash) -> Result<u64, StorageError> {
        match fs::metadata(self.blob_path(hash)).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
