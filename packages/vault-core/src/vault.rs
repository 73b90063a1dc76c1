//! The vault facade: composes the blob ledger, catalog and quota ledger
//! behind a small API the HTTP layer calls.
//!
//! Locking model: every mutation takes the per-hash mutex first and the
//! per-owner mutex second, so two uploads of identical bytes serialize on
//! the hash, two operations by one user serialize on the owner, and nothing
//! else blocks. Catalog reads are consistent snapshots (see
//! [`crate::catalog::Catalog`]), so list/stats never observe a half-applied
//! remove-plus-promote.

use std::sync::Arc;

use common::{BoxReader, ContentHash, PhysicalStore};
use uuid::Uuid;

use crate::catalog::{Catalog, FileRecord, ListFilter, RecordRole};
use crate::clock::{Clock, SystemClock};
use crate::error::VaultError;
use crate::ledger::BlobLedger;
use crate::quota::QuotaLedger;
use crate::stats::StorageStats;

pub struct Vault {
    store: Arc<dyn PhysicalStore>,
    clock: Arc<dyn Clock>,
    catalog: Catalog,
    blobs: BlobLedger,
    quota: QuotaLedger,
}

impl Vault {
    pub fn new(store: Arc<dyn PhysicalStore>, quota_limit: u64) -> Self {
        Self::with_clock(store, quota_limit, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn PhysicalStore>,
        quota_limit: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            catalog: Catalog::new(),
            blobs: BlobLedger::new(),
            quota: QuotaLedger::new(quota_limit),
        }
    }

    /// Store an upload, deduplicating by content hash.
    ///
    /// The stream is staged and hashed first; under the hash and owner
    /// locks the upload is classified (new blob → `Original`, known blob →
    /// `Reference`), the quota charge is authorized (zero for content the
    /// owner already holds), and only then is a brand-new payload committed
    /// into place. A rejected or failed ingest leaves no trace: the staged
    /// bytes are discarded and neither catalog nor quota is touched.
    pub async fn ingest(
        &self,
        owner: &str,
        filename: &str,
        content_type: Option<String>,
        reader: BoxReader,
    ) -> Result<FileRecord, VaultError> {
        let staged = self.store.stage(reader).await?;
        let hash = staged.hash;
        let size = staged.size;

        let hash_lock = self.blobs.lock_for(&hash);
        let _hash_guard = hash_lock.lock().await;
        let owner_lock = self.quota.lock_for(owner);
        let _owner_guard = owner_lock.lock().await;

        let blob_exists = self.blobs.contains(&hash);
        let already_owned = self.catalog.owner_holds(owner, &hash);
        let charge = if already_owned { 0 } else { size };

        if !self.quota.fits(owner, charge) {
            self.store.discard(staged).await;
            tracing::info!(owner, %hash, size, "upload rejected: quota exceeded");
            return Err(VaultError::QuotaExceeded {
                requested: size,
                consumed: self.quota.consumed(owner),
                limit: self.quota.limit(),
            });
        }

        if blob_exists {
            // Payload already on disk; the staged copy is redundant.
            self.store.discard(staged).await;
        } else {
            self.store.commit(staged).await?;
        }

        let record = FileRecord {
            id: Uuid::now_v7(),
            owner_id: owner.to_string(),
            content_hash: hash,
            filename: filename.to_string(),
            content_type,
            size,
            uploaded_at: self.clock.now(),
            role: if blob_exists {
                RecordRole::Reference
            } else {
                RecordRole::Original
            },
        };

        self.catalog.insert(record.clone());
        let ref_count = self.blobs.attach(hash, size);
        self.quota.charge(owner, charge);

        tracing::debug!(
            owner,
            %hash,
            size,
            ref_count,
            deduplicated = blob_exists,
            "ingested {filename}"
        );
        Ok(record)
    }

    /// Delete one of the owner's records.
    ///
    /// Removing the last record for a blob deletes the physical payload;
    /// removing the canonical record of shared content promotes the
    /// earliest-uploaded survivor. The owner's quota is refunded only when
    /// their last record for that content disappears.
    pub async fn remove(&self, owner: &str, record_id: Uuid) -> Result<(), VaultError> {
        // Resolve the hash so we know which lock to take; everything is
        // re-checked once the lock is held.
        let hash = {
            let record = self.catalog.get(&record_id).ok_or(VaultError::NotFound)?;
            if record.owner_id != owner {
                return Err(VaultError::Forbidden);
            }
            record.content_hash
        };

        let hash_lock = self.blobs.lock_for(&hash);
        let _hash_guard = hash_lock.lock().await;
        let owner_lock = self.quota.lock_for(owner);
        let _owner_guard = owner_lock.lock().await;

        match self.catalog.get(&record_id) {
            Some(record) if record.owner_id == owner => {}
            Some(_) => return Err(VaultError::Forbidden),
            None => return Err(VaultError::NotFound),
        }

        let removal = self
            .catalog
            .remove_and_promote(&record_id)
            .ok_or(VaultError::NotFound)?;
        let removed = removal.record;

        let remaining = self.blobs.detach(&hash);
        debug_assert_eq!(remaining as usize, removal.survivors);

        if remaining == 0 {
            // The logical deletion is authoritative; a failed physical
            // delete is left for storage-layer reconciliation.
            match self.store.delete(&hash).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!(%hash, "blob payload was already gone"),
                Err(e) => tracing::error!(%hash, "failed to delete blob payload: {e}"),
            }
        } else if let Some(promoted) = removal.promoted {
            tracing::debug!(%hash, %promoted, "promoted reference to original");
        }

        if !self.catalog.owner_holds(owner, &hash) {
            self.quota.refund(owner, removed.size);
        }

        tracing::debug!(owner, %hash, remaining, "removed {}", removed.filename);
        Ok(())
    }

    /// Fetch one of the owner's records. Records of other owners are
    /// invisible and report `NotFound`.
    pub fn get(&self, owner: &str, record_id: Uuid) -> Result<FileRecord, VaultError> {
        match self.catalog.get(&record_id) {
            Some(record) if record.owner_id == owner => Ok(record),
            _ => Err(VaultError::NotFound),
        }
    }

    /// The owner's records matching `filter`, newest first.
    pub fn list(&self, owner: &str, filter: &ListFilter) -> Vec<FileRecord> {
        self.catalog.list(owner, filter)
    }

    /// Open one of the owner's records for streaming its payload.
    pub async fn open(
        &self,
        owner: &str,
        record_id: Uuid,
    ) -> Result<(FileRecord, BoxReader), VaultError> {
        let record = self.get(owner, record_id)?;
        let reader = self.store.open(&record.content_hash).await?;
        Ok((record, reader))
    }

    /// Per-owner usage figures. `total_storage_used` always equals the
    /// quota ledger's consumed bytes for the owner.
    pub fn stats(&self, owner: &str) -> StorageStats {
        let (original, total) = self.catalog.usage(owner);
        StorageStats::from_usage(original, total)
    }

    /// Distinct content types across the owner's records.
    pub fn file_types(&self, owner: &str) -> Vec<String> {
        self.catalog.content_types(owner)
    }

    /// Live reference count of the record's blob. A property of the
    /// canonical copy; references report zero.
    pub fn reference_count(&self, record: &FileRecord) -> u32 {
        match record.role {
            RecordRole::Original => self.blobs.ref_count(&record.content_hash),
            RecordRole::Reference => 0,
        }
    }

    /// Current reference count for a content hash; test and admin surface.
    pub fn count_references(&self, hash: &ContentHash) -> u32 {
        self.blobs.ref_count(hash)
    }

    pub fn quota_consumed(&self, owner: &str) -> u64 {
        self.quota.consumed(owner)
    }

    pub fn quota_limit(&self) -> u64 {
        self.quota.limit()
    }
}
