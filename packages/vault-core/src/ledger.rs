//! Refcounted blob ledger plus the per-hash lock registry that serializes
//! every mutation touching a given content hash.

use std::sync::Arc;

use common::ContentHash;
use dashmap::DashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct BlobEntry {
    size: u64,
    ref_count: u32,
}

/// Tracks which blobs are live and how many catalog records point at each.
/// Entries are created on first attach and destroyed when the count reaches
/// zero, so a zero-refcount blob is never observable.
#[derive(Default)]
pub struct BlobLedger {
    blobs: DashMap<ContentHash, BlobEntry>,
    locks: DashMap<ContentHash, Arc<Mutex<()>>>,
}

impl BlobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex serializing operations on `hash`. Lock entries are kept for
    /// the process lifetime; evicting one while another caller still holds
    /// its `Arc` would hand out two locks for the same hash.
    pub fn lock_for(&self, hash: &ContentHash) -> Arc<Mutex<()>> {
        self.locks.entry(*hash).or_default().clone()
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.blobs.contains_key(hash)
    }

    /// Record one more reference to `hash`, creating the entry on first use.
    /// Returns the new count. Caller must hold the hash lock.
    pub fn attach(&self, hash: ContentHash, size: u64) -> u32 {
        let mut entry = self.blobs.entry(hash).or_insert(BlobEntry {
            size,
            ref_count: 0,
        });
        entry.ref_count += 1;
        entry.ref_count
    }

    /// Drop one reference to `hash`, destroying the entry at zero. Returns
    /// the remaining count. Caller must hold the hash lock.
    pub fn detach(&self, hash: &ContentHash) -> u32 {
        let remaining = match self.blobs.get_mut(hash) {
            Some(mut entry) => {
                entry.ref_count = entry.ref_count.saturating_sub(1);
                entry.ref_count
            }
            None => {
                tracing::warn!(%hash, "detach for unknown blob");
                return 0;
            }
        };
        if remaining == 0 {
            self.blobs.remove(hash);
        }
        remaining
    }

    /// Current reference count; 0 for an unknown hash.
    pub fn ref_count(&self, hash: &ContentHash) -> u32 {
        self.blobs.get(hash).map(|e| e.ref_count).unwrap_or(0)
    }

    pub fn size(&self, hash: &ContentHash) -> Option<u64> {
        self.blobs.get(hash).map(|e| e.size)
    }

    /// Number of live blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}
