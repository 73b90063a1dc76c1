//! Dedup-aware per-owner storage accounting. The ledger only tracks
//! consumed bytes; the decision of whether an upload is a free duplicate
//! belongs to the vault, which consults the catalog under the owner's lock.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Per-owner consumed bytes against a fixed limit shared by all owners.
pub struct QuotaLedger {
    consumed: DashMap<String, u64>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    limit: u64,
}

impl QuotaLedger {
    pub fn new(limit: u64) -> Self {
        Self {
            consumed: DashMap::new(),
            locks: DashMap::new(),
            limit,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// The mutex serializing authorize-then-charge for one owner.
    pub fn lock_for(&self, owner: &str) -> Arc<Mutex<()>> {
        self.locks.entry(owner.to_string()).or_default().clone()
    }

    pub fn consumed(&self, owner: &str) -> u64 {
        self.consumed.get(owner).map(|v| *v).unwrap_or(0)
    }

    /// Whether charging `bytes` stays within the limit. Caller must hold the
    /// owner's lock for the answer to remain true through the charge.
    pub fn fits(&self, owner: &str, bytes: u64) -> bool {
        self.consumed(owner).saturating_add(bytes) <= self.limit
    }

    pub fn charge(&self, owner: &str, bytes: u64) {
        if bytes == 0 {
            return;
        }
        *self.consumed.entry(owner.to_string()).or_insert(0) += bytes;
    }

    /// Decrease the owner's consumption, never below zero.
    pub fn refund(&self, owner: &str, bytes: u64) {
        if let Some(mut entry) = self.consumed.get_mut(owner) {
            *entry = entry.saturating_sub(bytes);
        }
    }
}
