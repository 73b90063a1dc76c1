//! Content-addressable vault core.
//!
//! Stores each distinct byte sequence once, tracks every owner's logical
//! uploads as records pointing at shared blobs, enforces dedup-aware
//! per-owner quotas, and promotes a surviving reference to canonical status
//! when the canonical record of shared content is deleted. Physical byte
//! storage is injected via [`common::PhysicalStore`]; this crate owns all
//! bookkeeping.

pub mod catalog;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod quota;
pub mod stats;
pub mod vault;

pub use catalog::{FileRecord, ListFilter, RecordRole};
pub use clock::{Clock, SystemClock};
pub use error::VaultError;
pub use stats::StorageStats;
pub use vault::Vault;
