//! The record ledger: one entry per logical upload, linking an owner, a
//! blob, and descriptive metadata.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use common::ContentHash;
use serde::Serialize;
use uuid::Uuid;

/// Whether a record is the canonical copy for its blob or a dedup reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordRole {
    Original,
    Reference,
}

/// One logical upload, owned by exactly one user.
///
/// Metadata (`filename`, `content_type`, `uploaded_at`) never affects
/// deduplication; identity is the content hash alone.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub content_hash: ContentHash,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub role: RecordRole,
}

impl FileRecord {
    pub fn is_reference(&self) -> bool {
        self.role == RecordRole::Reference
    }
}

/// Metadata filters for listing an owner's records. All present filters must
/// match (logical AND).
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    /// Case-insensitive filename substring.
    pub search: Option<String>,
    /// Exact content-type match.
    pub content_type: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub uploaded_after: Option<DateTime<Utc>>,
    pub uploaded_before: Option<DateTime<Utc>>,
}

impl ListFilter {
    fn matches(&self, record: &FileRecord) -> bool {
        if let Some(search) = &self.search
            && !record
                .filename
                .to_lowercase()
                .contains(&search.to_lowercase())
        {
            return false;
        }
        if let Some(content_type) = &self.content_type
            && record.content_type.as_deref() != Some(content_type.as_str())
        {
            return false;
        }
        if let Some(min) = self.min_size
            && record.size < min
        {
            return false;
        }
        if let Some(max) = self.max_size
            && record.size > max
        {
            return false;
        }
        if let Some(after) = self.uploaded_after
            && record.uploaded_at < after
        {
            return false;
        }
        if let Some(before) = self.uploaded_before
            && record.uploaded_at > before
        {
            return false;
        }
        true
    }
}

/// Outcome of removing a record, captured under a single catalog write lock.
#[derive(Debug)]
pub struct Removal {
    pub record: FileRecord,
    /// Records still pointing at the removed record's blob.
    pub survivors: usize,
    /// Id of the reference promoted to `Original`, if promotion ran.
    pub promoted: Option<Uuid>,
}

/// In-memory record ledger behind a single reader-writer lock, so that
/// remove-plus-promote is one atomic step: no reader can observe a live blob
/// with zero originals, or with two.
#[derive(Default)]
pub struct Catalog {
    records: RwLock<HashMap<Uuid, FileRecord>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, FileRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, FileRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, record: FileRecord) {
        self.write().insert(record.id, record);
    }

    pub fn get(&self, id: &Uuid) -> Option<FileRecord> {
        self.read().get(id).cloned()
    }

    /// Whether `owner` currently holds at least one record for `hash`.
    pub fn owner_holds(&self, owner: &str, hash: &ContentHash) -> bool {
        self.read()
            .values()
            .any(|r| r.owner_id == owner && r.content_hash == *hash)
    }

    /// Remove a record and, when it was the canonical copy of a blob that
    /// still has survivors, promote the survivor with the earliest upload
    /// time (ties broken by lowest id) to `Original`. One write lock spans
    /// the whole step.
    pub fn remove_and_promote(&self, id: &Uuid) -> Option<Removal> {
        let mut records = self.write();
        let removed = records.remove(id)?;

        let mut survivors = 0;
        let mut heir: Option<(DateTime<Utc>, Uuid)> = None;
        for r in records.values() {
            if r.content_hash == removed.content_hash {
                survivors += 1;
                let key = (r.uploaded_at, r.id);
                if heir.is_none_or(|best| key < best) {
                    heir = Some(key);
                }
            }
        }

        let mut promoted = None;
        if removed.role == RecordRole::Original
            && let Some((_, heir_id)) = heir
            && let Some(r) = records.get_mut(&heir_id)
        {
            r.role = RecordRole::Original;
            promoted = Some(heir_id);
        }

        Some(Removal {
            record: removed,
            survivors,
            promoted,
        })
    }

    /// The owner's records matching `filter`, newest first.
    pub fn list(&self, owner: &str, filter: &ListFilter) -> Vec<FileRecord> {
        let mut matches: Vec<FileRecord> = self
            .read()
            .values()
            .filter(|r| r.owner_id == owner && filter.matches(r))
            .cloned()
            .collect();
        matches.sort_by(|a, b| (b.uploaded_at, b.id).cmp(&(a.uploaded_at, a.id)));
        matches
    }

    /// Logical and deduplicated byte usage for an owner, in one pass:
    /// `(sum over all records, sum over distinct blobs)`.
    pub fn usage(&self, owner: &str) -> (u64, u64) {
        let records = self.read();
        let mut original = 0u64;
        let mut total = 0u64;
        let mut seen: HashSet<ContentHash> = HashSet::new();
        for r in records.values().filter(|r| r.owner_id == owner) {
            original += r.size;
            if seen.insert(r.content_hash) {
                total += r.size;
            }
        }
        (original, total)
    }

    /// Distinct content types across the owner's records, sorted.
    pub fn content_types(&self, owner: &str) -> Vec<String> {
        let records = self.read();
        let mut types: Vec<String> = records
            .values()
            .filter(|r| r.owner_id == owner)
            .filter_map(|r| r.content_type.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        types.sort();
        types
    }

    /// Records pointing at `hash`, any owner. Test and consistency helper.
    pub fn records_for_hash(&self, hash: &ContentHash) -> Vec<FileRecord> {
        self.read()
            .values()
            .filter(|r| r.content_hash == *hash)
            .cloned()
            .collect()
    }
}
