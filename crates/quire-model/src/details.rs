//! Details store: per-object metadata records shared across views.
//!
//! One [`Details`] record per object id, holding the loose key/value map
//! (name, layout, icon, archive flag, ...). Unlike the block tree there is
//! no structure to derive: the store is a flat map with lazy creation on
//! write. Reads never materialize a record; merging into or unsetting on an
//! unknown id creates the record first, so out-of-order remote events land
//! on an empty record instead of being dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use quire_types::{Details, ObjectId};

/// Store handle shared between the event pipeline and readers.
///
/// Writers take the lock per event, never across await points.
pub type SharedDetails = Arc<RwLock<DetailsStore>>;

/// Create a fresh shared store.
pub fn shared_details() -> SharedDetails {
    Arc::new(RwLock::new(DetailsStore::new()))
}

/// Flat map of object id to details record.
#[derive(Debug, Default)]
pub struct DetailsStore {
    /// Records indexed by object id.
    records: BTreeMap<ObjectId, Details>,

    /// Store version (bumped on any write).
    version: u64,
}

impl DetailsStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lookup without materializing: `None` until something was written.
    pub fn get(&self, id: &ObjectId) -> Option<&Details> {
        self.records.get(id)
    }

    /// Whether a record exists for `id`.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.records.contains_key(id)
    }

    /// Ids of all stored records.
    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.records.keys()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert or fully replace the record for `details.id`.
    ///
    /// Keys present in an old record but absent from `details` are gone
    /// afterwards; this is the "snapshot" write used for full object sets.
    pub fn add(&mut self, details: Details) {
        self.records.insert(details.id.clone(), details);
        self.version += 1;
    }

    /// Merge `entries` into the record for `id`, creating it if absent.
    ///
    /// Incoming values win over stored ones. Returns a copy of the record
    /// after the merge so callers can inspect the result (layout changes,
    /// archive flips) without re-locking.
    pub fn merge(
        &mut self,
        id: &ObjectId,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Details {
        let record = self
            .records
            .entry(id.clone())
            .or_insert_with(|| Details::new(id.clone()));
        record.merge(entries);
        self.version += 1;
        record.clone()
    }

    /// Remove `keys` from the record for `id`, creating it if absent.
    ///
    /// Unsetting on an unknown id leaves an empty record behind, matching
    /// the merge path. Returns a copy of the record after the removal.
    pub fn unset(&mut self, id: &ObjectId, keys: &[String]) -> Details {
        let record = self
            .records
            .entry(id.clone())
            .or_insert_with(|| Details::new(id.clone()));
        record.unset(keys);
        self.version += 1;
        record.clone()
    }

    /// Delete the whole record for `id`, if present.
    pub fn delete(&mut self, id: &ObjectId) -> Option<Details> {
        let removed = self.records.remove(id);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }
}

// ============================================================================
// Tests
// ============================================================================
