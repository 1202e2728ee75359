use crossbeam_skiplist::SkipMap;
use parking_lot::RwLock;

use crate::common::Value;
use crate::document::Document;

/// A committed slot. A `None` document is a tombstone that keeps the version of
/// the delete so transactions can detect it.
#[derive(Clone)]
pub(crate) struct StoredEntry {
    pub(crate) document: Option<Document>,
    pub(crate) version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexSpec {
    pub(crate) field: String,
    pub(crate) unique: bool,
}

impl IndexSpec {
    pub(crate) fn name(&self) -> String {
        format!("{}_1", self.field)
    }
}

/// Committed documents of one collection, keyed by `_id`.
pub(crate) struct MemoryCollection {
    entries: SkipMap<Value, StoredEntry>,
    indexes: RwLock<Vec<IndexSpec>>,
}

impl MemoryCollection {
    pub(crate) fn new() -> Self {
        MemoryCollection {
            entries: SkipMap::new(),
            indexes: RwLock::new(Vec::new()),
        }
    }

    /// Live documents in `_id` order.
    pub(crate) fn documents(&self) -> Vec<(Value, Document)> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .document
                    .clone()
                    .map(|doc| (entry.key().clone(), doc))
            })
            .collect()
    }

    pub(crate) fn get(&self, id: &Value) -> Option<Document> {
        self.entries
            .get(id)
            .and_then(|entry| entry.value().document.clone())
    }

    /// Version of the last committed change to `id`, tombstones included.
    pub(crate) fn version_of(&self, id: &Value) -> u64 {
        self.entries
            .get(id)
            .map(|entry| entry.value().version)
            .unwrap_or(0)
    }

    pub(crate) fn put(&self, id: Value, document: Option<Document>, version: u64) {
        self.entries.insert(id, StoredEntry { document, version });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().document.is_some())
            .count()
    }

    pub(crate) fn indexes(&self) -> Vec<IndexSpec> {
        self.indexes.read().clone()
    }

    /// Registers an index, replacing an existing spec on the same field.
    pub(crate) fn add_index(&self, spec: IndexSpec) {
        let mut indexes = self.indexes.write();
        indexes.retain(|existing| existing.field != spec.field);
        indexes.push(spec);
    }
}
