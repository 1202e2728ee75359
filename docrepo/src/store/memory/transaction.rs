use std::collections::BTreeMap;

use crate::common::Value;
use crate::document::Document;
use crate::store::Namespace;

/// Writes staged by one transaction, applied together at commit.
///
/// Each key remembers only its latest staged state. A `None` document stages a delete.
pub(crate) struct MemoryTransaction {
    snapshot: u64,
    writes: BTreeMap<Namespace, BTreeMap<Value, Option<Document>>>,
    failure: Option<String>,
}

impl MemoryTransaction {
    pub(crate) fn new(snapshot: u64) -> Self {
        MemoryTransaction {
            snapshot,
            writes: BTreeMap::new(),
            failure: None,
        }
    }

    /// Store version the transaction started from.
    pub(crate) fn snapshot(&self) -> u64 {
        self.snapshot
    }

    pub(crate) fn stage(&mut self, namespace: &Namespace, id: Value, document: Option<Document>) {
        self.writes
            .entry(namespace.clone())
            .or_default()
            .insert(id, document);
    }

    pub(crate) fn staged(&self, namespace: &Namespace) -> Option<&BTreeMap<Value, Option<Document>>> {
        self.writes.get(namespace)
    }

    pub(crate) fn writes(&self) -> &BTreeMap<Namespace, BTreeMap<Value, Option<Document>>> {
        &self.writes
    }

    pub(crate) fn fail(&mut self, reason: &str) {
        if self.failure.is_none() {
            self.failure = Some(reason.to_string());
        }
    }

    pub(crate) fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.values().map(|w| w.len()).sum()
    }
}

/// Server-side state of a session.
#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) transaction: Option<MemoryTransaction>,
}
