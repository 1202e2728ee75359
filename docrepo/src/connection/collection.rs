use std::fmt::{Debug, Display};
use std::marker::PhantomData;

use crate::store::{DocumentStore, Namespace};

/// A named view over the store bound to one entity type.
///
/// Handles are resolved and cached by
/// [DatabaseConnection::collection](crate::connection::DatabaseConnection::collection).
/// Resolving a handle does not create the collection in the store.
pub struct Collection<T> {
    namespace: Namespace,
    store: DocumentStore,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T> {
    pub(crate) fn new(store: DocumentStore, namespace: Namespace) -> Self {
        Collection {
            namespace,
            store,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.namespace.collection()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Collection {
            namespace: self.namespace.clone(),
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Display for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.namespace)
    }
}

impl<T> Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Collection({})", self.namespace)
    }
}
