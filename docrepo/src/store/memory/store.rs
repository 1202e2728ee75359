use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::collection::{IndexSpec, MemoryCollection};
use super::config::MemoryStoreConfig;
use super::transaction::{MemoryTransaction, SessionState};
use crate::common::{Value, DOC_ID, MEMORY_STORE_FAMILY};
use crate::document::{Document, ObjectId};
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::filter::Filter;
use crate::store::{
    DocumentStoreProvider, FindOneAndUpdateOptions, Namespace, Pipeline, ReturnDocument,
    SessionHandle, StoreOrigin, UpdateResult,
};
use crate::update::UpdateDefinition;

/// A document store held entirely in memory.
///
/// Every mutation runs under one store-wide write lock, so single-document
/// operations such as `find_one_and_update` are atomic. Reads go straight to the
/// lock-free collections and only ever see committed data.
///
/// Transactions are optimistic. Writes are staged on the session and a write to a
/// document committed by someone else after the transaction began fails with
/// `TransactionFailed`. Commit validates every written key again and applies the
/// whole write set under a single version.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> MemoryStore {
        MemoryStore {
            inner: Arc::new(MemoryStoreInner::new(config)),
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.inner.config
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new(MemoryStoreConfig::default())
    }
}

#[async_trait]
impl DocumentStoreProvider for MemoryStore {
    fn origin(&self) -> &StoreOrigin {
        &self.inner.origin
    }

    fn supports_transactions(&self) -> bool {
        self.inner.config.supports_transactions()
    }

    async fn list_collection_names(&self, database: &str) -> DocRepoResult<Vec<String>> {
        Ok(self.inner.list_collection_names(database))
    }

    async fn create_collection(&self, namespace: &Namespace) -> DocRepoResult<()> {
        self.inner.create_collection(namespace)
    }

    async fn drop_collection(&self, namespace: &Namespace) -> DocRepoResult<()> {
        self.inner.drop_collection(namespace);
        Ok(())
    }

    async fn create_index(
        &self,
        namespace: &Namespace,
        field: &str,
        unique: bool,
    ) -> DocRepoResult<String> {
        self.inner.create_index(namespace, field, unique)
    }

    async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<Vec<Value>> {
        self.inner.insert_many(namespace, documents, session)
    }

    async fn replace_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        replacement: Document,
        upsert: bool,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<UpdateResult> {
        self.inner
            .replace_one(namespace, filter, replacement, upsert, session)
    }

    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &UpdateDefinition,
        upsert: bool,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<UpdateResult> {
        self.inner.update(namespace, filter, update, upsert, false, session)
    }

    async fn update_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &UpdateDefinition,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<UpdateResult> {
        self.inner.update(namespace, filter, update, false, true, session)
    }

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &UpdateDefinition,
        options: FindOneAndUpdateOptions,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<Option<Document>> {
        self.inner
            .find_one_and_update(namespace, filter, update, options, session)
    }

    async fn delete_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<u64> {
        self.inner.delete(namespace, filter, false, session)
    }

    async fn delete_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<u64> {
        self.inner.delete(namespace, filter, true, session)
    }

    async fn count(&self, namespace: &Namespace, filter: &Filter) -> DocRepoResult<u64> {
        self.inner.count(namespace, filter)
    }

    async fn aggregate(
        &self,
        namespace: &Namespace,
        pipeline: &Pipeline,
    ) -> DocRepoResult<Vec<Value>> {
        self.inner.aggregate(namespace, pipeline)
    }

    async fn start_session(&self) -> DocRepoResult<SessionHandle> {
        Ok(self.inner.start_session())
    }

    fn start_transaction(&self, session: &SessionHandle) -> DocRepoResult<()> {
        self.inner.start_transaction(session)
    }

    fn is_in_transaction(&self, session: &SessionHandle) -> bool {
        self.inner.is_in_transaction(session)
    }

    async fn commit_transaction(&self, session: &SessionHandle) -> DocRepoResult<()> {
        self.inner.commit_transaction(session)
    }

    async fn abort_transaction(&self, session: &SessionHandle) -> DocRepoResult<()> {
        self.inner.abort_transaction(session)
    }

    fn end_session(&self, session: &SessionHandle) {
        self.inner.end_session(session)
    }
}

struct MemoryStoreInner {
    origin: StoreOrigin,
    config: MemoryStoreConfig,
    collections: DashMap<Namespace, Arc<MemoryCollection>>,
    sessions: DashMap<Uuid, SessionState>,
    write_lock: Mutex<()>,
    clock: AtomicU64,
}

impl MemoryStoreInner {
    fn new(config: MemoryStoreConfig) -> Self {
        let origin = StoreOrigin::new(MEMORY_STORE_FAMILY);
        log::debug!("Opened in-memory store {} as {:?}", origin, config.topology());
        MemoryStoreInner {
            origin,
            config,
            collections: DashMap::new(),
            sessions: DashMap::new(),
            write_lock: Mutex::new(()),
            clock: AtomicU64::new(0),
        }
    }

    fn collection(&self, namespace: &Namespace) -> Option<Arc<MemoryCollection>> {
        self.collections.get(namespace).map(|c| c.value().clone())
    }

    fn collection_or_create(&self, namespace: &Namespace) -> Arc<MemoryCollection> {
        self.collections
            .entry(namespace.clone())
            .or_insert_with(|| {
                log::debug!("Implicitly creating collection {}", namespace);
                Arc::new(MemoryCollection::new())
            })
            .value()
            .clone()
    }

    fn next_version(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn list_collection_names(&self, database: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .filter(|entry| entry.key().database() == database)
            .map(|entry| entry.key().collection().to_string())
            .collect();
        names.sort();
        names
    }

    fn create_collection(&self, namespace: &Namespace) -> DocRepoResult<()> {
        let _guard = self.write_lock.lock();
        if self.collections.contains_key(namespace) {
            log::error!("Collection {} already exists", namespace);
            return Err(DocRepoError::new(
                &format!("Collection {} already exists", namespace),
                ErrorKind::WriteFailed,
            ));
        }
        self.collections
            .insert(namespace.clone(), Arc::new(MemoryCollection::new()));
        log::debug!("Created collection {}", namespace);
        Ok(())
    }

    fn drop_collection(&self, namespace: &Namespace) {
        let _guard = self.write_lock.lock();
        if let Some((_, collection)) = self.collections.remove(namespace) {
            log::debug!("Dropped collection {} with {} documents", namespace, collection.len());
        }
    }

    fn create_index(&self, namespace: &Namespace, field: &str, unique: bool) -> DocRepoResult<String> {
        let _guard = self.write_lock.lock();
        let collection = self.collection_or_create(namespace);
        let spec = IndexSpec {
            field: field.to_string(),
            unique,
        };

        if unique {
            let mut seen = std::collections::HashSet::new();
            for (_, doc) in collection.documents() {
                let value = doc.get(field);
                if !value.is_null() && !seen.insert(value.clone()) {
                    log::error!("Cannot create unique index on {}.{}: duplicate {}", namespace, field, value);
                    return Err(DocRepoError::new(
                        &format!("Duplicate key {} prevents unique index on {}", value, field),
                        ErrorKind::WriteFailed,
                    ));
                }
            }
        }

        let name = spec.name();
        collection.add_index(spec);
        log::debug!("Created index {} on {}", name, namespace);
        Ok(name)
    }

    /// Runs `op` under the write lock with the session's transaction, if one is open.
    fn with_scope<R>(
        &self,
        namespace: &Namespace,
        session: Option<&SessionHandle>,
        op: impl FnOnce(&mut WriteScope<'_>) -> DocRepoResult<R>,
    ) -> DocRepoResult<R> {
        let _guard = self.write_lock.lock();
        let session = match session {
            Some(session) => session,
            None => {
                return op(&mut WriteScope {
                    inner: self,
                    namespace,
                    transaction: None,
                })
            }
        };

        self.check_origin(session)?;
        let mut state = self.session_state(session)?;
        match state.transaction.as_mut() {
            Some(transaction) => {
                if let Some(reason) = transaction.failure().map(str::to_string) {
                    log::error!("Transaction on {} already failed: {}", session, reason);
                    return Err(DocRepoError::new(
                        &format!("Transaction already failed: {}", reason),
                        ErrorKind::TransactionFailed,
                    ));
                }
                op(&mut WriteScope {
                    inner: self,
                    namespace,
                    transaction: Some(transaction),
                })
            }
            None => op(&mut WriteScope {
                inner: self,
                namespace,
                transaction: None,
            }),
        }
    }

    fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<Vec<Value>> {
        self.with_scope(namespace, session, |scope| {
            let mut ids = Vec::with_capacity(documents.len());
            for mut document in documents {
                if document.id().is_null() {
                    document.put(DOC_ID, ObjectId::new())?;
                }
                ids.push(scope.insert(document)?);
            }
            log::debug!("Inserted {} documents into {}", ids.len(), namespace);
            Ok(ids)
        })
    }

    fn replace_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        replacement: Document,
        upsert: bool,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<UpdateResult> {
        self.with_scope(namespace, session, |scope| {
            let mut replacement = replacement;
            match scope.first_match(filter)? {
                Some((id, existing)) => {
                    if replacement.has_id() && replacement.id() != id {
                        log::error!("Replacement would change _id {} in {}", id, namespace);
                        return Err(DocRepoError::new(
                            &format!("Replacement would modify the immutable field {}", DOC_ID),
                            ErrorKind::WriteFailed,
                        ));
                    }
                    replacement.put(DOC_ID, id.clone())?;
                    let modified = scope.replace(id, &existing, replacement)?;
                    Ok(UpdateResult {
                        matched_count: 1,
                        modified_count: modified as u64,
                        upserted_id: None,
                    })
                }
                None if upsert => {
                    if replacement.id().is_null() {
                        replacement.put(DOC_ID, seed_id(filter))?;
                    }
                    let id = scope.insert(replacement)?;
                    Ok(UpdateResult {
                        upserted_id: Some(id),
                        ..UpdateResult::default()
                    })
                }
                None => Ok(UpdateResult::default()),
            }
        })
    }

    fn update(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &UpdateDefinition,
        upsert: bool,
        multi: bool,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<UpdateResult> {
        self.with_scope(namespace, session, |scope| {
            let mut matches = scope.matches(filter)?;
            if !multi {
                matches.truncate(1);
            }

            if matches.is_empty() {
                if !upsert {
                    return Ok(UpdateResult::default());
                }
                let id = scope.insert(upsert_document(filter, update)?)?;
                return Ok(UpdateResult {
                    upserted_id: Some(id),
                    ..UpdateResult::default()
                });
            }

            let mut result = UpdateResult {
                matched_count: matches.len() as u64,
                ..UpdateResult::default()
            };
            for (id, existing) in matches {
                let updated = update.apply_to(&existing)?;
                if scope.replace(id, &existing, updated)? {
                    result.modified_count += 1;
                }
            }
            log::debug!(
                "Updated {} of {} matched documents in {}",
                result.modified_count,
                result.matched_count,
                namespace
            );
            Ok(result)
        })
    }

    fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &UpdateDefinition,
        options: FindOneAndUpdateOptions,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<Option<Document>> {
        self.with_scope(namespace, session, |scope| match scope.first_match(filter)? {
            Some((id, existing)) => {
                let updated = update.apply_to(&existing)?;
                scope.replace(id, &existing, updated.clone())?;
                Ok(match options.return_document {
                    ReturnDocument::Before => Some(existing),
                    ReturnDocument::After => Some(updated),
                })
            }
            None if options.upsert => {
                let document = upsert_document(filter, update)?;
                scope.insert(document.clone())?;
                Ok(match options.return_document {
                    ReturnDocument::Before => None,
                    ReturnDocument::After => Some(document),
                })
            }
            None => Ok(None),
        })
    }

    fn delete(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        multi: bool,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<u64> {
        self.with_scope(namespace, session, |scope| {
            let mut matches = scope.matches(filter)?;
            if !multi {
                matches.truncate(1);
            }
            let deleted = matches.len() as u64;
            for (id, _) in matches {
                scope.write(id, None)?;
            }
            log::debug!("Deleted {} documents from {}", deleted, namespace);
            Ok(deleted)
        })
    }

    fn count(&self, namespace: &Namespace, filter: &Filter) -> DocRepoResult<u64> {
        let mut count = 0;
        if let Some(collection) = self.collection(namespace) {
            for (_, doc) in collection.documents() {
                if filter.apply(&doc)? {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn aggregate(&self, namespace: &Namespace, pipeline: &Pipeline) -> DocRepoResult<Vec<Value>> {
        let documents = self
            .collection(namespace)
            .map(|c| c.documents())
            .unwrap_or_default();
        log::debug!("Running pipeline {} over {} documents of {}", pipeline, documents.len(), namespace);
        pipeline.run(
            documents
                .into_iter()
                .map(|(_, doc)| Value::Document(doc))
                .collect(),
        )
    }

    fn start_session(&self) -> SessionHandle {
        let session = SessionHandle::new(self.origin);
        self.sessions.insert(session.id(), SessionState::default());
        log::debug!("Started {}", session);
        session
    }

    fn start_transaction(&self, session: &SessionHandle) -> DocRepoResult<()> {
        self.check_origin(session)?;
        if !self.config.supports_transactions() {
            log::error!("Transactions are not supported by a standalone in-memory store");
            return Err(DocRepoError::new(
                "Transactions require a replica set deployment",
                ErrorKind::NotSupportedByBackend,
            ));
        }

        let mut state = self.session_state(session)?;
        if state.transaction.is_some() {
            log::error!("Transaction already in progress on {}", session);
            return Err(DocRepoError::new(
                "Transaction already in progress",
                ErrorKind::InvalidOperation,
            ));
        }
        let snapshot = self.clock.load(Ordering::SeqCst);
        state.transaction = Some(MemoryTransaction::new(snapshot));
        log::debug!("Started transaction on {} at version {}", session, snapshot);
        Ok(())
    }

    fn is_in_transaction(&self, session: &SessionHandle) -> bool {
        self.sessions
            .get(&session.id())
            .map(|state| state.transaction.is_some())
            .unwrap_or(false)
    }

    fn commit_transaction(&self, session: &SessionHandle) -> DocRepoResult<()> {
        self.check_origin(session)?;
        let _guard = self.write_lock.lock();
        let mut transaction = {
            let mut state = self.session_state(session)?;
            match state.transaction.take() {
                Some(transaction) => transaction,
                None => {
                    log::error!("No transaction in progress on {}", session);
                    return Err(DocRepoError::new(
                        "No transaction in progress",
                        ErrorKind::InvalidOperation,
                    ));
                }
            }
        };

        if let Some(reason) = transaction.failure() {
            log::error!("Cannot commit failed transaction on {}: {}", session, reason);
            return Err(DocRepoError::new(
                &format!("Transaction failed: {}", reason),
                ErrorKind::TransactionFailed,
            ));
        }

        self.validate_commit(&mut transaction)?;

        let version = self.next_version();
        let writes = transaction.write_count();
        for (namespace, staged) in transaction.writes() {
            let collection = self.collection_or_create(namespace);
            for (id, document) in staged {
                collection.put(id.clone(), document.clone(), version);
            }
        }
        log::debug!("Committed {} writes on {} at version {}", writes, session, version);
        Ok(())
    }

    fn validate_commit(&self, transaction: &mut MemoryTransaction) -> DocRepoResult<()> {
        let snapshot = transaction.snapshot();
        let mut pending: Vec<(Namespace, Value, Document)> = Vec::new();
        for (namespace, staged) in transaction.writes() {
            let collection = self.collection(namespace);
            for (id, document) in staged {
                let committed = collection.as_ref().map(|c| c.version_of(id)).unwrap_or(0);
                if committed > snapshot {
                    log::error!("Write conflict on {} {} at commit", namespace, id);
                    return Err(DocRepoError::new(
                        &format!("Write conflict on {} document {}", namespace, id),
                        ErrorKind::TransactionFailed,
                    ));
                }
                if let Some(document) = document {
                    pending.push((namespace.clone(), id.clone(), document.clone()));
                }
            }
        }

        for (namespace, id, document) in pending {
            let scope = WriteScope {
                inner: self,
                namespace: &namespace,
                transaction: Some(&mut *transaction),
            };
            scope.check_unique(&id, &document).map_err(|err| {
                DocRepoError::new_with_cause(
                    "Transaction violates a unique index",
                    ErrorKind::TransactionFailed,
                    err,
                )
            })?;
        }
        Ok(())
    }

    fn abort_transaction(&self, session: &SessionHandle) -> DocRepoResult<()> {
        self.check_origin(session)?;
        let mut state = self.session_state(session)?;
        match state.transaction.take() {
            Some(transaction) => {
                log::debug!(
                    "Aborted transaction on {} discarding {} writes",
                    session,
                    transaction.write_count()
                );
                Ok(())
            }
            None => {
                log::error!("No transaction in progress on {}", session);
                Err(DocRepoError::new(
                    "No transaction in progress",
                    ErrorKind::InvalidOperation,
                ))
            }
        }
    }

    fn end_session(&self, session: &SessionHandle) {
        if let Some((_, state)) = self.sessions.remove(&session.id()) {
            if state.transaction.is_some() {
                log::warn!("Ended {} with an open transaction, discarding it", session);
            }
            log::debug!("Ended {}", session);
        }
    }

    fn check_origin(&self, session: &SessionHandle) -> DocRepoResult<()> {
        if session.origin() != &self.origin {
            log::error!("{} does not belong to store {}", session, self.origin);
            return Err(DocRepoError::new(
                &format!("Session belongs to another store ({})", session.origin()),
                ErrorKind::IncompatibleTransactionScope,
            ));
        }
        Ok(())
    }

    fn session_state(
        &self,
        session: &SessionHandle,
    ) -> DocRepoResult<dashmap::mapref::one::RefMut<'_, Uuid, SessionState>> {
        self.sessions.get_mut(&session.id()).ok_or_else(|| {
            log::error!("{} has already ended", session);
            DocRepoError::new("Session has already ended", ErrorKind::InvalidOperation)
        })
    }
}

/// A collection as seen by one writer: committed data plus the writer's staged writes.
struct WriteScope<'a> {
    inner: &'a MemoryStoreInner,
    namespace: &'a Namespace,
    transaction: Option<&'a mut MemoryTransaction>,
}

impl WriteScope<'_> {
    fn documents(&self) -> Vec<(Value, Document)> {
        let committed = self
            .inner
            .collection(self.namespace)
            .map(|c| c.documents())
            .unwrap_or_default();

        let staged = match self.transaction.as_ref().and_then(|tx| tx.staged(self.namespace)) {
            Some(staged) => staged,
            None => return committed,
        };

        let mut visible: BTreeMap<Value, Document> = committed.into_iter().collect();
        for (id, document) in staged {
            match document {
                Some(doc) => visible.insert(id.clone(), doc.clone()),
                None => visible.remove(id),
            };
        }
        visible.into_iter().collect()
    }

    fn get(&self, id: &Value) -> Option<Document> {
        if let Some(staged) = self.transaction.as_ref().and_then(|tx| tx.staged(self.namespace)) {
            if let Some(document) = staged.get(id) {
                return document.clone();
            }
        }
        self.inner.collection(self.namespace).and_then(|c| c.get(id))
    }

    fn matches(&self, filter: &Filter) -> DocRepoResult<Vec<(Value, Document)>> {
        let mut matched = Vec::new();
        for (id, doc) in self.documents() {
            if filter.apply(&doc)? {
                matched.push((id, doc));
            }
        }
        Ok(matched)
    }

    fn first_match(&self, filter: &Filter) -> DocRepoResult<Option<(Value, Document)>> {
        for (id, doc) in self.documents() {
            if filter.apply(&doc)? {
                return Ok(Some((id, doc)));
            }
        }
        Ok(None)
    }

    fn check_unique(&self, id: &Value, document: &Document) -> DocRepoResult<()> {
        let indexes = match self.inner.collection(self.namespace) {
            Some(collection) => collection.indexes(),
            None => return Ok(()),
        };

        let unique_fields: Vec<&IndexSpec> = indexes.iter().filter(|spec| spec.unique).collect();
        if unique_fields.is_empty() {
            return Ok(());
        }

        let others = self.documents();
        for spec in unique_fields {
            let value = document.get(&spec.field);
            if value.is_null() {
                continue;
            }
            let clash = others
                .iter()
                .any(|(other_id, other)| other_id != id && other.get(&spec.field) == value);
            if clash {
                log::error!("Duplicate key {} for unique index {} on {}", value, spec.name(), self.namespace);
                return Err(DocRepoError::new(
                    &format!(
                        "Duplicate key error on {} index {}: {}",
                        self.namespace,
                        spec.name(),
                        value
                    ),
                    ErrorKind::WriteFailed,
                ));
            }
        }
        Ok(())
    }

    fn insert(&mut self, document: Document) -> DocRepoResult<Value> {
        let id = document.id();
        if self.get(&id).is_some() {
            log::error!("Duplicate _id {} in {}", id, self.namespace);
            return Err(DocRepoError::new(
                &format!("Duplicate key error on {}: _id {} already exists", self.namespace, id),
                ErrorKind::WriteFailed,
            ));
        }
        self.check_unique(&id, &document)?;
        self.write(id.clone(), Some(document))?;
        Ok(id)
    }

    /// Writes `updated` over `existing`. Returns whether anything changed.
    fn replace(&mut self, id: Value, existing: &Document, updated: Document) -> DocRepoResult<bool> {
        self.check_conflict(&id)?;
        if &updated == existing {
            return Ok(false);
        }
        self.check_unique(&id, &updated)?;
        self.write(id, Some(updated))?;
        Ok(true)
    }

    fn write(&mut self, id: Value, document: Option<Document>) -> DocRepoResult<()> {
        self.check_conflict(&id)?;
        match self.transaction.as_mut() {
            None => {
                let version = self.inner.next_version();
                self.inner
                    .collection_or_create(self.namespace)
                    .put(id, document, version);
            }
            Some(transaction) => transaction.stage(self.namespace, id, document),
        }
        Ok(())
    }

    /// Fails the transaction if `id` was committed by someone else after its snapshot.
    fn check_conflict(&mut self, id: &Value) -> DocRepoResult<()> {
        let committed = self
            .inner
            .collection(self.namespace)
            .map(|c| c.version_of(id))
            .unwrap_or(0);
        let namespace = self.namespace;
        let transaction = match self.transaction.as_mut() {
            Some(transaction) => transaction,
            None => return Ok(()),
        };
        if committed > transaction.snapshot() {
            let reason = format!("write conflict on {} document {}", namespace, id);
            transaction.fail(&reason);
            log::error!("Transaction aborted by {}", reason);
            return Err(DocRepoError::new(
                &format!("Transaction aborted by {}", reason),
                ErrorKind::TransactionFailed,
            ));
        }
        Ok(())
    }
}

/// Seeds an upserted document with the filter's equalities, then applies `update`.
fn upsert_document(filter: &Filter, update: &UpdateDefinition) -> DocRepoResult<Document> {
    let mut seed = Document::new();
    for (path, value) in filter.equality_fields() {
        seed.put(&path, value)?;
    }
    let mut document = update.apply_to(&seed)?;
    if document.id().is_null() {
        document.put(DOC_ID, ObjectId::new())?;
    }
    Ok(document)
}

fn seed_id(filter: &Filter) -> Value {
    filter
        .equality_fields()
        .into_iter()
        .find(|(path, _)| path == DOC_ID)
        .map(|(_, value)| value)
        .unwrap_or_else(|| Value::ObjectId(ObjectId::new()))
}
