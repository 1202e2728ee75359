use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;

use crate::common::Value;
use crate::document::Document;
use crate::errors::DocRepoResult;
use crate::filter::Filter;
use crate::update::UpdateDefinition;

use super::{FindOneAndUpdateOptions, Namespace, Pipeline, SessionHandle, StoreOrigin, UpdateResult};

/// Boundary between the repository layer and a concrete document store.
///
/// A backend implements this trait once. Repositories, query builders and
/// transaction scopes reach the store only through it.
///
/// Mutations take an optional [SessionHandle]. Inside an active transaction the
/// write belongs to that transaction, otherwise it is applied on its own.
#[async_trait]
pub trait DocumentStoreProvider: Send + Sync {
    /// Identity of this backend instance, compared against session origins.
    fn origin(&self) -> &StoreOrigin;

    /// Whether the deployment can run multi-document transactions.
    fn supports_transactions(&self) -> bool;

    async fn list_collection_names(&self, database: &str) -> DocRepoResult<Vec<String>>;

    /// Fails with `WriteFailed` when the collection already exists.
    async fn create_collection(&self, namespace: &Namespace) -> DocRepoResult<()>;

    async fn drop_collection(&self, namespace: &Namespace) -> DocRepoResult<()>;

    /// Creates an index on `field` and returns its name.
    async fn create_index(
        &self,
        namespace: &Namespace,
        field: &str,
        unique: bool,
    ) -> DocRepoResult<String>;

    /// Inserts documents in order, assigning an object id to any without `_id`.
    async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<Vec<Value>>;

    async fn replace_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        replacement: Document,
        upsert: bool,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<UpdateResult>;

    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &UpdateDefinition,
        upsert: bool,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<UpdateResult>;

    async fn update_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &UpdateDefinition,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<UpdateResult>;

    /// Finds, modifies and returns one document as a single atomic step.
    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &UpdateDefinition,
        options: FindOneAndUpdateOptions,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<Option<Document>>;

    async fn delete_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<u64>;

    async fn delete_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        session: Option<&SessionHandle>,
    ) -> DocRepoResult<u64>;

    async fn count(&self, namespace: &Namespace, filter: &Filter) -> DocRepoResult<u64>;

    /// Runs `pipeline` over the committed documents of the collection.
    async fn aggregate(&self, namespace: &Namespace, pipeline: &Pipeline)
        -> DocRepoResult<Vec<Value>>;

    async fn start_session(&self) -> DocRepoResult<SessionHandle>;

    fn start_transaction(&self, session: &SessionHandle) -> DocRepoResult<()>;

    fn is_in_transaction(&self, session: &SessionHandle) -> bool;

    /// Fails with `TransactionFailed` when the transaction conflicts with another write.
    async fn commit_transaction(&self, session: &SessionHandle) -> DocRepoResult<()>;

    async fn abort_transaction(&self, session: &SessionHandle) -> DocRepoResult<()>;

    /// Releases the session, discarding any transaction still open on it.
    fn end_session(&self, session: &SessionHandle);
}

/// Shared handle to a [DocumentStoreProvider].
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<dyn DocumentStoreProvider>,
}

impl DocumentStore {
    pub fn new<T: DocumentStoreProvider + 'static>(inner: T) -> Self {
        DocumentStore {
            inner: Arc::new(inner),
        }
    }

    pub fn from_arc(inner: Arc<dyn DocumentStoreProvider>) -> Self {
        DocumentStore { inner }
    }
}

impl Deref for DocumentStore {
    type Target = Arc<dyn DocumentStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
