use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::sync::Arc;

use super::{Collection, ConnectionBuilder, ConnectionOptions};
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::repository::Pluralizer;
use crate::store::{DocumentStore, DocumentStoreProvider, Namespace, StoreOrigin};
use crate::transaction::TransactionScope;

static GLOBAL_CONNECTION: OnceCell<DatabaseConnection> = OnceCell::new();

type CollectionCache = DashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>;

/// Shared entry point to one logical database.
///
/// `DatabaseConnection` is a cheap handle: clones share the store, the database
/// name and the cache of resolved collection handles. It is safe to use from any
/// number of repositories and threads at once.
///
/// # Examples
///
/// ```rust,ignore
/// use docrepo::connection::{ConnectionOptions, DatabaseConnection};
///
/// let connection = DatabaseConnection::connect(
///     ConnectionOptions::new("memory://localhost/?replicaSet=rs0", "blog"),
/// )?;
/// let mut scope = connection.begin_transaction_scope()?;
/// scope.begin_transaction()?;
/// ```
#[derive(Clone)]
pub struct DatabaseConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    store: DocumentStore,
    database: String,
    pluralizer: Arc<dyn Pluralizer>,
    collections: CollectionCache,
}

impl DatabaseConnection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Connects with plaintext options and the default pluralizer.
    pub fn connect(options: ConnectionOptions) -> DocRepoResult<DatabaseConnection> {
        DatabaseConnection::builder().options(options).connect()
    }

    /// Wraps an already opened store.
    pub fn with_store<S: DocumentStoreProvider + 'static>(
        store: S,
        database: &str,
    ) -> DocRepoResult<DatabaseConnection> {
        DatabaseConnection::builder()
            .store(store)
            .database(database)
            .connect()
    }

    pub(crate) fn new(
        store: DocumentStore,
        database: String,
        pluralizer: Arc<dyn Pluralizer>,
    ) -> DatabaseConnection {
        log::debug!("Connected to database {} on {}", database, store.origin());
        DatabaseConnection {
            inner: Arc::new(ConnectionInner {
                store,
                database,
                pluralizer,
                collections: DashMap::new(),
            }),
        }
    }

    pub fn database_name(&self) -> &str {
        &self.inner.database
    }

    pub fn store(&self) -> &DocumentStore {
        &self.inner.store
    }

    pub fn origin(&self) -> &StoreOrigin {
        self.inner.store.origin()
    }

    /// Pluralizer repositories use when no collection name is set.
    pub fn pluralizer(&self) -> Arc<dyn Pluralizer> {
        self.inner.pluralizer.clone()
    }

    /// Returns the handle for `(T, name)`, creating and caching it on first use.
    pub fn collection<T: 'static>(&self, name: &str) -> DocRepoResult<Collection<T>> {
        if name.trim().is_empty() {
            log::error!("Collection name cannot be empty");
            return Err(DocRepoError::new(
                "Collection name cannot be empty",
                ErrorKind::InvalidOperation,
            ));
        }

        let key = (TypeId::of::<T>(), name.to_string());
        let handle = self
            .inner
            .collections
            .entry(key)
            .or_insert_with(|| {
                log::debug!(
                    "Resolved collection {}.{} for {}",
                    self.inner.database,
                    name,
                    std::any::type_name::<T>()
                );
                Arc::new(Collection::<T>::new(
                    self.inner.store.clone(),
                    Namespace::new(&self.inner.database, name),
                )) as Arc<dyn Any + Send + Sync>
            })
            .value()
            .clone();

        handle
            .downcast::<Collection<T>>()
            .map(|collection| (*collection).clone())
            .map_err(|_| {
                log::error!("Cached collection {} has an unexpected type", name);
                DocRepoError::new(
                    &format!("Cached collection {} has an unexpected type", name),
                    ErrorKind::InternalError,
                )
            })
    }

    /// Opens a session wrapped in a new scope. The transaction itself is not started.
    pub async fn begin_transaction_scope_async(&self) -> DocRepoResult<TransactionScope> {
        let store = self.inner.store.clone();
        if !store.supports_transactions() {
            log::error!(
                "Store {} does not support multi-document transactions",
                store.origin()
            );
            return Err(DocRepoError::new(
                "The store deployment does not support multi-document transactions",
                ErrorKind::NotSupportedByBackend,
            ));
        }
        let session = store.start_session().await?;
        Ok(TransactionScope::new(store, session))
    }

    pub fn begin_transaction_scope(&self) -> DocRepoResult<TransactionScope> {
        futures::executor::block_on(self.begin_transaction_scope_async())
    }

    /// Installs the process-wide connection. Only the first install succeeds.
    pub fn install_global(connection: DatabaseConnection) -> DocRepoResult<()> {
        GLOBAL_CONNECTION.set(connection).map_err(|_| {
            log::error!("A global database connection is already installed");
            DocRepoError::new(
                "A global database connection is already installed",
                ErrorKind::InvalidOperation,
            )
        })
    }

    pub fn global() -> DocRepoResult<DatabaseConnection> {
        GLOBAL_CONNECTION.get().cloned().ok_or_else(|| {
            log::error!("No global database connection installed");
            DocRepoError::new(
                "No global database connection installed",
                ErrorKind::InvalidOperation,
            )
        })
    }
}
