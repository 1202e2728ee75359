use futures::executor::block_on;
use std::sync::Arc;

use super::binding::CollectionBinding;
use super::entity::id_filter;
use super::{Entity, EntityId, Pluralizer};
use crate::common::{Value, DOC_ID};
use crate::connection::{Collection, DatabaseConnection};
use crate::document::{Document, ObjectId};
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::filter::{all, field, Filter};
use crate::query::QueryBuilder;
use crate::store::{
    FindOneAndUpdateOptions, Pipeline, ReturnDocument, SessionHandle, Stage, UpdateResult,
};
use crate::transaction::TransactionScope;
use crate::update::UpdateDefinition;

/// Typed CRUD and lifecycle operations for one entity type.
///
/// The collection is resolved lazily, once, the first time an operation needs it.
/// Until then the name can be changed with
/// [set_collection_name](Repository::set_collection_name). Clones share that state.
///
/// Every operation is async. Each one has a `_blocking` twin that drives the same
/// future to completion on the calling thread.
///
/// Mutations take an optional [TransactionScope]. A scope with an active transaction
/// makes the operation part of it. A scope whose transaction has not begun yet has no
/// effect, and a scope from another store is rejected.
///
/// # Examples
///
/// ```rust,ignore
/// let posts: Repository<Post> = Repository::new(connection.clone());
/// let mut post = Post::new("Hello", "First post");
/// posts.add_one(&mut post, None).await?;
/// assert!(posts.exists_by_id(post.id()).await?);
/// ```
pub struct Repository<T: Entity> {
    connection: DatabaseConnection,
    pluralizer: Arc<dyn Pluralizer>,
    binding: Arc<CollectionBinding<T>>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            connection: self.connection.clone(),
            pluralizer: self.pluralizer.clone(),
            binding: self.binding.clone(),
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(connection: DatabaseConnection) -> Self {
        let pluralizer = connection.pluralizer();
        Repository {
            connection,
            pluralizer,
            binding: Arc::new(CollectionBinding::new()),
        }
    }

    pub fn with_pluralizer<P: Pluralizer + 'static>(
        connection: DatabaseConnection,
        pluralizer: P,
    ) -> Self {
        Repository {
            connection,
            pluralizer: Arc::new(pluralizer),
            binding: Arc::new(CollectionBinding::new()),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Configured name, or the default derived from the entity name.
    pub fn collection_name(&self) -> String {
        self.binding.name(self.pluralizer.as_ref())
    }

    /// Fails with `CollectionAlreadyResolved` once the collection has been used.
    pub fn set_collection_name(&self, name: &str) -> DocRepoResult<()> {
        self.binding.set_name(name)
    }

    pub fn is_resolved(&self) -> bool {
        self.binding.is_bound()
    }

    pub fn collection(&self) -> DocRepoResult<Collection<T>> {
        self.binding
            .resolve(&self.connection, self.pluralizer.as_ref())
    }

    /// Starts a lazy query over the collection.
    pub fn query(&self) -> DocRepoResult<QueryBuilder<T>> {
        Ok(QueryBuilder::new(&self.collection()?))
    }

    /// A new store-compatible id in string form.
    pub fn generate_string_id(&self) -> String {
        ObjectId::new().to_hex()
    }

    pub async fn collection_exists(&self) -> DocRepoResult<bool> {
        let name = self.collection_name();
        let names = self
            .connection
            .store()
            .list_collection_names(self.connection.database_name())
            .await?;
        Ok(names.contains(&name))
    }

    pub fn collection_exists_blocking(&self) -> DocRepoResult<bool> {
        block_on(self.collection_exists())
    }

    /// Returns `false` when the collection already exists.
    pub async fn create_collection(&self) -> DocRepoResult<bool> {
        let collection = self.collection()?;
        if self.collection_exists().await? {
            return Ok(false);
        }
        collection.store().create_collection(collection.namespace()).await?;
        Ok(true)
    }

    pub fn create_collection_blocking(&self) -> DocRepoResult<bool> {
        block_on(self.create_collection())
    }

    /// Returns `false` when there was no collection to drop.
    pub async fn drop_collection(&self) -> DocRepoResult<bool> {
        let collection = self.collection()?;
        if !self.collection_exists().await? {
            return Ok(false);
        }
        collection.store().drop_collection(collection.namespace()).await?;
        Ok(true)
    }

    pub fn drop_collection_blocking(&self) -> DocRepoResult<bool> {
        block_on(self.drop_collection())
    }

    pub async fn create_index(&self, field: &str, unique: bool) -> DocRepoResult<String> {
        let collection = self.collection()?;
        collection
            .store()
            .create_index(collection.namespace(), field, unique)
            .await
    }

    pub fn create_index_blocking(&self, field: &str, unique: bool) -> DocRepoResult<String> {
        block_on(self.create_index(field, unique))
    }

    /// Inserts `entity`, assigning a generated id first when it has none.
    pub async fn add_one(
        &self,
        entity: &mut T,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<()> {
        self.add_many(std::slice::from_mut(entity), scope).await
    }

    pub fn add_one_blocking(
        &self,
        entity: &mut T,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<()> {
        block_on(self.add_one(entity, scope))
    }

    pub async fn add_many(
        &self,
        entities: &mut [T],
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let collection = self.collection()?;
        let session = self.session(scope)?;

        let mut documents = Vec::with_capacity(entities.len());
        for entity in entities.iter_mut() {
            assign_id(entity);
            documents.push(to_document(entity)?);
        }

        let ids = collection
            .store()
            .insert_many(collection.namespace(), documents, session)
            .await?;

        for (entity, id) in entities.iter_mut().zip(ids.iter()) {
            if entity.id().is_unassigned() {
                entity.set_id(T::Id::from_id_value(id)?);
            }
        }
        Ok(())
    }

    pub fn add_many_blocking(
        &self,
        entities: &mut [T],
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<()> {
        block_on(self.add_many(entities, scope))
    }

    /// `None` when nothing is stored under `id`.
    pub async fn get_by_id(&self, id: &T::Id) -> DocRepoResult<Option<T>> {
        let pipeline = Pipeline::new()
            .with(Stage::Match(id_filter(id)?))
            .with(Stage::Limit(1));
        Ok(self.aggregate(&pipeline).await?.into_iter().next())
    }

    pub fn get_by_id_blocking(&self, id: &T::Id) -> DocRepoResult<Option<T>> {
        block_on(self.get_by_id(id))
    }

    pub async fn exists_by_id(&self, id: &T::Id) -> DocRepoResult<bool> {
        let collection = self.collection()?;
        let count = collection
            .store()
            .count(collection.namespace(), &id_filter(id)?)
            .await?;
        Ok(count > 0)
    }

    pub fn exists_by_id_blocking(&self, id: &T::Id) -> DocRepoResult<bool> {
        block_on(self.exists_by_id(id))
    }

    pub async fn get_all(&self) -> DocRepoResult<Vec<T>> {
        self.aggregate(&Pipeline::new()).await
    }

    pub fn get_all_blocking(&self) -> DocRepoResult<Vec<T>> {
        block_on(self.get_all())
    }

    pub async fn find(&self, filter: Filter) -> DocRepoResult<Vec<T>> {
        self.aggregate(&Pipeline::new().with(Stage::Match(filter)))
            .await
    }

    pub fn find_blocking(&self, filter: Filter) -> DocRepoResult<Vec<T>> {
        block_on(self.find(filter))
    }

    pub async fn count(&self) -> DocRepoResult<u64> {
        let collection = self.collection()?;
        collection
            .store()
            .count(collection.namespace(), &all())
            .await
    }

    pub fn count_blocking(&self) -> DocRepoResult<u64> {
        block_on(self.count())
    }

    /// Replaces the document stored under the entity's id. No match is not an error.
    pub async fn update(&self, entity: &T, scope: Option<&TransactionScope>) -> DocRepoResult<()> {
        let collection = self.collection()?;
        let session = self.session(scope)?;
        let result = collection
            .store()
            .replace_one(
                collection.namespace(),
                &id_filter(entity.id())?,
                to_document(entity)?,
                false,
                session,
            )
            .await?;
        if result.matched_count == 0 {
            log::debug!("Update of {:?} in {} matched nothing", entity.id(), collection);
        }
        Ok(())
    }

    pub fn update_blocking(&self, entity: &T, scope: Option<&TransactionScope>) -> DocRepoResult<()> {
        block_on(self.update(entity, scope))
    }

    /// Replaces the document stored under the entity's id, inserting it when absent.
    pub async fn upsert(
        &self,
        entity: &mut T,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<()> {
        let collection = self.collection()?;
        let session = self.session(scope)?;
        assign_id(entity);
        collection
            .store()
            .replace_one(
                collection.namespace(),
                &id_filter(entity.id())?,
                to_document(entity)?,
                true,
                session,
            )
            .await?;
        Ok(())
    }

    pub fn upsert_blocking(
        &self,
        entity: &mut T,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<()> {
        block_on(self.upsert(entity, scope))
    }

    /// Sets `field` to `value` on every matching document.
    pub async fn update_many_field<V: Into<Value>>(
        &self,
        filter: Filter,
        field: &str,
        value: V,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<UpdateResult> {
        self.update_many(filter, UpdateDefinition::new().set(field, value), scope)
            .await
    }

    pub fn update_many_field_blocking<V: Into<Value>>(
        &self,
        filter: Filter,
        field: &str,
        value: V,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<UpdateResult> {
        block_on(self.update_many_field(filter, field, value, scope))
    }

    /// Applies `updates` to every matching document.
    pub async fn update_many(
        &self,
        filter: Filter,
        updates: UpdateDefinition,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<UpdateResult> {
        let collection = self.collection()?;
        let session = self.session(scope)?;
        collection
            .store()
            .update_many(collection.namespace(), &filter, &updates, session)
            .await
    }

    pub fn update_many_blocking(
        &self,
        filter: Filter,
        updates: UpdateDefinition,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<UpdateResult> {
        block_on(self.update_many(filter, updates, scope))
    }

    /// Applies `updates` to the first matching document, or inserts one built from
    /// the filter's equalities and `updates` when nothing matches.
    pub async fn upsert_one_by_filter(
        &self,
        filter: Filter,
        updates: UpdateDefinition,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<UpdateResult> {
        let collection = self.collection()?;
        let session = self.session(scope)?;
        collection
            .store()
            .update_one(collection.namespace(), &filter, &updates, true, session)
            .await
    }

    pub fn upsert_one_by_filter_blocking(
        &self,
        filter: Filter,
        updates: UpdateDefinition,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<UpdateResult> {
        block_on(self.upsert_one_by_filter(filter, updates, scope))
    }

    /// Applies `updates` and increments `increment_field` by one in a single atomic
    /// store operation, inserting a document when none matches. Returns the document
    /// as it is after the update.
    pub async fn find_one_and_update(
        &self,
        filter: Filter,
        updates: UpdateDefinition,
        increment_field: &str,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<T> {
        let collection = self.collection()?;
        let session = self.session(scope)?;
        let updates = updates.inc(increment_field, 1);
        let options = FindOneAndUpdateOptions::new()
            .upsert(true)
            .return_document(ReturnDocument::After);

        let document = collection
            .store()
            .find_one_and_update(collection.namespace(), &filter, &updates, options, session)
            .await?
            .ok_or_else(|| {
                log::error!("Upserting find_one_and_update on {} returned nothing", collection);
                DocRepoError::new(
                    "Store returned no document for an upserting find_one_and_update",
                    ErrorKind::BackendError,
                )
            })?;
        T::from_value(&Value::Document(document))
    }

    pub fn find_one_and_update_blocking(
        &self,
        filter: Filter,
        updates: UpdateDefinition,
        increment_field: &str,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<T> {
        block_on(self.find_one_and_update(filter, updates, increment_field, scope))
    }

    /// Removes the document stored under `id`. A missing document is not an error.
    pub async fn delete(&self, id: &T::Id, scope: Option<&TransactionScope>) -> DocRepoResult<()> {
        let collection = self.collection()?;
        let session = self.session(scope)?;
        collection
            .store()
            .delete_one(collection.namespace(), &id_filter(id)?, session)
            .await?;
        Ok(())
    }

    pub fn delete_blocking(&self, id: &T::Id, scope: Option<&TransactionScope>) -> DocRepoResult<()> {
        block_on(self.delete(id, scope))
    }

    pub async fn delete_many_by_ids(
        &self,
        ids: &[T::Id],
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<u64> {
        let values = ids
            .iter()
            .map(<T::Id as EntityId>::to_id_value)
            .collect::<DocRepoResult<Vec<Value>>>()?;
        self.delete_many(field(DOC_ID).in_array(values), scope).await
    }

    pub fn delete_many_by_ids_blocking(
        &self,
        ids: &[T::Id],
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<u64> {
        block_on(self.delete_many_by_ids(ids, scope))
    }

    /// Removes every matching document and returns how many were removed.
    pub async fn delete_many(
        &self,
        filter: Filter,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<u64> {
        let collection = self.collection()?;
        let session = self.session(scope)?;
        collection
            .store()
            .delete_many(collection.namespace(), &filter, session)
            .await
    }

    pub fn delete_many_blocking(
        &self,
        filter: Filter,
        scope: Option<&TransactionScope>,
    ) -> DocRepoResult<u64> {
        block_on(self.delete_many(filter, scope))
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> DocRepoResult<Vec<T>> {
        let collection = self.collection()?;
        collection
            .store()
            .aggregate(collection.namespace(), pipeline)
            .await?
            .iter()
            .map(T::from_value)
            .collect()
    }

    /// Session a mutation runs under, after checking the scope came from this store.
    fn session<'a>(
        &self,
        scope: Option<&'a TransactionScope>,
    ) -> DocRepoResult<Option<&'a SessionHandle>> {
        let scope = match scope {
            Some(scope) => scope,
            None => return Ok(None),
        };

        let origin = self.connection.origin();
        if scope.origin() != origin {
            log::error!(
                "Transaction scope from {} cannot be used with store {}",
                scope.origin(),
                origin
            );
            return Err(DocRepoError::new(
                &format!(
                    "Transaction scope belongs to {} but the repository uses {}",
                    scope.origin(),
                    origin
                ),
                ErrorKind::IncompatibleTransactionScope,
            ));
        }

        let session = scope.write_session()?;
        if session.is_none() {
            log::warn!(
                "Transaction scope on {} has not begun a transaction, running without it",
                scope.session()
            );
        }
        Ok(session)
    }
}

fn assign_id<T: Entity>(entity: &mut T) {
    if entity.id().is_unassigned() {
        if let Some(id) = T::Id::generate() {
            entity.set_id(id);
        }
    }
}

fn to_document<T: Entity>(entity: &T) -> DocRepoResult<Document> {
    match entity.to_value()? {
        Value::Document(document) => Ok(document),
        other => {
            log::error!("Entity {} mapped to {} instead of a document", T::entity_name(), other);
            Err(DocRepoError::new(
                &format!(
                    "Entity {} must map to a document, got {}",
                    T::entity_name(),
                    other.type_name()
                ),
                ErrorKind::ObjectMappingError,
            ))
        }
    }
}
