use parking_lot::RwLock;

use super::{Entity, Pluralizer};
use crate::connection::{Collection, DatabaseConnection};
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};

enum BindingState<T> {
    /// Name still configurable. `None` means the default name.
    Configured(Option<String>),
    /// Handle resolved. The name is fixed from here on.
    Bound(Collection<T>),
}

/// Collection name and handle of one repository.
///
/// Starts `Configured` and moves to `Bound` exactly once, under the write lock,
/// the first time an operation needs the collection.
pub(crate) struct CollectionBinding<T> {
    state: RwLock<BindingState<T>>,
}

impl<T: Entity> CollectionBinding<T> {
    pub(crate) fn new() -> Self {
        CollectionBinding {
            state: RwLock::new(BindingState::Configured(None)),
        }
    }

    pub(crate) fn name(&self, pluralizer: &dyn Pluralizer) -> String {
        match &*self.state.read() {
            BindingState::Configured(Some(name)) => name.clone(),
            BindingState::Configured(None) => default_collection_name::<T>(pluralizer),
            BindingState::Bound(collection) => collection.name().to_string(),
        }
    }

    pub(crate) fn set_name(&self, name: &str) -> DocRepoResult<()> {
        if name.trim().is_empty() {
            log::error!("Collection name cannot be empty");
            return Err(DocRepoError::new(
                "Collection name cannot be empty",
                ErrorKind::InvalidOperation,
            ));
        }

        let mut state = self.state.write();
        match &*state {
            BindingState::Bound(collection) => {
                log::error!(
                    "Cannot rename collection {} of {} after it was resolved",
                    collection,
                    T::entity_name()
                );
                Err(DocRepoError::new(
                    &format!(
                        "Collection {} is already resolved and cannot be renamed to {}",
                        collection.name(),
                        name
                    ),
                    ErrorKind::CollectionAlreadyResolved,
                ))
            }
            BindingState::Configured(_) => {
                *state = BindingState::Configured(Some(name.to_string()));
                Ok(())
            }
        }
    }

    pub(crate) fn is_bound(&self) -> bool {
        matches!(&*self.state.read(), BindingState::Bound(_))
    }

    pub(crate) fn resolve(
        &self,
        connection: &DatabaseConnection,
        pluralizer: &dyn Pluralizer,
    ) -> DocRepoResult<Collection<T>> {
        if let BindingState::Bound(collection) = &*self.state.read() {
            return Ok(collection.clone());
        }

        let mut state = self.state.write();
        let name = match &*state {
            BindingState::Bound(collection) => return Ok(collection.clone()),
            BindingState::Configured(Some(name)) => name.clone(),
            BindingState::Configured(None) => default_collection_name::<T>(pluralizer),
        };
        let collection = connection.collection::<T>(&name)?;
        log::debug!("Bound {} to collection {}", T::entity_name(), collection);
        *state = BindingState::Bound(collection.clone());
        Ok(collection)
    }
}

/// Pluralized entity name with a lower-case first letter.
pub(crate) fn default_collection_name<T: Entity>(pluralizer: &dyn Pluralizer) -> String {
    let plural = pluralizer.pluralize(T::entity_name());
    let mut chars = plural.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => plural,
    }
}
