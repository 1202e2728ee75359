use std::fmt::Debug;
use uuid::Uuid;

use crate::common::{Convertible, Value, DOC_ID};
use crate::document::ObjectId;
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::filter::{field, Filter};

/// A record type stored in its own collection and identified by a unique id.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Entity, Convertible, Debug, Clone, PartialEq)]
/// #[entity(name = "Post", id(field = "id"))]
/// pub struct Post {
///     id: String,
///     title: String,
/// }
/// ```
///
/// Uniqueness of ids within a collection is enforced by the store.
pub trait Entity: Convertible + Send + Sync + 'static {
    type Id: EntityId;

    /// Type name the default collection name is derived from.
    fn entity_name() -> &'static str;

    fn id(&self) -> &Self::Id;

    fn set_id(&mut self, id: Self::Id);
}

/// How an entity id is stored under `_id`.
pub trait EntityId: Clone + PartialEq + Debug + Send + Sync + 'static {
    fn to_id_value(&self) -> DocRepoResult<Value>;

    fn from_id_value(value: &Value) -> DocRepoResult<Self>;

    /// Whether the id still has to be assigned before insertion.
    fn is_unassigned(&self) -> bool {
        false
    }

    /// A fresh id, for types the repository can generate.
    fn generate() -> Option<Self> {
        None
    }
}

/// Matches the document stored under `id`.
pub(crate) fn id_filter<I: EntityId>(id: &I) -> DocRepoResult<Filter> {
    Ok(field(DOC_ID).eq(id.to_id_value()?))
}

fn invalid_id(value: &Value, expected: &str) -> DocRepoError {
    log::error!("Stored id {} is not {}", value, expected);
    DocRepoError::new(
        &format!("Stored id of type {} is not {}", value.type_name(), expected),
        ErrorKind::InvalidId,
    )
}

/// Kept as an object id in the store and as its hex form in the entity.
/// An empty string is unassigned.
impl EntityId for String {
    fn to_id_value(&self) -> DocRepoResult<Value> {
        Ok(Value::ObjectId(ObjectId::parse_str(self)?))
    }

    fn from_id_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::ObjectId(id) => Ok(id.to_hex()),
            Value::String(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            other => Err(invalid_id(other, "an object id")),
        }
    }

    fn is_unassigned(&self) -> bool {
        self.is_empty()
    }

    fn generate() -> Option<Self> {
        Some(ObjectId::new().to_hex())
    }
}

impl EntityId for ObjectId {
    fn to_id_value(&self) -> DocRepoResult<Value> {
        Ok(Value::ObjectId(*self))
    }

    fn from_id_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::ObjectId(id) => Ok(*id),
            Value::String(s) => ObjectId::parse_str(s),
            other => Err(invalid_id(other, "an object id")),
        }
    }

    fn generate() -> Option<Self> {
        Some(ObjectId::new())
    }
}

/// Kept as the hyphenated string. The nil uuid is unassigned.
impl EntityId for Uuid {
    fn to_id_value(&self) -> DocRepoResult<Value> {
        Ok(Value::String(self.hyphenated().to_string()))
    }

    fn from_id_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::String(s) => Uuid::parse_str(s).map_err(|e| {
                log::error!("Stored id {} is not a uuid: {}", s, e);
                DocRepoError::new(&format!("Invalid uuid {}", s), ErrorKind::InvalidId)
            }),
            Value::Null => Ok(Uuid::nil()),
            other => Err(invalid_id(other, "a uuid")),
        }
    }

    fn is_unassigned(&self) -> bool {
        self.is_nil()
    }

    fn generate() -> Option<Self> {
        Some(Uuid::new_v4())
    }
}

macro_rules! impl_entity_id_for_number {
    ($($ty:ty),*) => {
        $(
            impl EntityId for $ty {
                fn to_id_value(&self) -> DocRepoResult<Value> {
                    self.to_value()
                }

                fn from_id_value(value: &Value) -> DocRepoResult<Self> {
                    <$ty as Convertible>::from_value(value).map_err(|e| {
                        DocRepoError::new_with_cause("Invalid numeric id", ErrorKind::InvalidId, e)
                    })
                }
            }
        )*
    };
}

impl_entity_id_for_number!(i32, i64, u32);
