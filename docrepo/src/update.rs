use std::fmt::Display;

use itertools::Itertools;

use crate::common::{Value, DOC_ID};
use crate::document::Document;
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};

/// One field change inside an [UpdateDefinition].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    Set(String, Value),
    Unset(String),
    Inc(String, i64),
}

impl Display for UpdateOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOperation::Set(path, value) => write!(f, "set {} = {}", path, value),
            UpdateOperation::Unset(path) => write!(f, "unset {}", path),
            UpdateOperation::Inc(path, by) => write!(f, "inc {} by {}", path, by),
        }
    }
}

/// An ordered batch of field changes with independently typed values.
///
/// ```text
/// let update = UpdateDefinition::new()
///     .set("title", "Edited")
///     .set("views", 3)
///     .inc("revision", 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDefinition {
    operations: Vec<UpdateOperation>,
}

impl UpdateDefinition {
    pub fn new() -> Self {
        UpdateDefinition::default()
    }

    /// Builds a definition that sets each `(path, value)` pair.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        UpdateDefinition {
            operations: pairs
                .into_iter()
                .map(|(path, value)| UpdateOperation::Set(path.into(), value))
                .collect(),
        }
    }

    pub fn set<V: Into<Value>>(mut self, path: &str, value: V) -> Self {
        self.operations
            .push(UpdateOperation::Set(path.to_string(), value.into()));
        self
    }

    pub fn unset(mut self, path: &str) -> Self {
        self.operations.push(UpdateOperation::Unset(path.to_string()));
        self
    }

    pub fn inc(mut self, path: &str, by: i64) -> Self {
        self.operations.push(UpdateOperation::Inc(path.to_string(), by));
        self
    }

    /// Appends every operation of `other` after the ones already present.
    pub fn combine(mut self, other: UpdateDefinition) -> Self {
        self.operations.extend(other.operations);
        self
    }

    pub fn operations(&self) -> &[UpdateOperation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Applies the operations in order, returning the changed document.
    pub fn apply_to(&self, document: &Document) -> DocRepoResult<Document> {
        let mut updated = document.clone();
        for operation in &self.operations {
            match operation {
                UpdateOperation::Set(path, value) => {
                    check_not_id(path, document, value)?;
                    updated.put(path, value.clone())?
                }
                UpdateOperation::Unset(path) => {
                    check_not_id(path, document, &Value::Null)?;
                    updated.remove(path)?
                }
                UpdateOperation::Inc(path, by) => {
                    let next = increment(&updated.get(path), *by, path)?;
                    updated.put(path, next)?
                }
            }
        }
        Ok(updated)
    }
}

fn check_not_id(path: &str, document: &Document, value: &Value) -> DocRepoResult<()> {
    if path == DOC_ID && document.has_id() && &document.id() != value {
        log::error!("Update attempted to change the immutable field {}", DOC_ID);
        return Err(DocRepoError::new(
            &format!("Field {} is immutable", DOC_ID),
            ErrorKind::InvalidOperation,
        ));
    }
    Ok(())
}

fn increment(current: &Value, by: i64, path: &str) -> DocRepoResult<Value> {
    let overflow = || {
        log::error!("Increment of {} by {} overflows", path, by);
        DocRepoError::new(
            &format!("Increment of {} by {} overflows", path, by),
            ErrorKind::InvalidOperation,
        )
    };

    match current {
        Value::Null => Ok(Value::I64(by)),
        Value::I32(v) => match i32::try_from(by).ok().and_then(|by| v.checked_add(by)) {
            Some(next) => Ok(Value::I32(next)),
            None => (*v as i64).checked_add(by).map(Value::I64).ok_or_else(overflow),
        },
        Value::I64(v) => v.checked_add(by).map(Value::I64).ok_or_else(overflow),
        Value::F64(v) => Ok(Value::F64(v + by as f64)),
        other => {
            log::error!("Cannot increment non-numeric field {} holding {}", path, other);
            Err(DocRepoError::new(
                &format!(
                    "Cannot increment field {} of type {}",
                    path,
                    other.type_name()
                ),
                ErrorKind::InvalidOperation,
            ))
        }
    }
}

impl Display for UpdateDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.operations.iter().join(", "))
    }
}
