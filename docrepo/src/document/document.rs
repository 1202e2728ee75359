use im::OrdMap;
use itertools::Itertools;
use smallvec::SmallVec;
use std::fmt::{Debug, Display};

use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};

type FieldVec = SmallVec<[String; 8]>;

/// A schemaless record of named [Value]s.
///
/// Keys may address embedded documents with dotted paths, so `doc.get("author.name")`
/// reads the `name` field of the document stored under `author`. A numeric path segment
/// indexes into an array, any other segment applied to an array collects that field from
/// every element.
///
/// The backing map is a persistent `im::OrdMap`, which makes clones cheap. The store
/// hands out clones of stored documents freely.
#[derive(Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Associates `value` with `key`, creating embedded documents along a dotted path.
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> DocRepoResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(DocRepoError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        let value = value.into();
        if self.is_embedded(key) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_put(&splits, value)
        } else {
            self.data.insert(key.to_string(), value);
            Ok(())
        }
    }

    /// Returns the value at `key`, or `Value::Null` when nothing is stored there.
    pub fn get(&self, key: &str) -> Value {
        match self.data.get(key) {
            Some(value) => value.clone(),
            None if self.is_embedded(key) => {
                let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
                recursive_get(self.data.get(splits[0]), &splits[1..])
            }
            None => Value::Null,
        }
    }

    /// The `_id` field of the document, `Value::Null` if it has none.
    pub fn id(&self) -> Value {
        self.get(DOC_ID)
    }

    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    /// Dotted paths of every leaf field, embedded documents expanded.
    pub fn fields(&self) -> FieldVec {
        self.get_fields_internal("")
    }

    pub fn remove(&mut self, key: &str) -> DocRepoResult<()> {
        if self.is_embedded(key) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_remove(&splits)
        } else {
            self.data.remove(key);
            Ok(())
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Copies every field of `other` into this document, merging embedded documents.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            match (self.data.get(key).cloned(), value) {
                (Some(Value::Document(mut nested)), Value::Document(incoming)) => {
                    nested.merge(incoming);
                    self.data.insert(key.clone(), Value::Document(nested));
                }
                _ => {
                    self.data.insert(key.clone(), value.clone());
                }
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Whether a dotted path resolves to a stored value, nulls included.
    pub fn contains_field(&self, field: &str) -> bool {
        if self.contains_key(field) {
            return true;
        }
        self.is_embedded(field) && self.fields().iter().any(|f| f == field || f.starts_with(&format!("{}{}", field, FIELD_SEPARATOR)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub(crate) fn to_pretty_json(&self, indent: usize) -> String {
        if self.data.is_empty() {
            return "{}".to_string();
        }

        let indent_str = " ".repeat(indent + 2);
        let entries = self
            .data
            .iter()
            .map(|(key, value)| {
                format!("{}\"{}\": {}", indent_str, key, value.to_pretty_json(indent + 2))
            })
            .join(",\n");
        format!("{{\n{}\n{}}}", entries, " ".repeat(indent))
    }

    pub(crate) fn to_debug_string(&self, indent: usize) -> String {
        if self.data.is_empty() {
            return "{}".to_string();
        }

        let indent_str = " ".repeat(indent + 2);
        let entries = self
            .data
            .iter()
            .map(|(key, value)| {
                format!("{}\"{}\": {}", indent_str, key, value.to_debug_string(indent + 2))
            })
            .join(",\n");
        format!("{{\n{}\n{}}}", entries, " ".repeat(indent))
    }

    fn is_embedded(&self, key: &str) -> bool {
        key.contains(FIELD_SEPARATOR)
    }

    fn get_fields_internal(&self, prefix: &str) -> FieldVec {
        let mut fields = FieldVec::new();
        for (key, value) in self.data.iter() {
            let field = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
            };

            match value {
                Value::Document(doc) if !doc.is_empty() => {
                    fields.extend(doc.get_fields_internal(&field))
                }
                _ => fields.push(field),
            }
        }
        fields
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> DocRepoResult<()> {
        let key = splits[0];
        if key.is_empty() {
            log::error!("Document does not support empty key segment");
            return Err(DocRepoError::new(
                "Document does not support empty key segment",
                ErrorKind::InvalidOperation,
            ));
        }

        if splits.len() == 1 {
            self.data.insert(key.to_string(), value);
            return Ok(());
        }

        // anything other than an embedded document at this level is replaced
        let mut nested = match self.data.get(key) {
            Some(Value::Document(doc)) => doc.clone(),
            _ => Document::new(),
        };
        nested.deep_put(&splits[1..], value)?;
        self.data.insert(key.to_string(), Value::Document(nested));
        Ok(())
    }

    fn deep_remove(&mut self, splits: &[&str]) -> DocRepoResult<()> {
        let key = splits[0];
        if key.is_empty() {
            log::error!("Document does not support empty key segment");
            return Err(DocRepoError::new(
                "Document does not support empty key segment",
                ErrorKind::InvalidOperation,
            ));
        }

        if splits.len() == 1 {
            self.data.remove(key);
            return Ok(());
        }

        if let Some(Value::Document(doc)) = self.data.get(key) {
            let mut nested = doc.clone();
            nested.deep_remove(&splits[1..])?;
            if nested.is_empty() {
                self.data.remove(key);
            } else {
                self.data.insert(key.to_string(), Value::Document(nested));
            }
        }
        Ok(())
    }
}

fn recursive_get(value: Option<&Value>, splits: &[&str]) -> Value {
    let value = match value {
        None => return Value::Null,
        Some(v) => v,
    };

    if splits.is_empty() {
        return value.clone();
    }

    let key = splits[0];
    match value {
        Value::Document(doc) => recursive_get(doc.data.get(key), &splits[1..]),
        Value::Array(items) => match key.parse::<usize>() {
            Ok(index) => recursive_get(items.get(index), &splits[1..]),
            Err(_) => decompose(items, splits),
        },
        _ => Value::Null,
    }
}

fn decompose(items: &[Value], splits: &[&str]) -> Value {
    let mut collected = Vec::with_capacity(items.len());
    for item in items {
        match recursive_get(Some(item), splits) {
            Value::Array(values) => collected.extend(values),
            Value::Null => {}
            value => collected.push(value),
        }
    }
    Value::Array(collected.into_iter().unique().collect())
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_debug_string(0))
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_pretty_json(0))
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

#[doc(hidden)]
pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Builds a [Document] from `key: value` pairs. Nested `{}` and `[]` literals become
/// embedded documents and arrays.
///
/// ```rust
/// use docrepo::doc;
///
/// let post = doc! {
///     "title": "Hello",
///     "author": { "name": "Ann" },
///     "tags": ["rust", "db"],
/// };
/// assert_eq!(post.size(), 3);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::document::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::document::Document::new();
            $(
                doc.put(&$crate::document::normalize(stringify!($key)), $crate::doc_value!($value))
                    .expect("document literal keys are never empty");
            )*
            doc
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
