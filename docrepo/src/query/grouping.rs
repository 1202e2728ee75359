use crate::common::{Convertible, Value, GROUP_ITEMS, GROUP_KEY};
use crate::document::Document;
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};

/// Elements sharing one grouping key, in the order they were seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping<K, T> {
    pub key: K,
    pub items: Vec<T>,
}

impl<K, T> Grouping<K, T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K: Convertible, T: Convertible> Convertible for Grouping<K, T> {
    fn to_value(&self) -> DocRepoResult<Value> {
        let mut doc = Document::new();
        doc.put(GROUP_KEY, self.key.to_value()?)?;
        let items = self
            .items
            .iter()
            .map(Convertible::to_value)
            .collect::<DocRepoResult<Vec<Value>>>()?;
        doc.put(GROUP_ITEMS, Value::Array(items))?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        let doc = value.as_document().ok_or_else(|| {
            log::error!("Expected a group document, found {}", value);
            DocRepoError::new(
                &format!("Expected a group document, found {}", value.type_name()),
                ErrorKind::ObjectMappingError,
            )
        })?;
        Ok(Grouping {
            key: K::from_value(&doc.get(GROUP_KEY))?,
            items: Vec::<T>::from_value(&doc.get(GROUP_ITEMS))?,
        })
    }
}
