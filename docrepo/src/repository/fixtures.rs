use crate::common::{Convertible, Value, DOC_ID};
use crate::connection::DatabaseConnection;
use crate::document::Document;
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::repository::{Entity, EntityId};
use crate::store::memory::{MemoryStore, MemoryStoreConfig};

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Note {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) tag: String,
    pub(crate) views: i64,
}

impl Note {
    pub(crate) fn new(title: &str, tag: &str, views: i64) -> Self {
        Note {
            id: String::new(),
            title: title.to_string(),
            tag: tag.to_string(),
            views,
        }
    }
}

impl Convertible for Note {
    fn to_value(&self) -> DocRepoResult<Value> {
        let mut doc = Document::new();
        if !self.id.is_unassigned() {
            doc.put(DOC_ID, self.id.to_id_value()?)?;
        }
        doc.put("title", self.title.as_str())?;
        doc.put("tag", self.tag.as_str())?;
        doc.put("views", self.views)?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        let doc = value
            .as_document()
            .ok_or_else(|| DocRepoError::new("not a note", ErrorKind::ObjectMappingError))?;
        Ok(Note {
            id: String::from_id_value(&doc.get(DOC_ID))?,
            title: String::from_value(&doc.get("title"))?,
            tag: String::from_value(&doc.get("tag"))?,
            views: i64::from_value(&doc.get("views"))?,
        })
    }
}

impl Entity for Note {
    type Id = String;

    fn entity_name() -> &'static str {
        "Note"
    }

    fn id(&self) -> &String {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

pub(crate) fn replica_connection() -> DatabaseConnection {
    DatabaseConnection::with_store(MemoryStore::new(MemoryStoreConfig::replica_set("rs0")), "test")
        .unwrap()
}

pub(crate) fn standalone_connection() -> DatabaseConnection {
    DatabaseConnection::with_store(MemoryStore::default(), "test").unwrap()
}
