use crate::document::Document;
use crate::errors::DocRepoResult;
use crate::common::Value;
use std::fmt::{Debug, Display};
use std::ops::Deref;
use std::sync::Arc;

use super::{AllFilter, AndFilter, NotFilter, OrFilter};

/// A predicate over stored documents.
///
/// Implementations are immutable and shared between threads. The query pipeline
/// and the stores evaluate them with [FilterProvider::apply].
pub trait FilterProvider: Send + Sync + Display {
    fn apply(&self, entry: &Document) -> DocRepoResult<bool>;

    /// Field equalities implied by this filter. Upserts seed new documents with them.
    fn equality_fields(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Whether this filter accepts any value, documents or not.
    fn matches_everything(&self) -> bool {
        false
    }
}

/// A cloneable handle to a [FilterProvider].
///
/// ```text
/// let recent = field("views").gte(10).and(field("title").ne("draft"));
/// ```
#[derive(Clone)]
pub struct Filter {
    inner: Arc<dyn FilterProvider>,
}

impl Filter {
    pub fn new<T: FilterProvider + 'static>(inner: T) -> Self {
        Filter {
            inner: Arc::new(inner),
        }
    }

    pub fn and(&self, filter: Filter) -> Self {
        Filter::new(AndFilter::new(vec![self.clone(), filter]))
    }

    pub fn or(&self, filter: Filter) -> Self {
        Filter::new(OrFilter::new(vec![self.clone(), filter]))
    }

    pub fn not(&self) -> Self {
        Filter::new(NotFilter::new(self.clone()))
    }
}

impl Display for Filter {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Filter{}", self.inner)
    }
}

impl Deref for Filter {
    type Target = Arc<dyn FilterProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Matches every document.
pub fn all() -> Filter {
    Filter::new(AllFilter)
}

/// Matches documents satisfying every filter. An empty list matches everything.
pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::new(AndFilter::new(filters))
}

/// Matches documents satisfying at least one filter.
pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::new(OrFilter::new(filters))
}

pub fn not(filter: Filter) -> Filter {
    Filter::new(NotFilter::new(filter))
}
