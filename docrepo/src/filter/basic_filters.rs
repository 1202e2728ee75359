use std::fmt::Display;

use itertools::Itertools;

use crate::common::Value;
use crate::document::Document;
use crate::errors::DocRepoResult;

use super::FilterProvider;

/// Equality against a stored value. A stored array matches when any element
/// matches, the way document stores treat array fields.
fn matches_value(stored: &Value, expected: &Value) -> bool {
    if stored == expected {
        return true;
    }
    match stored {
        Value::Array(items) => items.iter().any(|item| item == expected),
        _ => false,
    }
}

pub(crate) struct AllFilter;

impl FilterProvider for AllFilter {
    fn apply(&self, _entry: &Document) -> DocRepoResult<bool> {
        Ok(true)
    }

    fn matches_everything(&self) -> bool {
        true
    }
}

impl Display for AllFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(all)")
    }
}

pub(crate) struct EqualsFilter {
    field_name: String,
    field_value: Value,
}

impl EqualsFilter {
    #[inline]
    pub(crate) fn new(field_name: String, field_value: Value) -> Self {
        EqualsFilter {
            field_name,
            field_value,
        }
    }
}

impl Display for EqualsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} == {})", self.field_name, self.field_value)
    }
}

impl FilterProvider for EqualsFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> DocRepoResult<bool> {
        let value = entry.get(&self.field_name);
        Ok(matches_value(&value, &self.field_value))
    }

    fn equality_fields(&self) -> Vec<(String, Value)> {
        vec![(self.field_name.clone(), self.field_value.clone())]
    }
}

pub(crate) struct NotEqualsFilter {
    field_name: String,
    field_value: Value,
}

impl NotEqualsFilter {
    #[inline]
    pub(crate) fn new(field_name: String, field_value: Value) -> Self {
        NotEqualsFilter {
            field_name,
            field_value,
        }
    }
}

impl Display for NotEqualsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} != {})", self.field_name, self.field_value)
    }
}

impl FilterProvider for NotEqualsFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> DocRepoResult<bool> {
        let value = entry.get(&self.field_name);
        Ok(!matches_value(&value, &self.field_value))
    }
}

pub(crate) struct InFilter {
    field_name: String,
    values: Vec<Value>,
}

impl InFilter {
    pub(crate) fn new(field_name: String, values: Vec<Value>) -> Self {
        InFilter { field_name, values }
    }
}

impl Display for InFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({} in [{}])",
            self.field_name,
            self.values.iter().map(|v| v.to_string()).join(", ")
        )
    }
}

impl FilterProvider for InFilter {
    fn apply(&self, entry: &Document) -> DocRepoResult<bool> {
        let value = entry.get(&self.field_name);
        Ok(self.values.iter().any(|v| matches_value(&value, v)))
    }
}

pub(crate) struct NotInFilter {
    field_name: String,
    values: Vec<Value>,
}

impl NotInFilter {
    pub(crate) fn new(field_name: String, values: Vec<Value>) -> Self {
        NotInFilter { field_name, values }
    }
}

impl Display for NotInFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({} not in [{}])",
            self.field_name,
            self.values.iter().map(|v| v.to_string()).join(", ")
        )
    }
}

impl FilterProvider for NotInFilter {
    fn apply(&self, entry: &Document) -> DocRepoResult<bool> {
        let value = entry.get(&self.field_name);
        Ok(!self.values.iter().any(|v| matches_value(&value, v)))
    }
}

pub(crate) struct ExistsFilter {
    field_name: String,
    exists: bool,
}

impl ExistsFilter {
    pub(crate) fn new(field_name: String, exists: bool) -> Self {
        ExistsFilter { field_name, exists }
    }
}

impl Display for ExistsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} exists {})", self.field_name, self.exists)
    }
}

impl FilterProvider for ExistsFilter {
    fn apply(&self, entry: &Document) -> DocRepoResult<bool> {
        Ok(entry.contains_field(&self.field_name) == self.exists)
    }
}
