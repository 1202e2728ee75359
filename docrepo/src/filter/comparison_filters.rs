use std::cmp::Ordering;
use std::fmt::Display;

use crate::common::Value;
use crate::document::Document;
use crate::errors::DocRepoResult;

use super::FilterProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComparisonMode {
    Greater,
    GreaterEqual,
    Lesser,
    LesserEqual,
}

impl ComparisonMode {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonMode::Greater => ordering == Ordering::Greater,
            ComparisonMode::GreaterEqual => ordering != Ordering::Less,
            ComparisonMode::Lesser => ordering == Ordering::Less,
            ComparisonMode::LesserEqual => ordering != Ordering::Greater,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            ComparisonMode::Greater => ">",
            ComparisonMode::GreaterEqual => ">=",
            ComparisonMode::Lesser => "<",
            ComparisonMode::LesserEqual => "<=",
        }
    }
}

/// Same-type comparisons. Numbers of any width are one type, and a
/// null or a value of another type never satisfies a range.
fn comparable(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        _ if a.is_number() && b.is_number() => true,
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

pub(crate) struct ComparisonFilter {
    field_name: String,
    field_value: Value,
    mode: ComparisonMode,
}

impl ComparisonFilter {
    pub(crate) fn new(field_name: String, field_value: Value, mode: ComparisonMode) -> Self {
        ComparisonFilter {
            field_name,
            field_value,
            mode,
        }
    }

    fn test(&self, stored: &Value) -> bool {
        comparable(stored, &self.field_value) && self.mode.accepts(stored.cmp(&self.field_value))
    }
}

impl Display for ComparisonFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.field_name, self.mode.symbol(), self.field_value)
    }
}

impl FilterProvider for ComparisonFilter {
    fn apply(&self, entry: &Document) -> DocRepoResult<bool> {
        let value = entry.get(&self.field_name);
        match &value {
            Value::Array(items) => Ok(items.iter().any(|item| self.test(item))),
            _ => Ok(self.test(&value)),
        }
    }
}
