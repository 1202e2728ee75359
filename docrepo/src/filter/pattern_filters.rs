use std::fmt::Display;

use regex::Regex;

use crate::common::Value;
use crate::document::Document;
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};

use super::FilterProvider;

pub(crate) struct RegexFilter {
    field_name: String,
    pattern: Regex,
}

impl RegexFilter {
    pub(crate) fn new(field_name: String, pattern: &str) -> DocRepoResult<Self> {
        let pattern = Regex::new(pattern).map_err(|err| {
            log::error!("Invalid regex pattern '{}': {}", pattern, err);
            DocRepoError::new(
                &format!("Invalid regex pattern '{}': {}", pattern, err),
                ErrorKind::FilterError,
            )
        })?;
        Ok(RegexFilter {
            field_name,
            pattern,
        })
    }
}

impl Display for RegexFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} =~ /{}/)", self.field_name, self.pattern.as_str())
    }
}

impl FilterProvider for RegexFilter {
    fn apply(&self, entry: &Document) -> DocRepoResult<bool> {
        match entry.get(&self.field_name) {
            Value::String(s) => Ok(self.pattern.is_match(&s)),
            Value::Array(items) => Ok(items
                .iter()
                .filter_map(Value::as_string)
                .any(|s| self.pattern.is_match(s))),
            _ => Ok(false),
        }
    }
}
