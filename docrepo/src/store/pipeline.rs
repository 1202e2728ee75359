use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;

use itertools::Itertools;

use crate::common::{SortOrder, Value, GROUP_ITEMS, GROUP_KEY};
use crate::document::Document;
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::filter::Filter;

pub type Projector = Arc<dyn Fn(Value) -> DocRepoResult<Value> + Send + Sync>;
pub type Flattener = Arc<dyn Fn(Value) -> DocRepoResult<Vec<Value>> + Send + Sync>;
pub type TypePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A sort key. An empty path sorts elements by their own value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(path: &str, order: SortOrder) -> Self {
        SortKey {
            path: path.to_string(),
            order,
        }
    }
}

/// One step of a [Pipeline].
#[derive(Clone)]
pub enum Stage {
    Match(Filter),
    Project(Projector),
    Unwind(Flattener),
    Sort(Vec<SortKey>),
    Distinct,
    /// Groups by the value at a path into `{ key, items }` documents, in first-seen order.
    Group(String),
    NarrowTo(TypePredicate),
    Skip(u64),
    Limit(u64),
    /// Replaces the stream with a single `i64` holding its length.
    Count,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Match(filter) => write!(f, "match{}", filter),
            Stage::Project(_) => write!(f, "project"),
            Stage::Unwind(_) => write!(f, "unwind"),
            Stage::Sort(keys) => write!(
                f,
                "sort({})",
                keys.iter()
                    .map(|k| format!("{} {:?}", k.path, k.order))
                    .join(", ")
            ),
            Stage::Distinct => write!(f, "distinct"),
            Stage::Group(path) => write!(f, "group({})", path),
            Stage::NarrowTo(_) => write!(f, "narrow"),
            Stage::Skip(n) => write!(f, "skip({})", n),
            Stage::Limit(n) => write!(f, "limit({})", n),
            Stage::Count => write!(f, "count"),
        }
    }
}

/// An ordered list of stages evaluated over a stream of values.
///
/// Building a pipeline never touches a store. Stores feed their documents
/// through [Pipeline::run] once a query executes.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub fn with(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub(crate) fn stages_mut(&mut self) -> &mut Vec<Stage> {
        &mut self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn run(&self, input: Vec<Value>) -> DocRepoResult<Vec<Value>> {
        let mut values = input;
        for stage in &self.stages {
            values = run_stage(stage, values)?;
        }
        Ok(values)
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.stages.iter().join(" | "))
    }
}

fn run_stage(stage: &Stage, values: Vec<Value>) -> DocRepoResult<Vec<Value>> {
    match stage {
        Stage::Match(filter) if filter.matches_everything() => Ok(values),
        Stage::Match(filter) => {
            let mut matched = Vec::with_capacity(values.len());
            for value in values {
                if filter.apply(as_document(&value)?)? {
                    matched.push(value);
                }
            }
            Ok(matched)
        }
        Stage::Project(projector) => values.into_iter().map(|v| projector(v)).collect(),
        Stage::Unwind(flattener) => {
            let mut flattened = Vec::new();
            for value in values {
                flattened.extend(flattener(value)?);
            }
            Ok(flattened)
        }
        Stage::Sort(keys) => {
            let mut keyed: Vec<(Vec<Value>, Value)> = values
                .into_iter()
                .map(|v| (keys.iter().map(|k| key_of(&v, &k.path)).collect(), v))
                .collect();
            // stable, so ties keep store order
            keyed.sort_by(|(a, _), (b, _)| {
                keys.iter()
                    .enumerate()
                    .map(|(i, key)| key.order.apply(a[i].cmp(&b[i])))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            Ok(keyed.into_iter().map(|(_, v)| v).collect())
        }
        Stage::Distinct => {
            let mut seen = HashSet::new();
            Ok(values
                .into_iter()
                .filter(|v| seen.insert(v.clone()))
                .collect())
        }
        Stage::Group(path) => {
            let mut positions: HashMap<Value, usize> = HashMap::new();
            let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
            for value in values {
                let key = key_of(&value, path);
                match positions.get(&key) {
                    Some(&index) => groups[index].1.push(value),
                    None => {
                        positions.insert(key.clone(), groups.len());
                        groups.push((key, vec![value]));
                    }
                }
            }
            groups
                .into_iter()
                .map(|(key, items)| {
                    let mut doc = Document::new();
                    doc.put(GROUP_KEY, key)?;
                    doc.put(GROUP_ITEMS, Value::Array(items))?;
                    Ok(Value::Document(doc))
                })
                .collect()
        }
        Stage::NarrowTo(predicate) => Ok(values.into_iter().filter(|v| predicate(v)).collect()),
        Stage::Skip(n) => Ok(values.into_iter().skip(*n as usize).collect()),
        Stage::Limit(n) => Ok(values.into_iter().take(*n as usize).collect()),
        Stage::Count => Ok(vec![Value::I64(values.len() as i64)]),
    }
}

fn key_of(value: &Value, path: &str) -> Value {
    if path.is_empty() {
        return value.clone();
    }
    match value {
        Value::Document(doc) => doc.get(path),
        _ => Value::Null,
    }
}

fn as_document(value: &Value) -> DocRepoResult<&Document> {
    value.as_document().ok_or_else(|| {
        log::error!("Cannot apply a field filter to non-document value {}", value);
        DocRepoError::new(
            &format!(
                "Cannot apply a field filter to a value of type {}",
                value.type_name()
            ),
            ErrorKind::FilterError,
        )
    })
}
