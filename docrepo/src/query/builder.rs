use futures::executor::block_on;
use std::marker::PhantomData;
use std::sync::Arc;

use super::Grouping;
use crate::common::{Convertible, SortOrder, Value};
use crate::connection::Collection;
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::filter::Filter;
use crate::store::{DocumentStore, Namespace, Pipeline, SortKey, Stage};

/// A lazily evaluated query over one collection.
///
/// Composition only records stages, it never reaches the store. Each terminal
/// operation (`to_list`, `first_or_default`, `any`, `long_count`, `sum_i64`,
/// `sum_f64`) runs the recorded pipeline once. Terminals borrow the builder, so one
/// builder can be executed any number of times.
///
/// Element-type changing operations (`select`, `select_many`, `group_by`, `of_type`)
/// consume the builder and return a new one over the new element type.
///
/// # Examples
///
/// ```rust,ignore
/// let titles = posts
///     .query()?
///     .where_(field("views").gt(10))
///     .order_by_descending("views")
///     .then_by("title")?
///     .take(5)
///     .select(|post: Post| post.title)
///     .to_list()
///     .await?;
/// ```
pub struct QueryBuilder<T> {
    namespace: Namespace,
    store: DocumentStore,
    pipeline: Pipeline,
    // index of the sort stage then_by extends
    ordering: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for QueryBuilder<T> {
    fn clone(&self) -> Self {
        QueryBuilder {
            namespace: self.namespace.clone(),
            store: self.store.clone(),
            pipeline: self.pipeline.clone(),
            ordering: self.ordering,
            _marker: PhantomData,
        }
    }
}

impl<T> QueryBuilder<T> {
    pub(crate) fn new<E>(collection: &Collection<E>) -> Self {
        QueryBuilder {
            namespace: collection.namespace().clone(),
            store: collection.store().clone(),
            pipeline: Pipeline::new(),
            ordering: None,
            _marker: PhantomData,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Keeps elements matching `filter`. Consecutive calls are combined with AND.
    pub fn where_(mut self, filter: Filter) -> Self {
        self.ordering = None;
        match self.pipeline.stages_mut().last_mut() {
            Some(Stage::Match(existing)) => *existing = existing.and(filter),
            _ => self.pipeline.push(Stage::Match(filter)),
        }
        self
    }

    pub fn order_by(self, path: &str) -> Self {
        self.sort(path, SortOrder::Ascending)
    }

    pub fn order_by_descending(self, path: &str) -> Self {
        self.sort(path, SortOrder::Descending)
    }

    /// Adds a secondary key. Fails with `OrderingRequired` unless the previous call
    /// was an ordering call.
    pub fn then_by(self, path: &str) -> DocRepoResult<Self> {
        self.then_sort(path, SortOrder::Ascending)
    }

    pub fn then_by_descending(self, path: &str) -> DocRepoResult<Self> {
        self.then_sort(path, SortOrder::Descending)
    }

    pub fn distinct(self) -> Self {
        self.with_stage(Stage::Distinct)
    }

    pub fn skip(self, n: u64) -> Self {
        self.with_stage(Stage::Skip(n))
    }

    pub fn take(self, n: u64) -> Self {
        self.with_stage(Stage::Limit(n))
    }

    fn sort(mut self, path: &str, order: SortOrder) -> Self {
        self.pipeline.push(Stage::Sort(vec![SortKey::new(path, order)]));
        self.ordering = Some(self.pipeline.len() - 1);
        self
    }

    fn then_sort(mut self, path: &str, order: SortOrder) -> DocRepoResult<Self> {
        let index = match self.ordering {
            Some(index) => index,
            None => {
                log::error!("then_by on {} without a preceding order_by", self.namespace);
                return Err(DocRepoError::new(
                    "then_by requires a preceding order_by or order_by_descending",
                    ErrorKind::OrderingRequired,
                ));
            }
        };
        if let Some(Stage::Sort(keys)) = self.pipeline.stages_mut().get_mut(index) {
            keys.push(SortKey::new(path, order));
        }
        Ok(self)
    }

    fn with_stage(mut self, stage: Stage) -> Self {
        self.pipeline.push(stage);
        self.ordering = None;
        self
    }

    fn into_builder<R>(mut self, stage: Stage) -> QueryBuilder<R> {
        self.pipeline.push(stage);
        QueryBuilder {
            namespace: self.namespace,
            store: self.store,
            pipeline: self.pipeline,
            ordering: None,
            _marker: PhantomData,
        }
    }

    async fn execute(&self, pipeline: &Pipeline) -> DocRepoResult<Vec<Value>> {
        log::debug!("Executing {} on {}", pipeline, self.namespace);
        self.store.aggregate(&self.namespace, pipeline).await
    }
}

impl<T: Convertible + 'static> QueryBuilder<T> {
    pub fn select<R, F>(self, projection: F) -> QueryBuilder<R>
    where
        R: Convertible + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let projector = Arc::new(move |value: Value| -> DocRepoResult<Value> {
            projection(T::from_value(&value)?).to_value()
        });
        self.into_builder(Stage::Project(projector))
    }

    /// Projects each element to many and flattens the result.
    pub fn select_many<R, F>(self, projection: F) -> QueryBuilder<R>
    where
        R: Convertible + 'static,
        F: Fn(T) -> Vec<R> + Send + Sync + 'static,
    {
        let flattener = Arc::new(move |value: Value| -> DocRepoResult<Vec<Value>> {
            projection(T::from_value(&value)?)
                .iter()
                .map(Convertible::to_value)
                .collect::<DocRepoResult<Vec<Value>>>()
        });
        self.into_builder(Stage::Unwind(flattener))
    }

    /// Pairs each element with every item `collection_selector` yields for it.
    pub fn select_many_with<C, R, FC, FR>(
        self,
        collection_selector: FC,
        result_selector: FR,
    ) -> QueryBuilder<R>
    where
        R: Convertible + 'static,
        FC: Fn(&T) -> Vec<C> + Send + Sync + 'static,
        FR: Fn(&T, C) -> R + Send + Sync + 'static,
    {
        let flattener = Arc::new(move |value: Value| -> DocRepoResult<Vec<Value>> {
            let element = T::from_value(&value)?;
            collection_selector(&element)
                .into_iter()
                .map(|item| result_selector(&element, item).to_value())
                .collect::<DocRepoResult<Vec<Value>>>()
        });
        self.into_builder(Stage::Unwind(flattener))
    }

    /// Groups elements by the value at `key_path`, in first-seen order.
    pub fn group_by<K: Convertible + 'static>(self, key_path: &str) -> QueryBuilder<Grouping<K, T>> {
        self.into_builder(Stage::Group(key_path.to_string()))
    }

    /// Keeps only the elements that decode as `R`.
    pub fn of_type<R: Convertible + 'static>(self) -> QueryBuilder<R> {
        let predicate = Arc::new(|value: &Value| R::from_value(value).is_ok());
        self.into_builder(Stage::NarrowTo(predicate))
    }

    pub async fn to_list(&self) -> DocRepoResult<Vec<T>> {
        self.execute(&self.pipeline)
            .await?
            .iter()
            .map(T::from_value)
            .collect()
    }

    pub fn to_list_blocking(&self) -> DocRepoResult<Vec<T>> {
        block_on(self.to_list())
    }

    pub async fn first_or_default(&self) -> DocRepoResult<Option<T>> {
        let pipeline = self.pipeline.clone().with(Stage::Limit(1));
        match self.execute(&pipeline).await?.first() {
            Some(value) => Ok(Some(T::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn first_or_default_blocking(&self) -> DocRepoResult<Option<T>> {
        block_on(self.first_or_default())
    }

    /// Whether any element matches `predicate`. Pass `all()` to test for any element.
    pub async fn any(&self, predicate: Filter) -> DocRepoResult<bool> {
        let pipeline = self
            .pipeline
            .clone()
            .with(Stage::Match(predicate))
            .with(Stage::Limit(1));
        Ok(!self.execute(&pipeline).await?.is_empty())
    }

    pub fn any_blocking(&self, predicate: Filter) -> DocRepoResult<bool> {
        block_on(self.any(predicate))
    }

    pub async fn long_count(&self) -> DocRepoResult<u64> {
        let pipeline = self.pipeline.clone().with(Stage::Count);
        let count = self
            .execute(&pipeline)
            .await?
            .first()
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count as u64)
    }

    pub fn long_count_blocking(&self) -> DocRepoResult<u64> {
        block_on(self.long_count())
    }

    /// Sums the integers at `path`, or the elements themselves when `path` is empty.
    /// Nulls are skipped. Overflow fails with `InvalidOperation`.
    pub async fn sum_i64(&self, path: &str) -> DocRepoResult<i64> {
        let mut sum: i64 = 0;
        for value in self.execute(&self.pipeline).await? {
            let operand = value_at(&value, path);
            if operand.is_null() {
                continue;
            }
            let number = match operand.as_i64() {
                Some(number) if operand.is_integer() => number,
                _ => return Err(not_summable(&operand, path, "integer")),
            };
            sum = sum.checked_add(number).ok_or_else(|| {
                log::error!("Sum over {} overflows i64", path);
                DocRepoError::new(
                    &format!("Sum over {} overflows a 64-bit integer", path),
                    ErrorKind::InvalidOperation,
                )
            })?;
        }
        Ok(sum)
    }

    pub fn sum_i64_blocking(&self, path: &str) -> DocRepoResult<i64> {
        block_on(self.sum_i64(path))
    }

    /// Sums the numbers at `path` as floating point. Nulls are skipped.
    pub async fn sum_f64(&self, path: &str) -> DocRepoResult<f64> {
        let mut sum = 0.0;
        for value in self.execute(&self.pipeline).await? {
            let operand = value_at(&value, path);
            if operand.is_null() {
                continue;
            }
            match operand.as_f64() {
                Some(number) if operand.is_number() => sum += number,
                _ => return Err(not_summable(&operand, path, "numeric")),
            }
        }
        Ok(sum)
    }

    pub fn sum_f64_blocking(&self, path: &str) -> DocRepoResult<f64> {
        block_on(self.sum_f64(path))
    }
}

fn value_at(value: &Value, path: &str) -> Value {
    match value {
        _ if path.is_empty() => value.clone(),
        Value::Document(doc) => doc.get(path),
        _ => Value::Null,
    }
}

fn not_summable(value: &Value, path: &str, expected: &str) -> DocRepoError {
    log::error!("Cannot sum {} at {}, expected {}", value, path, expected);
    DocRepoError::new(
        &format!(
            "Cannot sum a value of type {} at {}, expected {}",
            value.type_name(),
            path,
            expected
        ),
        ErrorKind::InvalidOperation,
    )
}
