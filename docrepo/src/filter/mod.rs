//! Predicates over stored documents.
//!
//! Filters are built fluently with [field] and combined with [and], [or] and [not]
//! or the matching methods on [Filter].

mod filter;
mod fluent;

mod basic_filters;
mod comparison_filters;
mod logical_filters;
mod pattern_filters;

pub(crate) use basic_filters::*;
pub(crate) use comparison_filters::*;
pub(crate) use logical_filters::*;
pub(crate) use pattern_filters::*;
pub use filter::*;
pub use fluent::*;
