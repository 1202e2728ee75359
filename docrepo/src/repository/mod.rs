mod binding;
mod entity;
#[cfg(test)]
pub(crate) mod fixtures;
mod pluralize;
mod repository;

pub use entity::*;
pub use pluralize::*;
pub use repository::*;
