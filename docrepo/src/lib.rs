#![allow(dead_code, unused_imports)]
//! # docrepo - Generic Repositories over Document Stores
//!
//! docrepo is a data-access layer that puts CRUD, lazy querying and transactions
//! over a document store behind one reusable abstraction, so application code
//! never talks to a store's native API.
//!
//! ## Key Features
//!
//! - **Generic repositories**: one typed façade per entity type with lazily resolved collections
//! - **Lazy queries**: composable query builders that run only at a terminal call
//! - **Transaction scopes**: session-bound begin/commit/abort with abort-on-drop
//! - **Async and blocking**: every operation is async, with a blocking twin
//! - **Pluggable stores**: backends implement [store::DocumentStoreProvider]; an in-memory store is bundled
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docrepo::connection::{ConnectionOptions, DatabaseConnection};
//! use docrepo::filter::field;
//! use docrepo::repository::Repository;
//!
//! let connection = DatabaseConnection::connect(
//!     ConnectionOptions::new("memory://localhost/?replicaSet=rs0", "blog"),
//! )?;
//! let posts: Repository<Post> = Repository::new(connection.clone());
//!
//! let mut post = Post::new("Hello", "First post");
//! posts.add_one_blocking(&mut post, None)?;
//!
//! let recent = posts
//!     .query()?
//!     .where_(field("title").eq("Hello"))
//!     .order_by_descending("post_date_time")
//!     .to_list_blocking()?;
//!
//! let mut scope = connection.begin_transaction_scope()?;
//! scope.begin_transaction()?;
//! posts.delete_blocking(post.id(), Some(&scope))?;
//! scope.commit_transaction_blocking()?;
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Values, conversion traits and constants
//! - [`connection`] - Connection configuration, secrets and the shared database handle
//! - [`document`] - Documents and object ids
//! - [`errors`] - Error types and result definitions
//! - [`filter`] - Document filters
//! - [`query`] - The lazy query builder
//! - [`repository`] - Entities, pluralization and typed repositories
//! - [`store`] - The store boundary and the in-memory store
//! - [`transaction`] - Transaction scopes
//! - [`update`] - Update definitions

use crate::document::ObjectIdGenerator;
use std::sync::LazyLock;

pub mod common;
pub mod connection;
pub mod document;
pub mod errors;
pub mod filter;
pub mod query;
pub mod repository;
pub mod store;
pub mod transaction;
pub mod update;

pub(crate) static ID_GENERATOR: LazyLock<ObjectIdGenerator> = LazyLock::new(ObjectIdGenerator::new);

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    colog::init();
}
