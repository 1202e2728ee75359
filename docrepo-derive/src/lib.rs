#![recursion_limit = "128"]
//! # Docrepo Derive Macros
//!
//! Procedural macros that implement the docrepo mapping traits for user types.
//!
//! ## Macros
//!
//! ### `Convertible`
//!
//! Derives `docrepo::common::Convertible` for structs with named fields and for
//! enums, mapping each field to a document field of the same name.
//!
//! - `#[converter(ignored = "a, b")]` leaves the listed fields out of the stored
//!   document; they read back as `Default::default()`.
//! - When the struct also carries `#[entity(id(field = "..."))]`, the id field is
//!   stored under `_id` through `docrepo::repository::EntityId`, and left out
//!   while it is still unassigned.
//!
//! ### `Entity`
//!
//! Derives `docrepo::repository::Entity` for structs with named fields.
//!
//! - `#[entity(id(field = "..."))]` names the id field (required).
//! - `#[entity(name = "...")]` overrides the entity name the default collection
//!   name is derived from. It defaults to the struct name.
//!
//! # Examples
//!
//! ```rust,ignore
//! use docrepo_derive::{Convertible, Entity};
//!
//! #[derive(Entity, Convertible, Debug, Clone, PartialEq)]
//! #[entity(name = "Post", id(field = "id"))]
//! pub struct Post {
//!     pub id: String,
//!     pub title: String,
//!     pub content: String,
//! }
//! ```

extern crate proc_macro;
mod attributes;
mod convertible;
mod entity;

use crate::convertible::{generate_convertible_for_enum, generate_convertible_for_struct};
use crate::entity::generate_entity_for_struct;
use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

/// Derives the `Convertible` trait for automatic document mapping.
///
/// # Attributes
///
/// - `#[converter(ignored = "field1, field2")]` - fields that are not stored
/// - `#[entity(id(field = "..."))]` - field stored under `_id`
///
/// # Errors
///
/// Returns a compile error if:
/// - The type is a tuple or unit struct
/// - The type is a union
/// - The named id field does not exist
#[proc_macro_derive(Convertible, attributes(converter, entity))]
pub fn derive_convertible(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    let result = match ast.data {
        Data::Struct(ref data) => generate_convertible_for_struct(&ast, data),
        Data::Enum(ref data) => generate_convertible_for_enum(&ast, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &ast,
            "Cannot derive Convertible for unions",
        )),
    };

    match result {
        Ok(token_stream) => token_stream,
        Err(e) => syn::Error::new(
            e.span(),
            format!("Failed to derive Convertible for '{}': {}", ast.ident, e),
        )
        .to_compile_error()
        .into(),
    }
}

/// Derives the `Entity` trait for repository persistence.
///
/// Must be used together with `#[derive(Convertible)]`.
///
/// # Errors
///
/// Returns a compile error if:
/// - Applied to an enum or union
/// - No `id(field = "...")` is given, or the field does not exist
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match ast.data {
        Data::Struct(ref data) => match generate_entity_for_struct(&ast, data) {
            Ok(token_stream) => token_stream,
            Err(e) => syn::Error::new(
                e.span(),
                format!(
                    "Failed to derive Entity for struct '{}': {}.\n\
                     Example: #[entity(id(field = \"id\"))] pub struct MyEntity {{ id: String }}",
                    ast.ident, e
                ),
            )
            .to_compile_error()
            .into(),
        },
        Data::Enum(_) => syn::Error::new_spanned(
            &ast,
            "Cannot derive Entity for enums. Only structs are supported.",
        )
        .to_compile_error()
        .into(),
        Data::Union(_) => syn::Error::new_spanned(
            &ast,
            "Cannot derive Entity for unions. Only structs are supported.",
        )
        .to_compile_error()
        .into(),
    }
}
