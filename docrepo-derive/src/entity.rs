use proc_macro::TokenStream;
use quote::quote;
use syn::{DataStruct, DeriveInput, Result};

use crate::attributes::parse_entity_attributes;

pub(crate) fn generate_entity_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let attributes = parse_entity_attributes(ast)?;
    let entity_name = attributes.name.unwrap_or_else(|| name.to_string());
    if entity_name.trim().is_empty() {
        return Err(syn::Error::new_spanned(ast, "Entity name cannot be empty"));
    }

    let id_field_name = attributes
        .id_field
        .ok_or_else(|| syn::Error::new_spanned(ast, "Missing #[entity(id(field = \"...\"))]"))?;

    let id_field = data
        .fields
        .iter()
        .find(|field| {
            field
                .ident
                .as_ref()
                .is_some_and(|ident| ident == &id_field_name)
        })
        .ok_or_else(|| {
            syn::Error::new_spanned(ast, format!("Field {} not found in struct", id_field_name))
        })?;

    let id_ident = &id_field.ident;
    let id_type = &id_field.ty;

    let gen = quote! {
        impl #impl_generics docrepo::repository::Entity for #name #ty_generics #where_clause {
            type Id = #id_type;

            fn entity_name() -> &'static str {
                #entity_name
            }

            fn id(&self) -> &Self::Id {
                &self.#id_ident
            }

            fn set_id(&mut self, id: Self::Id) {
                self.#id_ident = id;
            }
        }
    };

    Ok(TokenStream::from(gen))
}
