use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use syn::{DataEnum, DataStruct, DeriveInput, Field, Result, Type};

use crate::attributes::{parse_entity_attributes, parse_ignored_fields};

pub(crate) fn generate_convertible_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let ignored_fields = parse_ignored_fields(ast)?;
    let id_field = parse_entity_attributes(ast)?.id_field;

    let fields: Vec<&Field> = match &data.fields {
        syn::Fields::Named(ref fields) => fields.named.iter().collect(),
        _ => {
            return Err(syn::Error::new_spanned(
                ast,
                "Only structs with named fields are supported",
            ))
        }
    };

    let id_ident = match &id_field {
        Some(id_name) => Some(
            fields
                .iter()
                .filter_map(|f| f.ident.as_ref())
                .find(|ident| *ident == id_name)
                .ok_or_else(|| {
                    syn::Error::new_spanned(ast, format!("Field {} not found in struct", id_name))
                })?,
        ),
        None => None,
    };

    // The id travels under `_id`, every other stored field under its own name.
    let stored_fields: Vec<&Field> = fields
        .iter()
        .filter(|f| {
            f.ident.as_ref().is_some_and(|ident| {
                let name = ident.to_string();
                !ignored_fields.contains(&name) && Some(&name) != id_field.as_ref()
            })
        })
        .copied()
        .collect();

    let stored_idents: Vec<&Ident> = stored_fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .collect();

    let stored_names: Vec<String> = stored_idents.iter().map(|i| i.to_string()).collect();

    let put_id = match id_ident {
        Some(ident) => quote! {
            if !docrepo::repository::EntityId::is_unassigned(&self.#ident) {
                doc.put(
                    docrepo::common::DOC_ID,
                    docrepo::repository::EntityId::to_id_value(&self.#ident)?,
                )?;
            }
        },
        None => quote! {},
    };

    let initializers: Vec<proc_macro2::TokenStream> = fields
        .iter()
        .filter_map(|f| f.ident.as_ref().map(|ident| (ident, &f.ty)))
        .map(|(ident, ty)| {
            let name = ident.to_string();
            if ignored_fields.contains(&name) {
                quote! { #ident: Default::default() }
            } else if Some(&name) == id_field.as_ref() {
                quote! {
                    #ident: <#ty as docrepo::repository::EntityId>::from_id_value(
                        &doc.get(docrepo::common::DOC_ID),
                    )?
                }
            } else {
                quote! {
                    #ident: <#ty as docrepo::common::Convertible>::from_value(&doc.get(#name))?
                }
            }
        })
        .collect();

    let name = &ast.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let gen = quote! {
        impl #impl_generics docrepo::common::Convertible for #name #ty_generics #where_clause {
            fn to_value(&self) -> docrepo::errors::DocRepoResult<docrepo::common::Value> {
                let mut doc = docrepo::document::Document::new();
                #put_id
                #(doc.put(#stored_names, docrepo::common::Convertible::to_value(&self.#stored_idents)?)?;)*
                Ok(docrepo::common::Value::Document(doc))
            }

            fn from_value(value: &docrepo::common::Value) -> docrepo::errors::DocRepoResult<Self> {
                match value {
                    docrepo::common::Value::Document(doc) => Ok(#name {
                        #(#initializers,)*
                    }),
                    _ => Err(docrepo::errors::DocRepoError::new(
                        &format!("Value of type {} is not a {}", value.type_name(), #type_name),
                        docrepo::errors::ErrorKind::ObjectMappingError,
                    )),
                }
            }
        }
    };

    Ok(TokenStream::from(gen))
}

/// Each variant is stored as `{ variant: "<Name>", value: <payload> }`.
pub(crate) fn generate_convertible_for_enum(ast: &DeriveInput, data: &DataEnum) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let ignored_fields = parse_ignored_fields(ast)?;

    let variant_count = data.variants.len();
    let mut to_value_variants = Vec::with_capacity(variant_count);
    let mut from_value_variants = Vec::with_capacity(variant_count);

    for variant in &data.variants {
        let variant_ident = &variant.ident;
        let variant_name = variant_ident.to_string();

        match &variant.fields {
            syn::Fields::Named(fields) => {
                let all_idents: Vec<&Ident> = fields
                    .named
                    .iter()
                    .filter_map(|f| f.ident.as_ref())
                    .collect();

                let stored_idents: Vec<&Ident> = all_idents
                    .iter()
                    .filter(|ident| !ignored_fields.contains(&ident.to_string()))
                    .copied()
                    .collect();
                let stored_names: Vec<String> =
                    stored_idents.iter().map(|i| i.to_string()).collect();

                to_value_variants.push(quote! {
                    #name::#variant_ident { #(ref #all_idents),* } => {
                        let mut payload = docrepo::document::Document::new();
                        #(payload.put(#stored_names, docrepo::common::Convertible::to_value(#stored_idents)?)?;)*
                        let mut doc = docrepo::document::Document::new();
                        doc.put("variant", #variant_name)?;
                        doc.put("value", docrepo::common::Value::Document(payload))?;
                        Ok(docrepo::common::Value::Document(doc))
                    }
                });

                let initializers: Vec<proc_macro2::TokenStream> = fields
                    .named
                    .iter()
                    .filter_map(|f| f.ident.as_ref().map(|ident| (ident, &f.ty)))
                    .map(|(ident, ty)| {
                        let field_name = ident.to_string();
                        if ignored_fields.contains(&field_name) {
                            quote! { #ident: Default::default() }
                        } else {
                            quote! {
                                #ident: <#ty as docrepo::common::Convertible>::from_value(&payload.get(#field_name))?
                            }
                        }
                    })
                    .collect();

                from_value_variants.push(quote! {
                    Some(#variant_name) => {
                        let payload = doc.get("value");
                        let payload = payload.as_document().ok_or_else(|| {
                            docrepo::errors::DocRepoError::new(
                                "Enum variant payload is not a document",
                                docrepo::errors::ErrorKind::ObjectMappingError,
                            )
                        })?;
                        Ok(#name::#variant_ident {
                            #(#initializers,)*
                        })
                    }
                });
            }
            syn::Fields::Unnamed(fields) => {
                let field_count = fields.unnamed.len();
                let field_idents: Vec<Ident> = (0..field_count)
                    .map(|i| Ident::new(&format!("field_{}", i), Span::call_site()))
                    .collect();

                to_value_variants.push(quote! {
                    #name::#variant_ident(#(#field_idents),*) => {
                        let mut array = Vec::with_capacity(#field_count);
                        #(array.push(docrepo::common::Convertible::to_value(#field_idents)?);)*
                        let mut doc = docrepo::document::Document::new();
                        doc.put("variant", #variant_name)?;
                        doc.put("value", docrepo::common::Value::Array(array))?;
                        Ok(docrepo::common::Value::Document(doc))
                    }
                });

                let field_indices: Vec<usize> = (0..field_count).collect();
                let field_types: Vec<&Type> = fields.unnamed.iter().map(|f| &f.ty).collect();

                from_value_variants.push(quote! {
                    Some(#variant_name) => {
                        let payload = doc.get("value");
                        let payload = match payload.as_array() {
                            Some(items) if items.len() == #field_count => items,
                            _ => {
                                return Err(docrepo::errors::DocRepoError::new(
                                    "Enum variant payload is not an array of the expected length",
                                    docrepo::errors::ErrorKind::ObjectMappingError,
                                ))
                            }
                        };
                        Ok(#name::#variant_ident(
                            #(<#field_types as docrepo::common::Convertible>::from_value(&payload[#field_indices])?,)*
                        ))
                    }
                });
            }
            syn::Fields::Unit => {
                to_value_variants.push(quote! {
                    #name::#variant_ident => {
                        let mut doc = docrepo::document::Document::new();
                        doc.put("variant", #variant_name)?;
                        doc.put("value", docrepo::common::Value::Null)?;
                        Ok(docrepo::common::Value::Document(doc))
                    }
                });

                from_value_variants.push(quote! {
                    Some(#variant_name) => Ok(#name::#variant_ident)
                });
            }
        }
    }

    let gen = quote! {
        impl #impl_generics docrepo::common::Convertible for #name #ty_generics #where_clause {
            fn to_value(&self) -> docrepo::errors::DocRepoResult<docrepo::common::Value> {
                match self {
                    #(#to_value_variants),*
                }
            }

            fn from_value(value: &docrepo::common::Value) -> docrepo::errors::DocRepoResult<Self> {
                let doc = value.as_document().ok_or_else(|| {
                    docrepo::errors::DocRepoError::new(
                        "Value is not a document",
                        docrepo::errors::ErrorKind::ObjectMappingError,
                    )
                })?;
                match doc.get("variant").as_string().map(|s| s.as_str()) {
                    #(#from_value_variants,)*
                    _ => Err(docrepo::errors::DocRepoError::new(
                        "Value is not a valid enum variant",
                        docrepo::errors::ErrorKind::ObjectMappingError,
                    )),
                }
            }
        }
    };

    Ok(TokenStream::from(gen))
}
