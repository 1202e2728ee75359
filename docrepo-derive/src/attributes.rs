use syn::{DeriveInput, LitStr, Result};

/// Options read from `#[entity(...)]`.
#[derive(Default)]
pub(crate) struct EntityAttributes {
    pub(crate) name: Option<String>,
    pub(crate) id_field: Option<String>,
}

pub(crate) fn parse_entity_attributes(ast: &DeriveInput) -> Result<EntityAttributes> {
    let mut attributes = EntityAttributes::default();

    for attr in &ast.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let s: LitStr = meta.value()?.parse()?;
                    attributes.name = Some(s.value());
                    Ok(())
                } else if meta.path.is_ident("id") {
                    if attributes.id_field.is_some() {
                        return Err(meta.error("Multiple id attributes are not allowed"));
                    }
                    meta.parse_nested_meta(|meta| {
                        if meta.path.is_ident("field") {
                            let s: LitStr = meta.value()?.parse()?;
                            attributes.id_field = Some(s.value());
                            Ok(())
                        } else {
                            Err(meta.error("Unknown id attribute"))
                        }
                    })
                } else {
                    Err(meta.error("Unknown entity attribute"))
                }
            })?
        }
    }

    Ok(attributes)
}

/// Field names listed in `#[converter(ignored = "...")]`.
pub(crate) fn parse_ignored_fields(ast: &DeriveInput) -> Result<Vec<String>> {
    let mut ignored_fields: Vec<String> = vec![];

    for attr in &ast.attrs {
        if attr.path().is_ident("converter") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("ignored") {
                    let s: LitStr = meta.value()?.parse()?;
                    ignored_fields.extend(
                        s.value()
                            .split(',')
                            .map(|field| field.trim().to_string())
                            .filter(|field| !field.is_empty()),
                    );
                    Ok(())
                } else {
                    Err(meta.error("Unknown converter attribute"))
                }
            })?
        }
    }

    Ok(ignored_fields)
}
