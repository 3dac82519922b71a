//! Parses the derive input into [`CarrierStruct`].

use syn::meta::ParseNestedMeta;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Path, Type};

use crate::PORT_ATTRIBUTE_NAME;

// -----------------------------------------------------------------------------
// CarrierStruct

/// A struct deriving `Carrier`.
pub(crate) struct CarrierStruct<'a> {
    pub ident: &'a Ident,
    pub fields: Vec<CarrierField<'a>>,
    pub validate: Option<Path>,
    pub pb_port_path: Path,
}

/// One named field and its `#[port(...)]` entries.
pub(crate) struct CarrierField<'a> {
    pub ident: &'a Ident,
    pub index: usize,
    pub ty: &'a Type,
    pub tags: Vec<(String, String)>,
    pub flatten: bool,
}

impl<'a> CarrierStruct<'a> {
    pub fn from_derive_input(ast: &'a DeriveInput) -> syn::Result<Self> {
        if !ast.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &ast.generics,
                "`Carrier` cannot be derived for generic structs",
            ));
        }

        let named = match &ast.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named,
                Fields::Unnamed(_) | Fields::Unit => {
                    return Err(syn::Error::new_spanned(
                        &ast.ident,
                        "`Carrier` can only be derived for structs with named fields",
                    ));
                }
            },
            Data::Enum(_) | Data::Union(_) => {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    "`Carrier` can only be derived for structs",
                ));
            }
        };

        let mut validate = None;
        for attr in ast.attrs.iter().filter(|attr| attr.path().is_ident(PORT_ATTRIBUTE_NAME)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("validate") {
                    validate = Some(meta.value()?.parse::<Path>()?);
                    Ok(())
                } else {
                    Err(meta.error("unsupported struct attribute, expected `validate = path`"))
                }
            })?;
        }

        let fields = named
            .named
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let mut parsed = CarrierField {
                    // Named fields always carry an ident.
                    ident: field.ident.as_ref().ok_or_else(|| syn::Error::new_spanned(field, "unnamed field"))?,
                    index,
                    ty: &field.ty,
                    tags: Vec::new(),
                    flatten: false,
                };
                for attr in field.attrs.iter().filter(|attr| attr.path().is_ident(PORT_ATTRIBUTE_NAME)) {
                    attr.parse_nested_meta(|meta| parsed.parse_entry(meta))?;
                }
                if parsed.flatten && !parsed.tags.is_empty() {
                    return Err(syn::Error::new_spanned(
                        field,
                        "flattened fields cannot carry port annotations",
                    ));
                }
                Ok(parsed)
            })
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(Self {
            ident: &ast.ident,
            fields,
            validate,
            pb_port_path: crate::path::pb_port(),
        })
    }
}

impl CarrierField<'_> {
    /// `flatten`, `key` or `key = "value"`.
    fn parse_entry(&mut self, meta: ParseNestedMeta<'_>) -> syn::Result<()> {
        let Some(key) = meta.path.segments.first().filter(|_| meta.path.segments.len() == 1) else {
            return Err(meta.error("expected a single identifier"));
        };
        let key = key.ident.to_string();

        if key == "flatten" {
            self.flatten = true;
            return Ok(());
        }

        let value = if meta.input.peek(syn::Token![=]) {
            meta.value()?.parse::<LitStr>()?.value()
        } else {
            String::from("true")
        };
        self.tags.push((key, value));
        Ok(())
    }
}
