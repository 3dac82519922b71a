//! Paths of the `pb_port` items named by the generated code.

use proc_macro2::TokenStream;
use quote::quote;

/// Get the access path to the `pb_port` crate.
///
/// Crates depending on the `portbind` facade see it as `::portbind::port`.
/// Everything else, including `pb_port` itself, uses `::pb_port`.
pub(crate) fn pb_port() -> syn::Path {
    pb_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("pb_port"))
}

#[inline(always)]
pub(crate) fn macro_exports_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::__macro_exports
    }
}

#[inline(always)]
pub(crate) fn carrier_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::Carrier
    }
}

#[inline(always)]
pub(crate) fn embed_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::Embed
    }
}

#[inline(always)]
pub(crate) fn field_value_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::FieldValue
    }
}

#[inline(always)]
pub(crate) fn field_info_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::FieldInfo
    }
}

#[inline(always)]
pub(crate) fn struct_info_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::StructInfo
    }
}

#[inline(always)]
pub(crate) fn struct_info_cell_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::StructInfoCell
    }
}

#[inline(always)]
pub(crate) fn port_field_type_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::PortFieldType
    }
}

#[inline(always)]
pub(crate) fn validation_error_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::ValidationError
    }
}

#[inline(always)]
pub(crate) fn field_ref_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::FieldRef
    }
}

#[inline(always)]
pub(crate) fn field_mut_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::FieldMut
    }
}

#[inline(always)]
pub(crate) fn entity_(pb_port_path: &syn::Path) -> TokenStream {
    quote! {
        #pb_port_path::__macro_exports::Entity
    }
}
