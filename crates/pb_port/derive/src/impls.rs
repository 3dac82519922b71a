//! Generates the `Carrier`, `FieldValue` and `Embed` impls.

use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::{CarrierField, CarrierStruct};

/// Implement `Carrier`, `FieldValue` and `Embed` inside an anonymous const.
pub(crate) fn impl_carrier(info: &CarrierStruct) -> TokenStream {
    let carrier_tokens = impl_trait_carrier(info);
    let field_value_tokens = impl_trait_field_value(info);
    let embed_tokens = impl_trait_embed(info);

    let macro_exports_ = crate::path::macro_exports_(&info.pb_port_path);

    quote! {
        const _: () = {
            #[allow(unused_imports)]
            use #macro_exports_::{
                Probe, ViaDefault as _, ViaEntity as _, ViaFieldValue as _, ViaNoDefault as _,
                ViaNoEntity as _, ViaUnknown as _,
            };

            #carrier_tokens

            #field_value_tokens

            #embed_tokens
        };
    }
}

/// `FieldInfo::new(..)` with tags or the embedded info.
fn field_info_tokens(info: &CarrierStruct, field: &CarrierField) -> TokenStream {
    let field_info_ = crate::path::field_info_(&info.pb_port_path);
    let embed_ = crate::path::embed_(&info.pb_port_path);

    let name = field.ident.to_string();
    let index = field.index;
    let ty = field.ty;

    let extra = if field.flatten {
        quote! {
            .with_embedded(<#ty as #embed_>::embedded_info)
        }
    } else if field.tags.is_empty() {
        TokenStream::new()
    } else {
        let entries = field.tags.iter().map(|(key, value)| quote!((#key, #value)));
        quote! {
            .with_tags(&[#(#entries),*])
        }
    };

    quote! {
        #field_info_::new(
            #name,
            #index,
            ::core::any::type_name::<#ty>(),
            || (&&Probe::<#ty>::new()).port_field_type(),
        )
        #extra
    }
}

fn impl_trait_carrier(info: &CarrierStruct) -> TokenStream {
    let path = &info.pb_port_path;
    let carrier_ = crate::path::carrier_(path);
    let embed_ = crate::path::embed_(path);
    let field_value_ = crate::path::field_value_(path);
    let struct_info_ = crate::path::struct_info_(path);
    let struct_info_cell_ = crate::path::struct_info_cell_(path);
    let validation_error_ = crate::path::validation_error_(path);
    let entity_ = crate::path::entity_(path);

    let ident = info.ident;
    let field_infos = info.fields.iter().map(|field| field_info_tokens(info, field));

    let (flattened, bound): (Vec<_>, Vec<_>) = info.fields.iter().partition(|field| field.flatten);

    let bound_index = bound.iter().map(|field| field.index).collect::<Vec<_>>();
    let bound_ident = bound.iter().map(|field| field.ident).collect::<Vec<_>>();
    let bound_ty = bound.iter().map(|field| field.ty).collect::<Vec<_>>();

    let flat_index = flattened.iter().map(|field| field.index).collect::<Vec<_>>();
    let flat_ident = flattened.iter().map(|field| field.ident).collect::<Vec<_>>();

    let validate_tokens = match &info.validate {
        Some(validate) => quote! {
            fn validate(&self) -> ::core::result::Result<(), #validation_error_> {
                #validate(self)
            }
        },
        None => TokenStream::new(),
    };

    quote! {
        impl #carrier_ for #ident {
            fn struct_info() -> &'static #struct_info_ {
                static INFO: #struct_info_cell_ = #struct_info_cell_::new();
                INFO.get_or_init(|| {
                    #struct_info_::new::<Self>(::std::vec![#(#field_infos),*])
                })
            }

            #[inline]
            fn info(&self) -> &'static #struct_info_ {
                <Self as #carrier_>::struct_info()
            }

            fn field(&self, index: usize) -> ::core::option::Option<&dyn #field_value_> {
                match index {
                    #(#bound_index => (&&Probe::<#bound_ty>::new()).field_ref(&self.#bound_ident),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_mut(&mut self, index: usize) -> ::core::option::Option<&mut dyn #field_value_> {
                match index {
                    #(#bound_index => (&&Probe::<#bound_ty>::new()).field_mut(&mut self.#bound_ident),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn entity(&self, index: usize) -> ::core::option::Option<&dyn #entity_> {
                match index {
                    #(#bound_index => (&&Probe::<#bound_ty>::new()).entity_ref(&self.#bound_ident),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn entity_mut(&mut self, index: usize) -> ::core::option::Option<&mut dyn #entity_> {
                match index {
                    #(#bound_index => (&&Probe::<#bound_ty>::new()).entity_mut(&mut self.#bound_ident),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn embedded(&self, index: usize) -> ::core::option::Option<&dyn #carrier_> {
                match index {
                    #(#flat_index => #embed_::as_carrier(&self.#flat_ident),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn embedded_mut(&mut self, index: usize) -> ::core::option::Option<&mut dyn #carrier_> {
                match index {
                    #(#flat_index => ::core::option::Option::Some(#embed_::as_carrier_mut(&mut self.#flat_ident)),)*
                    _ => ::core::option::Option::None,
                }
            }

            #validate_tokens
        }
    }
}

fn impl_trait_field_value(info: &CarrierStruct) -> TokenStream {
    let path = &info.pb_port_path;
    let carrier_ = crate::path::carrier_(path);
    let field_value_ = crate::path::field_value_(path);
    let port_field_type_ = crate::path::port_field_type_(path);
    let field_ref_ = crate::path::field_ref_(path);
    let field_mut_ = crate::path::field_mut_(path);

    let ident = info.ident;

    quote! {
        impl #field_value_ for #ident {
            fn field_type() -> #port_field_type_ {
                #port_field_type_::carrier::<Self>(<Self as #carrier_>::struct_info)
            }

            #[inline]
            fn new_default() -> ::core::option::Option<Self> {
                (&&Probe::<Self>::new()).new_default()
            }

            #[inline]
            fn value_ref(&self) -> #field_ref_<'_> {
                #field_ref_::Struct(self)
            }

            #[inline]
            fn value_mut(&mut self) -> #field_mut_<'_> {
                #field_mut_::Struct(self)
            }
        }
    }
}

fn impl_trait_embed(info: &CarrierStruct) -> TokenStream {
    let path = &info.pb_port_path;
    let carrier_ = crate::path::carrier_(path);
    let embed_ = crate::path::embed_(path);
    let struct_info_ = crate::path::struct_info_(path);

    let ident = info.ident;

    quote! {
        impl #embed_ for #ident {
            #[inline]
            fn embedded_info() -> &'static #struct_info_ {
                <Self as #carrier_>::struct_info()
            }

            #[inline]
            fn as_carrier(&self) -> ::core::option::Option<&dyn #carrier_> {
                ::core::option::Option::Some(self)
            }

            #[inline]
            fn as_carrier_mut(&mut self) -> &mut dyn #carrier_ {
                self
            }
        }
    }
}
