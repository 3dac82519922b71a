//! See [`Carrier`].
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static PORT_ATTRIBUTE_NAME: &str = "port";

// -----------------------------------------------------------------------------
// Modules

mod derive_data;
mod impls;
mod path;

// -----------------------------------------------------------------------------
// Macros

/// # Carrier Derivation
///
/// `#[derive(Carrier)]` implements `Carrier`, `FieldValue` and `Embed` for a
/// struct with named fields.
///
/// ## Field annotations
///
/// Each `#[port(key = "value", ...)]` entry on a field is recorded as an
/// annotation, in declaration order. The key names a port kind or an option:
///
/// ```rust, ignore
/// #[derive(Carrier, Default)]
/// struct Request {
///     #[port(req = "header=X-Trace,optional", format = "uuid")]
///     trace: Option<String>,
///     #[port(req = "body")]
///     body: Vec<u8>,
/// }
/// ```
///
/// A bare key is recorded with the value `"true"`, so `#[port(required)]`
/// equals `#[port(required = "true")]`. Keywords such as `enum` and `const`
/// are valid keys.
///
/// ## Flattening
///
/// `#[port(flatten)]` embeds another carrier, or an `Option`/`Box` of one.
/// Its fields join the parent's ports as if declared in place.
///
/// ```rust, ignore
/// #[derive(Carrier, Default)]
/// struct Common {
///     #[port(req = "header")]
///     tenant: String,
/// }
///
/// #[derive(Carrier, Default)]
/// struct Request {
///     #[port(flatten)]
///     common: Option<Common>,
/// }
/// ```
///
/// ## Validation
///
/// `#[port(validate = path::to::check)]` on the struct names a
/// `fn(&Self) -> Result<(), ValidationError>` that runs after population.
///
/// ## Restrictions
///
/// Generic structs, tuple structs, enums and unions are rejected.
#[proc_macro_derive(Carrier, attributes(port))]
pub fn derive_carrier(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match derive_data::CarrierStruct::from_derive_input(&ast) {
        Ok(info) => impls::impl_carrier(&info).into(),
        Err(err) => err.into_compile_error().into(),
    }
}
