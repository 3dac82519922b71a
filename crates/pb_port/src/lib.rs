//! Binds annotated carrier structs to the fields of an external message.
//!
//! A carrier derives [`Carrier`]; each bound field carries a
//! `#[port(<kind> = "group[=peer][,option[=value]]*")]` annotation.
//! [`PortReflector`] compiles the annotations of one port kind into a
//! [`Port`], and the populators move values between a carrier and a
//! transport through that port:
//!
//! - [`InputsPopulator`] decodes transport values and injects them with
//!   [`PortFieldInjector`].
//! - [`OutputsPopulator`] extracts carrier values with [`PortFieldExtractor`]
//!   and hands them to an encoder.
//!
//! # Examples
//!
//! ```
//! use pb_port::stream::{self, Message, MessageDecoder};
//! use pb_port::{Carrier, InputsPopulator};
//! use pb_content::ContentRegistry;
//!
//! #[derive(Carrier, Default)]
//! struct Inputs {
//!     #[port(inp = "header=traceId")]
//!     trace: Option<String>,
//!     #[port(inp = "header,default=5")]
//!     retries: u8,
//! }
//!
//! let port = stream::input_port::<Inputs>().unwrap();
//! let registry = ContentRegistry::default();
//! let message = Message::default().with_metadata("traceId", "abc");
//!
//! let inputs: Inputs = InputsPopulator::new(&port, MessageDecoder::new(&message), &registry)
//!     .populate()
//!     .unwrap();
//!
//! assert_eq!(inputs.trace.as_deref(), Some("abc"));
//! assert_eq!(inputs.retries, 5);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// Derived code names `pb_port`, including inside this crate's own tests.
extern crate self as pb_port;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod info;
mod port;
mod shape;
mod tags;
mod types;

pub mod classify;
pub mod extract;
pub mod inject;
pub mod populate;
pub mod reflect;
pub mod stream;
pub mod value;
pub mod walk;

#[doc(hidden)]
pub mod __macro_exports;

// -----------------------------------------------------------------------------
// Top-level exports

pub use pb_port_derive::Carrier;

pub use pb_content::BoxError;

pub use classify::{DefaultPortFieldTypeReflector, PortFieldTypeReflector};
pub use error::{CoercionError, PortError, ValidationError};
pub use extract::PortFieldExtractor;
pub use info::{Carrier, Embed, FieldInfo, StructInfo, StructInfoCell};
pub use inject::PortFieldInjector;
pub use populate::{InputDecoder, InputsPopulator, OutputEncoder, OutputsPopulator};
pub use port::{Baggage, CardinalityRange, FieldGroup, Port, PortDirection, PortField, options};
pub use reflect::{FieldPostProcessor, PortReflector};
pub use shape::{Handler, PortFieldType, ScalarKind, Shape, StructInfoFn};
pub use types::{ContentReader, FileHandle, Pojo};
pub use value::{FieldMut, FieldRef, FieldValue, TextValue};
