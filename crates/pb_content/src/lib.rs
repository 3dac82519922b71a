//! Typed byte content for port bindings.
//!
//! A [`Content`] is a possibly absent, single-pass byte stream tagged with
//! [`ContentOptions`]: a MIME type and an [`Encoding`] chain. Reading it
//! runs the stream through the named [`Encoder`]s and then hands it to the
//! [`Marshaler`] registered for the base media type. Both lookups go through
//! an explicit [`ContentRegistry`].
//!
//! ```
//! use pb_content::{ContentOptions, ContentRegistry, Encoding, EntityMut, EntityRef, SinkWriter};
//!
//! let registry = ContentRegistry::default();
//! let options = ContentOptions::new("application/json")
//!     .with_encoding(Encoding::from_iter(["gzip"]));
//!
//! let mut buffer = Vec::new();
//! options
//!     .write_entity(&registry, Box::new(SinkWriter(&mut buffer)), EntityRef::entity(&vec![1, 2]))
//!     .unwrap();
//!
//! let mut decoded: Vec<i32> = Vec::new();
//! options
//!     .read_entity(&registry, Box::new(&buffer[..]), EntityMut::entity(&mut decoded))
//!     .unwrap();
//! assert_eq!(decoded, [1, 2]);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "io based crate")]
#![allow(clippy::std_instead_of_alloc, reason = "io based crate")]

// -----------------------------------------------------------------------------
// Modules

mod content;
mod encoding;
mod entity;
mod error;
mod marshal;
mod media;
mod registry;

// -----------------------------------------------------------------------------
// Exports

pub use content::{Content, ContentOptions};
pub use encoding::{Base64Encoder, Encoder, Encoding, GzipEncoder};
pub use encoding::{BoxRead, BoxWriter, EntityWriter, SinkWriter};
pub use entity::{Entity, EntityMut, EntityRef};
pub use error::{BoxError, ContentError};
pub use marshal::{BinaryMarshaler, JsonMarshaler, Marshaler, XmlMarshaler};
pub use media::base_media_type;
pub use registry::ContentRegistry;

/// Names of the built-in encoders.
pub mod encoders {
    pub const GZIP: &str = "gzip";
    pub const BASE64: &str = "base64";
}

/// Base media types of the built-in marshalers.
pub mod media_types {
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const TEXT_XML: &str = "text/xml";
    pub const BINARY: &str = "application/octet-stream";
    pub const TEXT: &str = "text/plain";
}
