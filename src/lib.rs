#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use pb_content as content;
pub use pb_port as port;
pub use pb_utils as utils;

/// Common imports for declaring and binding carriers.
pub mod prelude {
    pub use pb_content::{Content, ContentOptions, ContentRegistry, Encoding};
    pub use pb_port::{Carrier, FieldGroup, InputsPopulator, OutputsPopulator};
    pub use pb_port::{Port, PortDirection, PortError, PortField, PortReflector, Shape};
}
