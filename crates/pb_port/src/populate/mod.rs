//! Moves values between carriers and transports through a compiled [`Port`].
//!
//! A transport supplies an [`InputDecoder`] that reads raw values for each
//! port field, or an [`OutputEncoder`] that writes them. The populators drive
//! the injector and extractor in between.
//!
//! [`Port`]: crate::Port

mod inputs;
mod outputs;

pub use inputs::{InputDecoder, InputsPopulator};
pub use outputs::{OutputEncoder, OutputsPopulator};

/// Field groups understood by [`OutputsPopulator`].
pub mod groups {
    pub const MESSAGE_ID: &str = "messageId";
    pub const CHANNEL: &str = "channel";
    pub const HEADER: &str = "header";
    pub const BODY: &str = "body";
}

/// Header peers that configure body encoding.
pub mod peers {
    pub const CONTENT_TYPE: &str = "contentType";
    pub const CONTENT_ENCODING: &str = "contentEncoding";
}
