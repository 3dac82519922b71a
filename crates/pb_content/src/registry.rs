use std::sync::Arc;

use pb_utils::hash::HashMap;

use crate::media_types::{BINARY, JSON, TEXT, TEXT_XML, XML};
use crate::{Base64Encoder, BinaryMarshaler, GzipEncoder, JsonMarshaler, XmlMarshaler};
use crate::{ContentError, Encoder, Marshaler, encoders};

/// Named encoders and media-type marshalers.
///
/// Build one at start-up, extend it with the `register_*` methods, and share
/// it (typically behind an [`Arc`]) with every populator. Lookups never
/// mutate the registry.
///
/// # Examples
///
/// ```
/// use pb_content::{ContentRegistry, JsonMarshaler};
///
/// let mut registry = ContentRegistry::default();
/// registry.register_marshaler("application/vnd.api+json", JsonMarshaler);
///
/// assert!(registry.marshaler("application/vnd.api+json").is_ok());
/// assert!(registry.marshaler("application/yaml").is_err());
/// ```
#[derive(Clone)]
pub struct ContentRegistry {
    encoders: HashMap<String, Arc<dyn Encoder>>,
    marshalers: HashMap<String, Arc<dyn Marshaler>>,
}

impl ContentRegistry {
    /// Creates a registry with no encoders or marshalers.
    pub fn empty() -> Self {
        Self {
            encoders: HashMap::default(),
            marshalers: HashMap::default(),
        }
    }

    /// Adds or replaces the encoder named `name`.
    pub fn register_encoder(&mut self, name: impl Into<String>, encoder: impl Encoder) -> &mut Self {
        let name = name.into();
        if self.encoders.insert(name.clone(), Arc::new(encoder)).is_some() {
            log::debug!("replaced content encoder {name:?}");
        }
        self
    }

    /// Adds or replaces the marshaler for the base media type `mime`.
    pub fn register_marshaler(
        &mut self,
        mime: impl Into<String>,
        marshaler: impl Marshaler,
    ) -> &mut Self {
        let mime = mime.into().to_ascii_lowercase();
        if self.marshalers.insert(mime.clone(), Arc::new(marshaler)).is_some() {
            log::debug!("replaced marshaler for {mime:?}");
        }
        self
    }

    pub fn encoder(&self, name: &str) -> Result<&dyn Encoder, ContentError> {
        self.encoders
            .get(name)
            .map(|encoder| &**encoder)
            .ok_or_else(|| ContentError::UnknownEncoder(name.to_owned()))
    }

    /// Looks up a marshaler by base media type (no parameters).
    pub fn marshaler(&self, base_media_type: &str) -> Result<&dyn Marshaler, ContentError> {
        self.marshalers
            .get(base_media_type)
            .map(|marshaler| &**marshaler)
            .ok_or_else(|| ContentError::UnknownMarshaler(base_media_type.to_owned()))
    }

    pub fn encoder_names(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    pub fn media_types(&self) -> impl Iterator<Item = &str> {
        self.marshalers.keys().map(String::as_str)
    }
}

impl Default for ContentRegistry {
    /// The built-in set: `gzip` and `base64` encoders; JSON, XML and binary
    /// marshalers.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register_encoder(encoders::GZIP, GzipEncoder)
            .register_encoder(encoders::BASE64, Base64Encoder)
            .register_marshaler(JSON, JsonMarshaler)
            .register_marshaler(XML, XmlMarshaler)
            .register_marshaler(TEXT_XML, XmlMarshaler)
            .register_marshaler(BINARY, BinaryMarshaler)
            .register_marshaler(TEXT, BinaryMarshaler);
        registry
    }
}

impl core::fmt::Debug for ContentRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut encoders: Vec<_> = self.encoder_names().collect();
        let mut media_types: Vec<_> = self.media_types().collect();
        encoders.sort_unstable();
        media_types.sort_unstable();
        f.debug_struct("ContentRegistry")
            .field("encoders", &encoders)
            .field("marshalers", &media_types)
            .finish()
    }
}
