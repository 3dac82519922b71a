use std::io::{Cursor, Read};

use serde::{Deserialize, Serialize};

use crate::{BoxRead, BoxWriter, ContentError, ContentRegistry, Encoding, EntityMut, EntityRef};

// -----------------------------------------------------------------------------
// ContentOptions

/// MIME type and encoding chain describing a byte stream.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentOptions {
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Encoding::is_empty")]
    pub encoding: Encoding,
}

impl ContentOptions {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            encoding: Encoding::new(),
        }
    }

    /// Appends `encoding` to the chain.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        for name in encoding.names() {
            self.encoding.push(name.as_str());
        }
        self
    }

    #[inline]
    pub fn base_media_type(&self) -> Result<String, ContentError> {
        crate::base_media_type(&self.mime_type)
    }

    /// Encodes and marshals `value` into `writer`, then closes the chain.
    ///
    /// The marshaling error wins over a close error; otherwise a failed close
    /// is the result.
    pub fn write_entity(
        &self,
        registry: &ContentRegistry,
        writer: BoxWriter<'_>,
        value: EntityRef<'_>,
    ) -> Result<(), ContentError> {
        let marshaler = registry.marshaler(&self.base_media_type()?)?;
        let mut writer = self.encoding.writer(registry, writer)?;

        let written = marshaler.write_entity(&mut writer, &value);
        let closed = writer.close();

        written?;
        closed?;
        Ok(())
    }

    /// Decodes and unmarshals `reader` into `target`.
    pub fn read_entity(
        &self,
        registry: &ContentRegistry,
        reader: BoxRead<'_>,
        target: EntityMut<'_>,
    ) -> Result<(), ContentError> {
        let marshaler = registry.marshaler(&self.base_media_type()?)?;
        let mut reader = self.encoding.reader(registry, reader)?;
        marshaler.read_entity(&mut reader, target)
    }

    /// Decodes `reader` without unmarshaling.
    pub fn read_bytes(&self, registry: &ContentRegistry, reader: BoxRead<'_>) -> Result<Vec<u8>, ContentError> {
        let mut reader = self.encoding.reader(registry, reader)?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(data)
    }
}

// -----------------------------------------------------------------------------
// Content

/// A possibly absent, single-pass byte stream with its [`ContentOptions`].
///
/// Absent and empty are different states: reading absent content fails
/// with [`ContentError::NotPresent`], while empty content reads zero bytes.
///
/// # Examples
///
/// ```
/// use pb_content::{Content, ContentError, ContentOptions, ContentRegistry};
///
/// let registry = ContentRegistry::default();
///
/// let mut empty = Content::from_bytes(ContentOptions::new("text/plain"), Vec::new());
/// assert_eq!(empty.read_bytes(&registry).unwrap(), b"");
///
/// let mut absent = Content::absent(ContentOptions::new("text/plain"));
/// assert!(matches!(absent.reader(&registry), Err(ContentError::NotPresent)));
/// ```
#[derive(Default)]
pub struct Content {
    present: bool,
    options: ContentOptions,
    source: Option<BoxRead<'static>>,
}

impl Content {
    /// Content backed by an in-memory buffer.
    pub fn from_bytes(options: ContentOptions, bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_reader(options, Cursor::new(bytes.into()))
    }

    /// Content backed by a stream.
    pub fn from_reader(options: ContentOptions, reader: impl Read + Send + 'static) -> Self {
        Self {
            present: true,
            options,
            source: Some(Box::new(reader)),
        }
    }

    /// Content with no source.
    pub fn absent(options: ContentOptions) -> Self {
        Self {
            present: false,
            options,
            source: None,
        }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.present
    }

    #[inline]
    pub fn options(&self) -> &ContentOptions {
        &self.options
    }

    #[inline]
    pub fn mime_type(&self) -> &str {
        &self.options.mime_type
    }

    #[inline]
    pub fn base_media_type(&self) -> Result<String, ContentError> {
        self.options.base_media_type()
    }

    fn take_source(&mut self) -> Result<BoxRead<'static>, ContentError> {
        if !self.present {
            return Err(ContentError::NotPresent);
        }
        self.source.take().ok_or(ContentError::Consumed)
    }

    /// Hands out the decoded stream. The content cannot be read again.
    pub fn reader(&mut self, registry: &ContentRegistry) -> Result<BoxRead<'static>, ContentError> {
        let source = self.take_source()?;
        self.options.encoding.reader(registry, source)
    }

    /// Reads the decoded bytes.
    pub fn read_bytes(&mut self, registry: &ContentRegistry) -> Result<Vec<u8>, ContentError> {
        let source = self.take_source()?;
        self.options.read_bytes(registry, source)
    }

    /// Reads and unmarshals the content into `target`.
    pub fn read_entity(&mut self, registry: &ContentRegistry, target: EntityMut<'_>) -> Result<(), ContentError> {
        let source = self.take_source()?;
        self.options.read_entity(registry, source, target)
    }
}

impl core::fmt::Debug for Content {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Content")
            .field("present", &self.present)
            .field("options", &self.options)
            .field("consumed", &(self.present && self.source.is_none()))
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{Content, ContentOptions};
    use crate::{ContentError, ContentRegistry, Encoding, EntityMut, EntityRef, SinkWriter};

    fn gzip_json() -> ContentOptions {
        ContentOptions::new("application/json; charset=utf-8").with_encoding(Encoding::parse("gzip"))
    }

    #[test]
    fn entity_round_trip_through_gzip() {
        let registry = ContentRegistry::default();
        let value = BTreeMap::from([("key".to_owned(), "value".to_owned())]);

        let mut buffer = Vec::new();
        gzip_json()
            .write_entity(&registry, Box::new(SinkWriter(&mut buffer)), EntityRef::entity(&value))
            .unwrap();

        let mut content = Content::from_bytes(gzip_json(), buffer);
        let mut decoded = BTreeMap::<String, String>::new();
        content
            .read_entity(&registry, EntityMut::entity(&mut decoded))
            .unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn source_is_single_pass() {
        let registry = ContentRegistry::default();
        let mut content = Content::from_bytes(ContentOptions::new("text/plain"), "abc");
        assert_eq!(content.read_bytes(&registry).unwrap(), b"abc");
        assert!(matches!(content.read_bytes(&registry), Err(ContentError::Consumed)));
    }

    #[test]
    fn absent_content_is_not_empty() {
        let registry = ContentRegistry::default();
        let mut content = Content::absent(ContentOptions::new("text/plain"));
        assert!(!content.is_present());
        assert!(matches!(content.read_bytes(&registry), Err(ContentError::NotPresent)));

        let mut text = String::new();
        let err = content.read_entity(&registry, EntityMut::Text(&mut text));
        assert!(matches!(err, Err(ContentError::NotPresent)));
    }

    #[test]
    fn unknown_marshaler_is_reported() {
        let registry = ContentRegistry::default();
        let mut content = Content::from_bytes(ContentOptions::new("application/yaml"), "a: 1");
        let mut text = String::new();
        let err = content.read_entity(&registry, EntityMut::Text(&mut text));
        assert!(matches!(err, Err(ContentError::UnknownMarshaler(m)) if m == "application/yaml"));
    }
}
