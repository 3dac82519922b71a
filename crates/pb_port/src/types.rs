use std::io::{self, Read};

use pb_content::{BoxRead, Content, ContentOptions, media_types};
use serde_json::Value;

use crate::value::{EntryFill, FieldMut, FieldRef, FieldValue, MapValue};
use crate::{Handler, PortError, PortFieldType, Shape};

/// A decoded JSON object.
pub type Pojo = serde_json::Map<String, Value>;

// -----------------------------------------------------------------------------
// FileHandle

/// An uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHandle {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FileHandle {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// The file body as content, typed `application/octet-stream` when the
    /// upload carried no content type.
    pub fn content(&self) -> Content {
        let mime = self.content_type.as_deref().unwrap_or(media_types::BINARY);
        Content::from_bytes(ContentOptions::new(mime), self.data.clone())
    }
}

impl FieldValue for FileHandle {
    #[inline]
    fn field_type() -> PortFieldType {
        PortFieldType::new::<Self>(Shape::File, Handler::File, false)
    }

    #[inline]
    fn new_default() -> Option<Self> {
        Some(Self::default())
    }

    #[inline]
    fn value_ref(&self) -> FieldRef<'_> {
        FieldRef::Opaque(self)
    }

    #[inline]
    fn value_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Opaque(self)
    }
}

// -----------------------------------------------------------------------------
// ContentReader

/// A readable stream bound from a content field.
///
/// The stream is already decoded; it yields the unmarshaled bytes.
pub struct ContentReader(BoxRead<'static>);

impl ContentReader {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self(Box::new(reader))
    }

    #[inline]
    pub fn into_inner(self) -> BoxRead<'static> {
        self.0
    }
}

impl From<BoxRead<'static>> for ContentReader {
    #[inline]
    fn from(reader: BoxRead<'static>) -> Self {
        Self(reader)
    }
}

impl Default for ContentReader {
    fn default() -> Self {
        Self::new(io::empty())
    }
}

impl Read for ContentReader {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl core::fmt::Debug for ContentReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ContentReader(..)")
    }
}

impl FieldValue for ContentReader {
    #[inline]
    fn field_type() -> PortFieldType {
        PortFieldType::new::<Self>(Shape::Content, Handler::Reader, false)
    }

    #[inline]
    fn new_default() -> Option<Self> {
        Some(Self::default())
    }

    #[inline]
    fn value_ref(&self) -> FieldRef<'_> {
        FieldRef::Opaque(self)
    }

    #[inline]
    fn value_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Opaque(self)
    }
}

// -----------------------------------------------------------------------------
// Content

impl FieldValue for Content {
    #[inline]
    fn field_type() -> PortFieldType {
        PortFieldType::new::<Self>(Shape::Content, Handler::Content, false)
    }

    #[inline]
    fn new_default() -> Option<Self> {
        Some(Self::default())
    }

    #[inline]
    fn value_ref(&self) -> FieldRef<'_> {
        FieldRef::Opaque(self)
    }

    #[inline]
    fn value_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Opaque(self)
    }
}

// -----------------------------------------------------------------------------
// JSON values

impl FieldValue for Value {
    #[inline]
    fn field_type() -> PortFieldType {
        PortFieldType::new::<Self>(Shape::Any, Handler::Any, true)
    }

    #[inline]
    fn new_default() -> Option<Self> {
        Some(Value::Null)
    }

    #[inline]
    fn value_ref(&self) -> FieldRef<'_> {
        FieldRef::Opaque(self)
    }

    #[inline]
    fn value_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Opaque(self)
    }
}

impl FieldValue for Pojo {
    fn field_type() -> PortFieldType {
        PortFieldType::new::<Self>(Shape::Object, Handler::Map, true)
            .with_entries(String::field_type(), Value::field_type())
    }

    #[inline]
    fn new_default() -> Option<Self> {
        Some(Pojo::new())
    }

    #[inline]
    fn value_ref(&self) -> FieldRef<'_> {
        FieldRef::Map(self)
    }

    #[inline]
    fn value_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Map(self)
    }
}

impl MapValue for Pojo {
    #[inline]
    fn len(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> Vec<(&dyn FieldValue, &dyn FieldValue)> {
        self.iter()
            .map(|(k, v)| (k as &dyn FieldValue, v as &dyn FieldValue))
            .collect()
    }

    #[inline]
    fn clear(&mut self) {
        self.clear();
    }

    fn insert_with(&mut self, fill: &mut EntryFill<'_>) -> Result<bool, PortError> {
        let mut key = String::new();
        let mut value = Value::Null;
        fill(&mut key, &mut value)?;
        self.insert(key, value);
        Ok(true)
    }
}
