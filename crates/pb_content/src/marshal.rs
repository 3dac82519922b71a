use std::io::{self, BufReader, Read, Write};

use crate::{ContentError, EntityMut, EntityRef};

/// Converts entities to and from one media type.
pub trait Marshaler: Send + Sync + 'static {
    fn write_entity(&self, writer: &mut dyn Write, value: &EntityRef<'_>) -> Result<(), ContentError>;

    fn read_entity(&self, reader: &mut dyn Read, target: EntityMut<'_>) -> Result<(), ContentError>;
}

// -----------------------------------------------------------------------------
// JSON

/// `application/json`. Written documents end with a newline.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMarshaler;

impl Marshaler for JsonMarshaler {
    fn write_entity(&self, writer: &mut dyn Write, value: &EntityRef<'_>) -> Result<(), ContentError> {
        value
            .with_serialize(|value| serde_json::to_writer(&mut *writer, value))
            .map_err(|e| ContentError::marshal("json", e))?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn read_entity(&self, reader: &mut dyn Read, target: EntityMut<'_>) -> Result<(), ContentError> {
        let mut deserializer = serde_json::Deserializer::from_reader(reader);
        {
            let mut erased = <dyn erased_serde::Deserializer>::erase(&mut deserializer);
            deserialize_into(&mut erased, target, "json")?;
        }
        deserializer
            .end()
            .map_err(|e| ContentError::marshal("json", e))
    }
}

// -----------------------------------------------------------------------------
// XML

/// `application/xml` and `text/xml`, through `quick-xml`'s serde support.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlMarshaler;

impl Marshaler for XmlMarshaler {
    fn write_entity(&self, writer: &mut dyn Write, value: &EntityRef<'_>) -> Result<(), ContentError> {
        let text = value
            .with_serialize(|value| quick_xml::se::to_string(value))
            .map_err(|e| ContentError::marshal("xml", e))?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn read_entity(&self, reader: &mut dyn Read, target: EntityMut<'_>) -> Result<(), ContentError> {
        let mut deserializer = quick_xml::de::Deserializer::from_reader(BufReader::new(reader));
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut deserializer);
        deserialize_into(&mut erased, target, "xml")
    }
}

fn deserialize_into(
    deserializer: &mut dyn erased_serde::Deserializer<'_>,
    target: EntityMut<'_>,
    format: &'static str,
) -> Result<(), ContentError> {
    let result = match target {
        EntityMut::Entity(entity) => entity.deserialize_in_place(deserializer),
        EntityMut::Bytes(bytes) => erased_serde::deserialize(deserializer).map(|v| *bytes = v),
        EntityMut::Runes(runes) => erased_serde::deserialize::<String>(deserializer)
            .map(|v| *runes = v.chars().collect()),
        EntityMut::Text(text) => erased_serde::deserialize(deserializer).map(|v| *text = v),
        EntityMut::Writer(_) => {
            return Err(ContentError::Unsupported {
                marshaler: format,
                target: "writer",
            });
        }
    };
    result.map_err(|e| ContentError::marshal(format, e))
}

// -----------------------------------------------------------------------------
// Binary

/// Raw bytes for `application/octet-stream` and `text/plain`.
///
/// Only byte, rune, text and stream values are accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryMarshaler;

impl Marshaler for BinaryMarshaler {
    fn write_entity(&self, writer: &mut dyn Write, value: &EntityRef<'_>) -> Result<(), ContentError> {
        match value {
            EntityRef::Bytes(bytes) => writer.write_all(bytes)?,
            EntityRef::Text(text) => writer.write_all(text.as_bytes())?,
            EntityRef::Value(serde_json::Value::String(text)) => writer.write_all(text.as_bytes())?,
            other => {
                return Err(ContentError::Unsupported {
                    marshaler: "binary",
                    target: other.kind(),
                });
            }
        }
        Ok(())
    }

    fn read_entity(&self, reader: &mut dyn Read, target: EntityMut<'_>) -> Result<(), ContentError> {
        match target {
            EntityMut::Bytes(bytes) => {
                bytes.clear();
                reader.read_to_end(bytes)?;
            }
            EntityMut::Runes(runes) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                *runes = String::from_utf8_lossy(&data).chars().collect();
            }
            EntityMut::Text(text) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                *text = String::from_utf8_lossy(&data).into_owned();
            }
            EntityMut::Writer(writer) => {
                io::copy(reader, writer)?;
            }
            other => {
                return Err(ContentError::Unsupported {
                    marshaler: "binary",
                    target: other.kind(),
                });
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
