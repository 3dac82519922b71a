use pb_content::{Content, ContentRegistry};
use pb_utils::text::split_list;
use serde_json::Value;

use crate::{
    Carrier, CoercionError, FileHandle, Pojo, Port, PortError, PortField, PortFieldInjector, Shape,
};

// -----------------------------------------------------------------------------
// InputDecoder

/// Reads raw values for port fields from a transport.
///
/// Each method returns `None` when the transport has no value for the field.
/// Transports without a notion of a shape keep the default, which fails with
/// [`PortError::NotImplemented`].
pub trait InputDecoder {
    /// Name used in error messages.
    fn transport(&self) -> &'static str {
        "input"
    }

    fn decode_primitive(&mut self, field: &PortField) -> Result<Option<String>, PortError>;

    /// The field's content; absent content reports no value.
    fn decode_content(&mut self, field: &PortField) -> Result<Content, PortError>;

    fn decode_array(&mut self, field: &PortField) -> Result<Option<Vec<String>>, PortError> {
        let _ = field;
        Err(PortError::NotImplemented {
            transport: self.transport(),
            shape: Shape::Array,
        })
    }

    fn decode_object(&mut self, field: &PortField) -> Result<Option<Pojo>, PortError> {
        let _ = field;
        Err(PortError::NotImplemented {
            transport: self.transport(),
            shape: Shape::Object,
        })
    }

    fn decode_file(&mut self, field: &PortField) -> Result<Option<FileHandle>, PortError> {
        let _ = field;
        Err(PortError::NotImplemented {
            transport: self.transport(),
            shape: Shape::File,
        })
    }

    fn decode_file_array(&mut self, field: &PortField) -> Result<Option<Vec<FileHandle>>, PortError> {
        let _ = field;
        Err(PortError::NotImplemented {
            transport: self.transport(),
            shape: Shape::FileArray,
        })
    }

    fn decode_any(&mut self, field: &PortField) -> Result<Option<Value>, PortError> {
        let _ = field;
        Err(PortError::NotImplemented {
            transport: self.transport(),
            shape: Shape::Any,
        })
    }
}

// -----------------------------------------------------------------------------
// InputsPopulator

/// Fills a carrier from an [`InputDecoder`].
///
/// Fields are populated in port order. A field without a transport value
/// takes its `const` or `default` option; a required field left without a
/// value fails with [`PortError::MissingRequiredValue`]. Errors are wrapped
/// with the group and name of the failing field. The carrier's own
/// validation runs once every field is populated.
pub struct InputsPopulator<'a, D> {
    port: &'a Port,
    decoder: D,
    registry: &'a ContentRegistry,
}

impl<'a, D: InputDecoder> InputsPopulator<'a, D> {
    pub fn new(port: &'a Port, decoder: D, registry: &'a ContentRegistry) -> Self {
        Self {
            port,
            decoder,
            registry,
        }
    }

    /// Populates a default `T`.
    pub fn populate<T: Carrier + Default>(&mut self) -> Result<T, PortError> {
        let mut inputs = T::default();
        self.populate_into(&mut inputs)?;
        Ok(inputs)
    }

    /// Populates an existing carrier, which must be the port's carrier type.
    pub fn populate_into(&mut self, inputs: &mut dyn Carrier) -> Result<(), PortError> {
        let expected = self.port.struct_info();
        if inputs.info().type_id() != expected.type_id() {
            return Err(PortError::CarrierMismatch {
                expected: expected.type_name(),
                actual: inputs.info().type_name(),
            });
        }

        for field in self.port.fields() {
            self.populate_field(field, inputs)
                .map_err(|error| error.in_field(&field.group, field.name))?;
        }

        inputs.validate().map_err(|source| PortError::Validation {
            field: expected.type_name().to_owned(),
            source,
        })
    }

    fn populate_field(&mut self, field: &PortField, inputs: &mut dyn Carrier) -> Result<(), PortError> {
        let mut injector = PortFieldInjector::new(field, inputs, self.registry);

        match field.shape() {
            Shape::Primitive => {
                let value = self.decoder.decode_primitive(field)?;
                let value = or_fallback(field, value, |text| Ok(text.to_owned()))?;
                if let Some(value) = required(field, value)? {
                    injector.inject_primitive(&value)?;
                }
            }
            Shape::Array => {
                let values = self.decoder.decode_array(field)?;
                let values = or_fallback(field, values, |text| Ok(split_list(text)))?;
                if let Some(values) = required(field, values)? {
                    injector.inject_array(&values)?;
                }
            }
            Shape::Object => {
                let object = self.decoder.decode_object(field)?;
                let object = or_fallback(field, object, |text| {
                    serde_json::from_str::<Pojo>(text)
                        .map_err(|e| CoercionError::new(text, "object", e).into())
                })?;
                if let Some(object) = required(field, object)? {
                    injector.inject_object(object)?;
                }
            }
            Shape::File => {
                if let Some(file) = required(field, self.decoder.decode_file(field)?)? {
                    injector.inject_file(file)?;
                }
            }
            Shape::FileArray => {
                if let Some(files) = required(field, self.decoder.decode_file_array(field)?)? {
                    injector.inject_file_array(files)?;
                }
            }
            Shape::Content => {
                let content = self.decoder.decode_content(field)?;
                let content = content.is_present().then_some(content);
                if let Some(content) = required(field, content)? {
                    injector.inject_content(content)?;
                }
            }
            Shape::Any => {
                let value = self.decoder.decode_any(field)?;
                let value = or_fallback(field, value, |text| {
                    Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned())))
                })?;
                if let Some(value) = required(field, value)? {
                    injector.inject_any(value)?;
                }
            }
            Shape::Unknown => {
                return Err(PortError::UnsupportedType {
                    field: field.name.to_owned(),
                    type_name: field.port_type.type_name,
                    operation: "populate",
                });
            }
        }
        Ok(())
    }
}

/// Substitutes the field's `const` or `default` option for a missing value.
fn or_fallback<T>(
    field: &PortField,
    value: Option<T>,
    parse: impl FnOnce(&str) -> Result<T, PortError>,
) -> Result<Option<T>, PortError> {
    if value.is_some() {
        return Ok(value);
    }
    match field.fallback_value() {
        Some(text) => {
            log::trace!("field {:?} uses its fallback value", field.name);
            parse(text).map(Some)
        }
        None => Ok(None),
    }
}

fn required<T>(field: &PortField, value: Option<T>) -> Result<Option<T>, PortError> {
    match value {
        Some(value) => Ok(Some(value)),
        None if field.optional => {
            log::trace!("optional field {:?} has no value", field.name);
            Ok(None)
        }
        None => Err(PortError::MissingRequiredValue(field.peer.clone())),
    }
}

impl<D> core::fmt::Debug for InputsPopulator<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputsPopulator")
            .field("carrier", &self.port.struct_info().type_name())
            .field("fields", &self.port.fields().len())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests
