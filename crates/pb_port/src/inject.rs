//! Writes decoded transport values into carrier fields.

use pb_content::{Content, ContentRegistry};
use serde_json::Value;

use crate::value::{FieldMut, FieldValue, assign_json, assign_text, fill_list, to_text};
use crate::{
    Carrier, ContentReader, FileHandle, Handler, Pojo, PortError, PortField, ScalarKind, Shape,
    ValidationError,
};

/// Injects values into one field of a carrier.
///
/// Each `inject_*` method checks that the field has the matching shape,
/// allocates unset `Option` layers and embedded carriers on the way, stores
/// the value and then validates it. A failed injection may leave the field
/// partially written.
///
/// # Examples
///
/// ```
/// use pb_port::{Carrier, CardinalityRange, FieldGroup, PortDirection, PortFieldInjector, PortReflector};
/// use pb_content::ContentRegistry;
///
/// #[derive(Carrier, Default)]
/// struct Inputs {
///     #[port(req = "query")]
///     limit: Option<u32>,
/// }
///
/// let port = PortReflector::new(PortDirection::In)
///     .with_field_group("query", FieldGroup::new(CardinalityRange::zero_to_many()))
///     .reflect_port::<Inputs>("req")
///     .unwrap();
///
/// let registry = ContentRegistry::default();
/// let mut inputs = Inputs::default();
/// PortFieldInjector::new(&port.fields()[0], &mut inputs, &registry)
///     .inject_primitive("0x10")
///     .unwrap();
/// assert_eq!(inputs.limit, Some(16));
/// ```
pub struct PortFieldInjector<'a> {
    field: &'a PortField,
    target: &'a mut dyn Carrier,
    registry: &'a ContentRegistry,
}

impl<'a> PortFieldInjector<'a> {
    pub fn new(field: &'a PortField, target: &'a mut dyn Carrier, registry: &'a ContentRegistry) -> Self {
        Self {
            field,
            target,
            registry,
        }
    }

    fn expect_shape(&self, expected: Shape) -> Result<(), PortError> {
        if self.field.shape() == expected {
            return Ok(());
        }
        Err(PortError::IncorrectShape {
            field: self.field.name.to_owned(),
            expected,
            actual: self.field.shape(),
        })
    }

    fn slot(&mut self) -> Result<&mut dyn FieldValue, PortError> {
        self.target.field_at_mut(&self.field.indices)
    }

    pub fn inject_primitive(&mut self, value: &str) -> Result<(), PortError> {
        self.expect_shape(Shape::Primitive)?;
        let name = self.field.name;
        assign_text(self.slot()?, value, name)?;
        self.validate()
    }

    /// Replaces the list with one element per value.
    pub fn inject_array(&mut self, values: &[String]) -> Result<(), PortError> {
        self.expect_shape(Shape::Array)?;
        let name = self.field.name;
        let json = Value::Array(values.iter().cloned().map(Value::String).collect());
        assign_json(self.slot()?, &json, name)?;
        self.validate()
    }

    /// Fills a map or nested carrier from a decoded object.
    pub fn inject_object(&mut self, object: Pojo) -> Result<(), PortError> {
        self.expect_shape(Shape::Object)?;
        let name = self.field.name;
        assign_json(self.slot()?, &Value::Object(object), name)?;
        self.validate()
    }

    pub fn inject_file(&mut self, file: FileHandle) -> Result<(), PortError> {
        self.expect_shape(Shape::File)?;
        let stored = with_base(self.slot()?, |slot| match slot.downcast_mut::<FileHandle>() {
            Some(slot) => {
                *slot = file;
                true
            }
            None => false,
        });
        if !stored {
            return Err(unsupported(self.field, "store a file in"));
        }
        self.validate()
    }

    pub fn inject_file_array(&mut self, files: Vec<FileHandle>) -> Result<(), PortError> {
        self.expect_shape(Shape::FileArray)?;
        if !fill_files(self.slot()?, files) {
            return Err(unsupported(self.field, "store files in"));
        }
        self.validate()
    }

    /// Reads `content` into the field according to its handler.
    ///
    /// Byte, rune and string fields take the decoded bytes as they are;
    /// [`Content`] and [`ContentReader`] fields take the stream itself; every
    /// other type is unmarshaled through its serde implementation.
    pub fn inject_content(&mut self, mut content: Content) -> Result<(), PortError> {
        self.expect_shape(Shape::Content)?;
        let registry = self.registry;
        let field = self.field;

        let stored = match field.port_type.handler {
            Handler::Bytes => {
                let data = content.read_bytes(registry)?;
                with_base(self.slot()?, |slot| store(slot, data))
            }
            Handler::Runes => {
                let data = content.read_bytes(registry)?;
                let runes: Vec<char> = String::from_utf8_lossy(&data).chars().collect();
                with_base(self.slot()?, |slot| store(slot, runes))
            }
            Handler::Scalar(ScalarKind::String) => {
                let data = content.read_bytes(registry)?;
                let text = String::from_utf8_lossy(&data).into_owned();
                with_base(self.slot()?, |slot| store(slot, text))
            }
            Handler::Content => with_base(self.slot()?, |slot| store(slot, content)),
            Handler::Reader => {
                let reader = ContentReader::from(content.reader(registry)?);
                with_base(self.slot()?, |slot| store(slot, reader))
            }
            _ => {
                let Some(entity) = self.target.entity_at_mut(&self.field.indices)? else {
                    return Err(unsupported(field, "unmarshal"));
                };
                content.read_entity(registry, pb_content::EntityMut::Entity(entity))?;
                true
            }
        };

        if !stored {
            return Err(unsupported(field, "store content in"));
        }
        self.validate()
    }

    /// Stores an untyped JSON value; `null` resets optional fields.
    pub fn inject_any(&mut self, value: Value) -> Result<(), PortError> {
        self.expect_shape(Shape::Any)?;
        let name = self.field.name;
        assign_json(self.slot()?, &value, name)?;
        self.validate()
    }

    fn validate(&self) -> Result<(), PortError> {
        // serde-only types have no value view to check
        if self.field.port_type.handler == Handler::Unknown {
            return Ok(());
        }
        let Some(value) = self.target.field_at(&self.field.indices)? else {
            return Ok(());
        };
        let invalid = |source| PortError::Validation {
            field: self.field.name.to_owned(),
            source,
        };

        value.validate_value().map_err(invalid)?;

        if let Some(allowed) = self.field.enum_values()
            && self.field.shape() == Shape::Primitive
            && let Some(text) = to_text(value, self.field.name)?
            && !allowed.contains(&text)
        {
            return Err(invalid(ValidationError::new(format!(
                "{text:?} is not one of {}",
                allowed.join(",")
            ))));
        }
        Ok(())
    }
}

fn unsupported(field: &PortField, operation: &'static str) -> PortError {
    PortError::UnsupportedType {
        field: field.name.to_owned(),
        type_name: field.port_type.type_name,
        operation,
    }
}

/// Runs `f` on the value beneath every `Option` and `Box` layer of `slot`,
/// allocating unset layers. `false` when a layer cannot be allocated.
fn with_base(slot: &mut dyn FieldValue, f: impl FnOnce(&mut dyn FieldValue) -> bool) -> bool {
    match slot.value_mut() {
        FieldMut::Indirect(layer) => {
            return layer.materialize().is_some_and(|inner| with_base(inner, f));
        }
        FieldMut::Opaque(inner) => return f(inner),
        _ => {}
    }
    f(slot)
}

fn store<T: 'static>(slot: &mut dyn FieldValue, value: T) -> bool {
    match slot.downcast_mut::<T>() {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

fn fill_files(slot: &mut dyn FieldValue, files: Vec<FileHandle>) -> bool {
    match slot.value_mut() {
        FieldMut::Indirect(layer) => {
            layer.materialize().is_some_and(|inner| fill_files(inner, files))
        }
        FieldMut::List(list) => fill_list(list, files),
        _ => false,
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Read;

    use pb_content::{Content, ContentOptions, ContentRegistry};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::PortFieldInjector;
    use crate::{
        CardinalityRange, Carrier, ContentReader, FieldGroup, FileHandle, Port, PortDirection,
        PortError, PortReflector, Shape, ValidationError,
    };

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
    }

    #[derive(Carrier, Default)]
    struct Depth {
        count: Option<u16>,
    }

    #[derive(Carrier, Default)]
    struct Inputs {
        #[port(t = "p")]
        zero: i32,
        #[port(t = "p")]
        one: Option<i32>,
        #[port(t = "p")]
        two: Option<Option<i32>>,
        #[port(t = "p")]
        three: Option<Option<Option<i32>>>,
        #[port(t = "p", enum = "red,green")]
        color: String,
        #[port(t = "p")]
        percent: Percent,
        #[port(t = "p")]
        bytes: Vec<u8>,
        #[port(t = "a")]
        tags: Option<Vec<String>>,
        #[port(t = "o")]
        labels: BTreeMap<String, u8>,
        #[port(t = "o")]
        depth: Option<Depth>,
        #[port(t = "f")]
        file: Option<FileHandle>,
        #[port(t = "f")]
        files: Vec<FileHandle>,
        #[port(t = "c")]
        raw: Vec<u8>,
        #[port(t = "c")]
        text: Option<String>,
        #[port(t = "c")]
        content: Option<Content>,
        #[port(t = "c")]
        reader: ContentReader,
        #[port(t = "c")]
        payload: Option<Payload>,
        #[port(t = "x")]
        any: serde_json::Value,
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Percent(u8);

    impl core::str::FromStr for Percent {
        type Err = core::num::ParseIntError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            s.trim_end_matches('%').parse().map(Percent)
        }
    }

    impl core::fmt::Display for Percent {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(f, "{}%", self.0)
        }
    }

    fn check_percent(value: &Percent) -> Result<(), ValidationError> {
        if value.0 > 100 {
            return Err(ValidationError::new("must be at most 100%"));
        }
        Ok(())
    }

    crate::impl_text_field!(Percent, validate = check_percent);

    fn port() -> Port {
        let any = || FieldGroup::new(CardinalityRange::zero_to_many());
        PortReflector::new(PortDirection::In)
            .with_field_groups(["p", "a", "o", "f", "c", "x"].map(|name| (name, any())))
            .with_post_processor(|field, _| {
                if field.group == "c" {
                    field.port_type.shape = Shape::Content;
                }
            })
            .reflect_port::<Inputs>("t")
            .unwrap()
    }

    fn inject<R>(
        port: &Port,
        inputs: &mut Inputs,
        name: &str,
        f: impl FnOnce(&mut PortFieldInjector<'_>) -> Result<R, PortError>,
    ) -> Result<R, PortError> {
        let registry = ContentRegistry::default();
        let field = port.field_by_name(name).unwrap();
        f(&mut PortFieldInjector::new(field, inputs, &registry))
    }

    #[test]
    fn primitives_through_every_depth() {
        let port = port();
        let mut inputs = Inputs::default();
        for name in ["zero", "one", "two", "three"] {
            inject(&port, &mut inputs, name, |i| i.inject_primitive("-7")).unwrap();
        }
        assert_eq!(inputs.zero, -7);
        assert_eq!(inputs.one, Some(-7));
        assert_eq!(inputs.two, Some(Some(-7)));
        assert_eq!(inputs.three, Some(Some(Some(-7))));
    }

    #[test]
    fn primitive_coercion_failure() {
        let port = port();
        let mut inputs = Inputs::default();
        let error = inject(&port, &mut inputs, "zero", |i| i.inject_primitive("abc")).unwrap_err();
        assert!(matches!(error, PortError::Coercion(_)));
    }

    #[test]
    fn enum_and_text_validation() {
        let port = port();
        let mut inputs = Inputs::default();
        inject(&port, &mut inputs, "color", |i| i.inject_primitive("red")).unwrap();
        let error = inject(&port, &mut inputs, "color", |i| i.inject_primitive("blue")).unwrap_err();
        assert!(matches!(error, PortError::Validation { ref field, .. } if field == "color"));

        inject(&port, &mut inputs, "percent", |i| i.inject_primitive("40%")).unwrap();
        assert_eq!(inputs.percent, Percent(40));
        let error = inject(&port, &mut inputs, "percent", |i| i.inject_primitive("140")).unwrap_err();
        assert_eq!(error.to_string(), "invalid value for field \"percent\": must be at most 100%");
    }

    #[test]
    fn shape_mismatch() {
        let port = port();
        let mut inputs = Inputs::default();
        let error = inject(&port, &mut inputs, "zero", |i| i.inject_array(&["1".into()])).unwrap_err();
        assert!(matches!(
            error,
            PortError::IncorrectShape { expected: Shape::Array, actual: Shape::Primitive, .. }
        ));
    }

    #[test]
    fn arrays_and_objects() {
        let port = port();
        let mut inputs = Inputs::default();

        inject(&port, &mut inputs, "bytes", |i| i.inject_primitive("hi")).unwrap();
        assert_eq!(inputs.bytes, b"hi");

        inject(&port, &mut inputs, "tags", |i| i.inject_array(&["a".into(), "b".into()])).unwrap();
        assert_eq!(inputs.tags, Some(vec!["a".to_owned(), "b".to_owned()]));

        let object = json!({"x": 1, "y": "2"}).as_object().cloned().unwrap();
        inject(&port, &mut inputs, "labels", |i| i.inject_object(object)).unwrap();
        assert_eq!(inputs.labels, BTreeMap::from([("x".to_owned(), 1), ("y".to_owned(), 2)]));

        let object = json!({"count": "5"}).as_object().cloned().unwrap();
        inject(&port, &mut inputs, "depth", |i| i.inject_object(object)).unwrap();
        assert_eq!(inputs.depth.and_then(|d| d.count), Some(5));
    }

    #[test]
    fn files() {
        let port = port();
        let mut inputs = Inputs::default();

        inject(&port, &mut inputs, "file", |i| i.inject_file(FileHandle::new("a.txt", "abc"))).unwrap();
        assert_eq!(inputs.file.as_ref().map(|f| f.filename.as_str()), Some("a.txt"));

        let files = vec![FileHandle::new("b", "1"), FileHandle::new("c", "2")];
        inject(&port, &mut inputs, "files", |i| i.inject_file_array(files)).unwrap();
        assert_eq!(inputs.files.len(), 2);
        assert_eq!(inputs.files[1].data, b"2");
    }

    #[test]
    fn content_by_handler() {
        let port = port();
        let mut inputs = Inputs::default();
        let text = |body: &str| Content::from_bytes(ContentOptions::new("text/plain"), body.to_owned());

        inject(&port, &mut inputs, "raw", |i| i.inject_content(text("raw"))).unwrap();
        assert_eq!(inputs.raw, b"raw");

        inject(&port, &mut inputs, "text", |i| i.inject_content(text("hello"))).unwrap();
        assert_eq!(inputs.text.as_deref(), Some("hello"));

        inject(&port, &mut inputs, "content", |i| i.inject_content(text("kept"))).unwrap();
        assert_eq!(inputs.content.as_ref().map(Content::mime_type), Some("text/plain"));

        inject(&port, &mut inputs, "reader", |i| i.inject_content(text("stream"))).unwrap();
        let mut streamed = String::new();
        inputs.reader.read_to_string(&mut streamed).unwrap();
        assert_eq!(streamed, "stream");

        let json = Content::from_bytes(ContentOptions::new("application/json"), r#"{"name":"n"}"#);
        inject(&port, &mut inputs, "payload", |i| i.inject_content(json)).unwrap();
        assert_eq!(inputs.payload, Some(Payload { name: "n".into() }));
    }

    #[test]
    fn absent_content_is_reported() {
        let port = port();
        let mut inputs = Inputs::default();
        let absent = Content::absent(ContentOptions::new("text/plain"));
        let error = inject(&port, &mut inputs, "raw", |i| i.inject_content(absent)).unwrap_err();
        assert!(matches!(error, PortError::Content(pb_content::ContentError::NotPresent)));
    }

    #[test]
    fn any_values() {
        let port = port();
        let mut inputs = Inputs::default();
        inject(&port, &mut inputs, "any", |i| i.inject_any(json!({"k": [1]}))).unwrap();
        assert_eq!(inputs.any, json!({"k": [1]}));
    }
}
