//! Reads carrier fields for encoding into a transport.

use alloc::borrow::Cow;

use pb_content::{ContentError, EntityRef};
use pb_utils::text::split_list;
use serde_json::Value;

use crate::value::{FieldRef, FieldValue, to_json, to_text};
use crate::{Carrier, CoercionError, Handler, Pojo, PortError, PortField, ScalarKind, Shape};

/// Extracts the value of one field from a carrier.
///
/// A value is absent when an `Option` layer on the way is unset. Absent
/// values fall back to the field's `const` option and then to its `default`
/// option; a value that is still absent is an error unless the field is
/// optional. Extraction never modifies the carrier.
///
/// # Examples
///
/// ```
/// use pb_port::{Carrier, CardinalityRange, FieldGroup, PortDirection, PortFieldExtractor, PortReflector};
///
/// #[derive(Carrier, Default)]
/// struct Outputs {
///     #[port(resp = "header,default=none")]
///     etag: Option<String>,
///     #[port(resp = "header")]
///     count: u32,
/// }
///
/// let port = PortReflector::new(PortDirection::Out)
///     .with_field_group("header", FieldGroup::new(CardinalityRange::zero_to_many()))
///     .reflect_port::<Outputs>("resp")
///     .unwrap();
///
/// let outputs = Outputs { etag: None, count: 3 };
/// let etag = PortFieldExtractor::new(&port.fields()[0], &outputs);
/// let count = PortFieldExtractor::new(&port.fields()[1], &outputs);
/// assert_eq!(etag.extract_primitive().unwrap().as_deref(), Some("none"));
/// assert_eq!(count.extract_primitive().unwrap().as_deref(), Some("3"));
/// ```
pub struct PortFieldExtractor<'a> {
    field: &'a PortField,
    source: &'a dyn Carrier,
}

impl<'a> PortFieldExtractor<'a> {
    pub fn new(field: &'a PortField, source: &'a dyn Carrier) -> Self {
        Self { field, source }
    }

    #[inline]
    fn name(&self) -> &'static str {
        self.field.name
    }

    /// The value beneath every `Option` layer, or `None` when a layer is
    /// unset. No fallback is applied.
    pub fn extract_raw_value(&self) -> Result<Option<&'a dyn FieldValue>, PortError> {
        if self.field.port_type.handler == Handler::Unknown {
            return Err(PortError::UnsupportedType {
                field: self.name().to_owned(),
                type_name: self.field.port_type.type_name,
                operation: "read",
            });
        }

        let Some(mut value) = self.source.field_at(&self.field.indices)? else {
            return Ok(None);
        };
        loop {
            match value.value_ref() {
                FieldRef::Indirect(Some(inner)) => value = inner,
                FieldRef::Indirect(None) => return Ok(None),
                _ => return Ok(Some(value)),
            }
        }
    }

    /// The JSON form of the value or its fallback; `None` when both are
    /// absent.
    pub fn extract_value(&self) -> Result<Option<Value>, PortError> {
        let value = match self.extract_raw_value() {
            Ok(Some(value)) => to_json(value, self.name())?,
            Ok(None) => Value::Null,
            Err(PortError::UnsupportedType { .. }) => self.entity_json()?.unwrap_or(Value::Null),
            Err(error) => return Err(error),
        };
        if !value.is_null() {
            return Ok(Some(value));
        }
        self.fallback_json()
    }

    /// The text form of a primitive value.
    ///
    /// Empty text counts as absent, so `default` also applies to fields
    /// left at an empty string.
    pub fn extract_primitive(&self) -> Result<Option<String>, PortError> {
        let text = match self.extract_raw_value()? {
            Some(value) => to_text(value, self.name())?,
            None => None,
        };

        match text.filter(|text| !text.is_empty()) {
            Some(text) => Ok(Some(text)),
            None => {
                let fallback = self.fallback_text().map(str::to_owned);
                self.require(fallback)
            }
        }
    }

    /// The text form of every element of a list value.
    ///
    /// Non-list values are rendered as text and split on commas. An empty
    /// list is replaced by the fallback when the field has one.
    pub fn extract_array(&self) -> Result<Option<Vec<String>>, PortError> {
        let items = match self.extract_raw_value()? {
            Some(value) => match value.value_ref() {
                FieldRef::List(list) if list.item_type_id() != core::any::TypeId::of::<u8>() => {
                    let mut items = Vec::with_capacity(list.len());
                    for index in 0..list.len() {
                        if let Some(text) = list
                            .item(index)
                            .map(|item| to_text(item, self.name()))
                            .transpose()?
                            .flatten()
                        {
                            items.push(text);
                        }
                    }
                    Some(items)
                }
                _ => to_text(value, self.name())?.map(|text| split_list(&text)),
            },
            None => None,
        };

        match items {
            Some(items) if !items.is_empty() || self.field.fallback_value().is_none() => Ok(Some(items)),
            _ => {
                let fallback = self.fallback_text().map(split_list);
                self.require(fallback)
            }
        }
    }

    /// The JSON object form of a map or nested carrier.
    pub fn extract_object(&self) -> Result<Option<Pojo>, PortError> {
        let value = match self.extract_raw_value() {
            Ok(Some(value)) => to_json(value, self.name())?,
            Ok(None) => Value::Null,
            Err(PortError::UnsupportedType { .. }) => self.entity_json()?.unwrap_or(Value::Null),
            Err(error) => return Err(error),
        };

        match value {
            Value::Object(object) => Ok(Some(object)),
            Value::Null => {
                let fallback = match self.fallback_text() {
                    Some(text) => Some(
                        serde_json::from_str::<Pojo>(text)
                            .map_err(|e| CoercionError::new(text, "object", e))?,
                    ),
                    None => None,
                };
                self.require(fallback)
            }
            other => Err(CoercionError::new(&other.to_string(), "object", "expected an object").into()),
        }
    }

    /// The value as a marshaler input.
    ///
    /// Byte, rune and string values pass through as raw data; serde types
    /// are marshaled directly; other bindable values go through their JSON
    /// form.
    pub fn extract_entity(&self) -> Result<Option<EntityRef<'a>>, PortError> {
        let entity = match self.extract_raw_value() {
            Ok(Some(value)) => Some(self.value_entity(value)?),
            Ok(None) => None,
            Err(PortError::UnsupportedType { .. }) => {
                let present = self.entity_json()?.is_some_and(|json| !json.is_null());
                match self.source.entity_at(&self.field.indices)? {
                    Some(entity) if present => Some(EntityRef::Entity(entity.as_serialize())),
                    _ => None,
                }
            }
            Err(error) => return Err(error),
        };

        match entity {
            Some(entity) => Ok(Some(entity)),
            None => {
                let fallback = self.fallback_json()?.map(EntityRef::Value);
                match fallback {
                    Some(entity) => Ok(Some(entity)),
                    None if self.field.optional => Ok(None),
                    None => Err(PortError::MissingRequiredValue(self.name().to_owned())),
                }
            }
        }
    }

    fn value_entity(&self, value: &'a dyn FieldValue) -> Result<EntityRef<'a>, PortError> {
        match self.field.port_type.handler {
            Handler::Bytes => {
                if let Some(bytes) = value.downcast_ref::<Vec<u8>>() {
                    return Ok(EntityRef::Bytes(Cow::Borrowed(bytes)));
                }
            }
            Handler::Runes => {
                if let Some(runes) = value.downcast_ref::<Vec<char>>() {
                    return Ok(EntityRef::Text(Cow::Owned(runes.iter().collect())));
                }
            }
            Handler::Scalar(ScalarKind::String) => {
                if let Some(text) = value.downcast_ref::<String>() {
                    return Ok(EntityRef::Text(Cow::Borrowed(text)));
                }
            }
            _ => {}
        }

        if let Some(entity) = self.source.entity_at(&self.field.indices)? {
            return Ok(EntityRef::Entity(entity.as_serialize()));
        }
        Ok(EntityRef::Value(to_json(value, self.name())?))
    }

    /// The serde form of a field without a value view.
    fn entity_json(&self) -> Result<Option<Value>, PortError> {
        let Some(entity) = self.source.entity_at(&self.field.indices)? else {
            return Err(PortError::UnsupportedType {
                field: self.name().to_owned(),
                type_name: self.field.port_type.type_name,
                operation: "serialize",
            });
        };
        let json = serde_json::to_value(entity.as_serialize()).map_err(|e| ContentError::Marshal {
            format: "json",
            source: Box::new(e),
        })?;
        Ok(Some(json))
    }

    fn fallback_text(&self) -> Option<&'a str> {
        let fallback = self.field.fallback_value();
        if fallback.is_some() {
            log::trace!("field {:?} uses its fallback value", self.name());
        }
        fallback
    }

    /// The fallback shaped by the field's shape.
    fn fallback_json(&self) -> Result<Option<Value>, PortError> {
        let Some(text) = self.fallback_text() else {
            return Ok(None);
        };
        let value = match self.field.shape() {
            Shape::Array | Shape::FileArray => {
                Value::Array(split_list(text).into_iter().map(Value::String).collect())
            }
            Shape::Object => serde_json::from_str(text).map_err(|e| CoercionError::new(text, "object", e))?,
            Shape::Any | Shape::Content => {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
            }
            _ => Value::String(text.to_owned()),
        };
        Ok(Some(value))
    }

    fn require<T>(&self, value: Option<T>) -> Result<Option<T>, PortError> {
        match value {
            Some(value) => Ok(Some(value)),
            None if self.field.optional => {
                log::trace!("optional field {:?} has no value", self.name());
                Ok(None)
            }
            None => Err(PortError::MissingRequiredValue(self.name().to_owned())),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pb_content::EntityRef;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::PortFieldExtractor;
    use crate::{
        CardinalityRange, Carrier, FieldGroup, Port, PortDirection, PortError, PortReflector,
    };

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Payload {
        id: u32,
    }

    #[derive(Carrier, Default)]
    struct Details {
        size: u64,
        label: Option<String>,
    }

    #[derive(Carrier, Default)]
    struct Outputs {
        #[port(t = "g")]
        plain: i16,
        #[port(t = "g")]
        nested: Option<Option<bool>>,
        #[port(t = "g", default = "fallback")]
        defaulted: Option<String>,
        #[port(t = "g,const=fixed", default = "ignored")]
        constant: Option<String>,
        #[port(t = "g,required")]
        required: Option<String>,
        #[port(t = "g,optional")]
        optional: Option<String>,
        #[port(t = "g")]
        list: Vec<u8>,
        #[port(t = "g", default = "x,y")]
        names: Vec<String>,
        #[port(t = "g")]
        map: BTreeMap<String, i32>,
        #[port(t = "g")]
        details: Option<Details>,
        #[port(t = "g")]
        payload: Option<Payload>,
        #[port(t = "g")]
        text: String,
    }

    fn port() -> Port {
        PortReflector::new(PortDirection::Out)
            .with_field_group("g", FieldGroup::new(CardinalityRange::zero_to_many()))
            .reflect_port::<Outputs>("t")
            .unwrap()
    }

    fn extractor<'a>(port: &'a Port, outputs: &'a Outputs, name: &str) -> PortFieldExtractor<'a> {
        PortFieldExtractor::new(port.field_by_name(name).unwrap(), outputs)
    }

    #[test]
    fn primitives_and_fallbacks() {
        let port = port();
        let outputs = Outputs {
            plain: -4,
            nested: Some(Some(true)),
            ..Default::default()
        };
        let primitive = |name| extractor(&port, &outputs, name).extract_primitive();

        assert_eq!(primitive("plain").unwrap().as_deref(), Some("-4"));
        assert_eq!(primitive("nested").unwrap().as_deref(), Some("true"));
        assert_eq!(primitive("defaulted").unwrap().as_deref(), Some("fallback"));
        assert_eq!(primitive("constant").unwrap().as_deref(), Some("fixed"));
        assert_eq!(primitive("optional").unwrap(), None);
        assert!(matches!(
            primitive("required"),
            Err(PortError::MissingRequiredValue(name)) if name == "required"
        ));
    }

    #[test]
    fn unset_inner_layer_is_absent() {
        let port = port();
        let outputs = Outputs {
            nested: Some(None),
            ..Default::default()
        };
        let nested = extractor(&port, &outputs, "nested");
        assert!(nested.extract_raw_value().unwrap().is_none());
        assert_eq!(nested.extract_primitive().unwrap(), None);

        let outputs = Outputs {
            required: Some(String::new()),
            ..Default::default()
        };
        let required = extractor(&port, &outputs, "required");
        assert!(matches!(required.extract_primitive(), Err(PortError::MissingRequiredValue(_))));
    }

    #[test]
    fn arrays() {
        let port = port();
        let outputs = Outputs {
            list: b"ab".to_vec(),
            ..Default::default()
        };
        assert_eq!(
            extractor(&port, &outputs, "list").extract_array().unwrap(),
            Some(vec!["ab".to_owned()])
        );
        assert_eq!(
            extractor(&port, &outputs, "names").extract_array().unwrap(),
            Some(vec!["x".to_owned(), "y".to_owned()])
        );

        let outputs = Outputs {
            names: vec!["z".into()],
            ..Default::default()
        };
        assert_eq!(
            extractor(&port, &outputs, "names").extract_array().unwrap(),
            Some(vec!["z".to_owned()])
        );
    }

    #[test]
    fn objects() {
        let port = port();
        let outputs = Outputs {
            map: BTreeMap::from([("a".to_owned(), 1)]),
            details: Some(Details {
                size: 2,
                label: None,
            }),
            payload: Some(Payload { id: 9 }),
            ..Default::default()
        };

        let map = extractor(&port, &outputs, "map").extract_object().unwrap().unwrap();
        assert_eq!(map["a"], json!(1));

        let details = extractor(&port, &outputs, "details").extract_object().unwrap().unwrap();
        assert_eq!(serde_json::Value::Object(details), json!({"size": 2, "label": null}));

        let payload = extractor(&port, &outputs, "payload").extract_object().unwrap().unwrap();
        assert_eq!(payload["id"], json!(9));

        let error = extractor(&port, &outputs, "plain").extract_object().unwrap_err();
        assert!(matches!(error, PortError::Coercion(_)));
    }

    #[test]
    fn values_and_entities() {
        let port = port();
        let outputs = Outputs {
            text: "body".into(),
            payload: Some(Payload { id: 1 }),
            ..Default::default()
        };

        assert_eq!(
            extractor(&port, &outputs, "plain").extract_value().unwrap(),
            Some(json!(0))
        );
        assert_eq!(
            extractor(&port, &outputs, "defaulted").extract_value().unwrap(),
            Some(json!("fallback"))
        );
        assert_eq!(extractor(&port, &outputs, "optional").extract_value().unwrap(), None);

        let text = extractor(&port, &outputs, "text").extract_entity().unwrap();
        assert!(matches!(text, Some(EntityRef::Text(ref t)) if t == "body"));

        let payload = extractor(&port, &outputs, "payload").extract_entity().unwrap();
        assert!(matches!(payload, Some(EntityRef::Entity(_))));

        let empty = Outputs::default();
        assert!(extractor(&port, &empty, "payload").extract_entity().unwrap().is_none());
    }

    #[test]
    fn injected_scalars_read_back_unchanged() {
        use core::net::IpAddr;

        use pb_content::ContentRegistry;

        use crate::PortFieldInjector;

        #[derive(Carrier, Default)]
        struct Scalars {
            #[port(t = "g")]
            i8: i8,
            #[port(t = "g")]
            i16: i16,
            #[port(t = "g")]
            i32: i32,
            #[port(t = "g")]
            i64: i64,
            #[port(t = "g")]
            isize: isize,
            #[port(t = "g")]
            u8: u8,
            #[port(t = "g")]
            u16: u16,
            #[port(t = "g")]
            u32: u32,
            #[port(t = "g")]
            u64: u64,
            #[port(t = "g")]
            usize: usize,
            #[port(t = "g")]
            f32: f32,
            #[port(t = "g")]
            f64: f64,
            #[port(t = "g")]
            bool: bool,
            #[port(t = "g")]
            char: char,
            #[port(t = "g")]
            string: String,
            #[port(t = "g")]
            deep: Option<Option<Option<i32>>>,
            #[port(t = "g")]
            deep_addr: Option<Option<Box<Option<IpAddr>>>>,
        }

        let port = PortReflector::new(PortDirection::In)
            .with_field_group("g", FieldGroup::new(CardinalityRange::zero_to_many()))
            .reflect_port::<Scalars>("t")
            .unwrap();
        let registry = ContentRegistry::default();
        let cases = [
            ("i8", "-128"),
            ("i16", "-32768"),
            ("i32", "-2147483648"),
            ("i64", "-9000000000"),
            ("isize", "-42"),
            ("u8", "255"),
            ("u16", "65535"),
            ("u32", "4294967295"),
            ("u64", "18446744073709551615"),
            ("usize", "42"),
            ("f32", "1.5"),
            ("f64", "-0.25"),
            ("bool", "true"),
            ("char", "é"),
            ("string", "text"),
            ("deep", "-7"),
            ("deep_addr", "fe80::1"),
        ];
        assert_eq!(port.fields().len(), cases.len());

        let mut scalars = Scalars::default();
        for (name, text) in cases {
            let field = port.field_by_name(name).unwrap();
            PortFieldInjector::new(field, &mut scalars, &registry)
                .inject_primitive(text)
                .unwrap();
        }
        assert_eq!(scalars.deep, Some(Some(Some(-7))));
        assert_eq!(port.field_by_name("deep_addr").unwrap().port_type.indirections, 3);

        for (name, text) in cases {
            let field = port.field_by_name(name).unwrap();
            let value = PortFieldExtractor::new(field, &scalars).extract_primitive().unwrap();
            assert_eq!(value.as_deref(), Some(text), "{name}");
        }

        scalars.deep = Some(None);
        let deep = port.field_by_name("deep").unwrap();
        assert_eq!(PortFieldExtractor::new(deep, &scalars).extract_primitive().unwrap(), None);
    }
}
