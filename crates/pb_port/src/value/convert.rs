use core::any::{Any, TypeId};

use pb_utils::text::{lower_camel, split_list};
use serde_json::Value;

use super::{FieldMut, FieldRef, FieldValue, ListValue};
use crate::walk::leaf_fields;
use crate::{Carrier, CoercionError, FileHandle, Pojo, PortError};

fn unsupported(field: &str, type_name: &'static str, operation: &'static str) -> PortError {
    PortError::UnsupportedType {
        field: field.to_owned(),
        type_name,
        operation,
    }
}

fn allocate<'a>(
    slot: Option<&'a mut dyn FieldValue>,
    field: &str,
    type_name: &'static str,
) -> Result<&'a mut dyn FieldValue, PortError> {
    slot.ok_or_else(|| unsupported(field, type_name, "allocate a value for"))
}

// -----------------------------------------------------------------------------
// Reading

/// Text form of a value; `None` when an `Option` layer is unset.
///
/// Byte and rune lists render as a string, other lists as a comma list.
pub(crate) fn to_text(value: &dyn FieldValue, field: &str) -> Result<Option<String>, PortError> {
    let type_name = value.value_type_name();
    let text = match value.value_ref() {
        FieldRef::Scalar(scalar) => scalar.to_text(),
        FieldRef::Text(text) => text
            .marshal_text()
            .map_err(|e| CoercionError::new(type_name, "text", e))?,
        FieldRef::Indirect(None) => return Ok(None),
        FieldRef::Indirect(Some(inner)) => return to_text(inner, field),
        FieldRef::List(list) => list_text(list, field)?,
        FieldRef::Opaque(value) => match value.downcast_ref::<Value>() {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) => return Ok(None),
            Some(other) => other.to_string(),
            None => return Err(unsupported(field, type_name, "format")),
        },
        FieldRef::Map(_) | FieldRef::Struct(_) => return Err(unsupported(field, type_name, "format")),
    };
    Ok(Some(text))
}

fn list_text(list: &dyn ListValue, field: &str) -> Result<String, PortError> {
    let items = (0..list.len()).filter_map(|index| list.item(index));

    if list.item_type_id() == TypeId::of::<u8>() {
        let bytes: Vec<u8> = items.filter_map(|v| v.downcast_ref::<u8>().copied()).collect();
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }
    if list.item_type_id() == TypeId::of::<char>() {
        return Ok(items.filter_map(|v| v.downcast_ref::<char>().copied()).collect());
    }

    let mut parts = Vec::with_capacity(list.len());
    for item in items {
        parts.push(to_text(item, field)?.unwrap_or_default());
    }
    Ok(parts.join(","))
}

/// JSON form of a value; `Null` when an `Option` layer is unset.
pub(crate) fn to_json(value: &dyn FieldValue, field: &str) -> Result<Value, PortError> {
    let type_name = value.value_type_name();
    let json = match value.value_ref() {
        FieldRef::Scalar(scalar) => scalar.to_json(),
        FieldRef::Text(text) => Value::String(
            text.marshal_text()
                .map_err(|e| CoercionError::new(type_name, "text", e))?,
        ),
        FieldRef::Indirect(None) => Value::Null,
        FieldRef::Indirect(Some(inner)) => to_json(inner, field)?,
        FieldRef::List(list) => {
            let mut items = Vec::with_capacity(list.len());
            for index in 0..list.len() {
                if let Some(item) = list.item(index) {
                    items.push(to_json(item, field)?);
                }
            }
            Value::Array(items)
        }
        FieldRef::Map(map) => {
            let mut object = Pojo::new();
            for (key, value) in map.entries() {
                let key = to_text(key, field)?.unwrap_or_default();
                object.insert(key, to_json(value, field)?);
            }
            Value::Object(object)
        }
        FieldRef::Struct(carrier) => Value::Object(carrier_to_pojo(carrier)?),
        FieldRef::Opaque(value) => {
            if let Some(json) = value.downcast_ref::<Value>() {
                json.clone()
            } else if let Some(file) = value.downcast_ref::<FileHandle>() {
                serde_json::json!({
                    "filename": file.filename,
                    "contentType": file.content_type,
                    "size": file.data.len(),
                })
            } else {
                return Err(unsupported(field, type_name, "format"));
            }
        }
    };
    Ok(json)
}

/// Renders the leaf fields of a carrier keyed by lower-camel field name.
///
/// Fields inside unset embedded carriers are left out.
pub(crate) fn carrier_to_pojo(carrier: &dyn Carrier) -> Result<Pojo, PortError> {
    let mut object = Pojo::new();
    for (indices, info) in leaf_fields(carrier.info())? {
        if let Some(value) = carrier.field_at(&indices)? {
            object.insert(lower_camel(info.name()), to_json(value, info.name())?);
        }
    }
    Ok(object)
}

// -----------------------------------------------------------------------------
// Writing

/// Appends `items` to a cleared list whose elements are exactly `T`.
///
/// Returns `false` if the list holds another element type.
pub(crate) fn fill_list<T: Any>(list: &mut dyn ListValue, items: impl IntoIterator<Item = T>) -> bool {
    if list.item_type_id() != TypeId::of::<T>() {
        return false;
    }
    list.clear();
    for item in items {
        match list.push_default().and_then(|slot| slot.downcast_mut::<T>()) {
            Some(slot) => *slot = item,
            None => return false,
        }
    }
    true
}

fn assign_list_text(
    list: &mut dyn ListValue,
    text: &str,
    field: &str,
    type_name: &'static str,
) -> Result<(), PortError> {
    if fill_list(list, text.bytes()) || fill_list(list, text.chars()) {
        return Ok(());
    }
    list.clear();
    for part in split_list(text) {
        assign_text(allocate(list.push_default(), field, type_name)?, &part, field)?;
    }
    Ok(())
}

/// Parses `text` into `target`, materializing `Option` layers.
///
/// Lists take bytes, runes or a comma list depending on their element type.
pub(crate) fn assign_text(target: &mut dyn FieldValue, text: &str, field: &str) -> Result<(), PortError> {
    let type_name = target.value_type_name();
    match target.value_mut() {
        FieldMut::Scalar(scalar) => scalar.set_text(text)?,
        FieldMut::Text(value) => value
            .unmarshal_text(text)
            .map_err(|e| CoercionError::new(text, type_name, e))?,
        FieldMut::Indirect(layer) => {
            assign_text(allocate(layer.materialize(), field, type_name)?, text, field)?
        }
        FieldMut::List(list) => assign_list_text(list, text, field, type_name)?,
        FieldMut::Opaque(value) => match value.downcast_mut::<Value>() {
            Some(slot) => *slot = Value::String(text.to_owned()),
            None => return Err(unsupported(field, type_name, "parse")),
        },
        FieldMut::Map(_) | FieldMut::Struct(_) => return Err(unsupported(field, type_name, "parse")),
    }
    Ok(())
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn mismatch(value: &Value, type_name: &'static str, expected: &str) -> PortError {
    CoercionError::new(&value.to_string(), type_name, format!("expected {expected}")).into()
}

/// Stores a decoded JSON value into `target`.
///
/// `null` resets `Option` layers and clears collections; scalars keep
/// their value.
pub(crate) fn assign_json(target: &mut dyn FieldValue, value: &Value, field: &str) -> Result<(), PortError> {
    let type_name = target.value_type_name();
    match target.value_mut() {
        FieldMut::Indirect(layer) => match value {
            Value::Null => layer.reset(),
            _ => assign_json(allocate(layer.materialize(), field, type_name)?, value, field)?,
        },
        FieldMut::Scalar(scalar) => {
            if let Some(text) = json_text(value) {
                scalar.set_text(&text)?;
            }
        }
        FieldMut::Text(text_value) => {
            if let Some(text) = json_text(value) {
                text_value
                    .unmarshal_text(&text)
                    .map_err(|e| CoercionError::new(&text, type_name, e))?;
            }
        }
        FieldMut::List(list) => match value {
            Value::Null => list.clear(),
            Value::String(text) => assign_list_text(list, text, field, type_name)?,
            Value::Array(items) => {
                list.clear();
                for item in items {
                    assign_json(allocate(list.push_default(), field, type_name)?, item, field)?;
                }
            }
            other => return Err(mismatch(other, type_name, "an array")),
        },
        FieldMut::Map(map) => match value {
            Value::Null => map.clear(),
            Value::Object(entries) => {
                map.clear();
                for (name, entry) in entries {
                    let mut fill = |key: &mut dyn FieldValue, slot: &mut dyn FieldValue| {
                        assign_text(key, name, field)?;
                        assign_json(slot, entry, field)
                    };
                    if !map.insert_with(&mut fill)? {
                        return Err(unsupported(field, type_name, "allocate an entry for"));
                    }
                }
            }
            other => return Err(mismatch(other, type_name, "an object")),
        },
        FieldMut::Struct(carrier) => match value {
            Value::Null => {}
            Value::Object(entries) => assign_pojo(carrier, entries)?,
            other => return Err(mismatch(other, type_name, "an object")),
        },
        FieldMut::Opaque(opaque) => match opaque.downcast_mut::<Value>() {
            Some(slot) => *slot = value.clone(),
            None => return Err(unsupported(field, type_name, "decode")),
        },
    }
    Ok(())
}

/// Stores the entries of `object` into the leaf fields of `carrier`.
///
/// Entries are matched by lower-camel field name, then by the Rust name.
/// Unmatched entries are ignored.
pub(crate) fn assign_pojo(carrier: &mut dyn Carrier, object: &Pojo) -> Result<(), PortError> {
    for (indices, info) in leaf_fields(carrier.info())? {
        let entry = object
            .get(&lower_camel(info.name()))
            .or_else(|| object.get(info.name()));
        if let Some(entry) = entry {
            assign_json(carrier.field_at_mut(&indices)?, entry, info.name())?;
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::{assign_json, assign_text, to_json, to_text};
    use crate::{FieldMut, FieldRef, FieldValue, PortError, PortFieldType};

    struct Token;

    impl FieldValue for Token {
        fn field_type() -> PortFieldType {
            PortFieldType::unknown::<Self>()
        }

        fn value_ref(&self) -> FieldRef<'_> {
            FieldRef::Opaque(self)
        }

        fn value_mut(&mut self) -> FieldMut<'_> {
            FieldMut::Opaque(self)
        }
    }

    #[test]
    fn text_through_option_layers() {
        let mut value: Option<Option<i64>> = None;
        assign_text(&mut value, "-12", "value").unwrap();
        assert_eq!(value, Some(Some(-12)));
        assert_eq!(to_text(&value, "value").unwrap().as_deref(), Some("-12"));

        let unset: Option<i64> = None;
        assert_eq!(to_text(&unset, "value").unwrap(), None);
    }

    #[test]
    fn text_into_lists() {
        let mut bytes: Vec<u8> = Vec::new();
        assign_text(&mut bytes, "hi", "bytes").unwrap();
        assert_eq!(bytes, b"hi");

        let mut runes: Vec<char> = Vec::new();
        assign_text(&mut runes, "hé", "runes").unwrap();
        assert_eq!(runes, ['h', 'é']);

        let mut numbers: Vec<u16> = vec![9];
        assign_text(&mut numbers, "1,2,3", "numbers").unwrap();
        assert_eq!(numbers, [1, 2, 3]);
        assert_eq!(to_text(&numbers, "numbers").unwrap().as_deref(), Some("1,2,3"));
    }

    #[test]
    fn json_into_maps() {
        let mut map: BTreeMap<String, Vec<i32>> = BTreeMap::new();
        assign_json(&mut map, &json!({"a": [1, 2], "b": []}), "map").unwrap();
        assert_eq!(map["a"], [1, 2]);
        assert!(map["b"].is_empty());
        assert_eq!(to_json(&map, "map").unwrap(), json!({"a": [1, 2], "b": []}));
    }

    #[test]
    fn json_type_mismatch() {
        let mut list: Vec<String> = Vec::new();
        let error = assign_json(&mut list, &json!({"a": 1}), "list").unwrap_err();
        assert!(matches!(error, PortError::Coercion(_)));
    }

    #[test]
    fn addresses_through_layers_and_lists() {
        let mut addr: Option<IpAddr> = None;
        assign_text(&mut addr, "10.0.0.1", "addr").unwrap();
        assert_eq!(addr, Some(IpAddr::from(Ipv4Addr::new(10, 0, 0, 1))));

        let mut peers: Vec<SocketAddr> = Vec::new();
        assign_text(&mut peers, "10.0.0.1:80,[::1]:443", "peers").unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[1].port(), 443);
        assert_eq!(to_text(&peers, "peers").unwrap().as_deref(), Some("10.0.0.1:80,[::1]:443"));

        assign_json(&mut peers, &json!(["127.0.0.1:8080"]), "peers").unwrap();
        assert_eq!(peers, ["127.0.0.1:8080".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn unallocatable_layer_is_rejected() {
        let mut token: Option<Token> = None;
        let error = assign_text(&mut token, "x", "token").unwrap_err();
        assert!(matches!(
            error,
            PortError::UnsupportedType { operation: "allocate a value for", .. }
        ));

        let mut tokens: BTreeMap<String, Token> = BTreeMap::new();
        let error = assign_json(&mut tokens, &json!({"a": "b"}), "tokens").unwrap_err();
        assert!(matches!(
            error,
            PortError::UnsupportedType { operation: "allocate an entry for", .. }
        ));
    }
}
