use serde_json::Value;

use super::{FieldMut, FieldRef, FieldValue, Scalar};
use crate::{CoercionError, PortFieldType, ScalarKind};

// -----------------------------------------------------------------------------
// Parsing

/// Parses the boolean spellings accepted on the wire.
///
/// # Examples
///
/// ```
/// use pb_port::value::parse_bool;
///
/// assert_eq!(parse_bool("T"), Some(true));
/// assert_eq!(parse_bool("0"), Some(false));
/// assert_eq!(parse_bool("yes"), None);
/// ```
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

// `12.000` parses as `12`, but `12.` and `12.5` do not.
fn trim_zero_decimal(text: &str) -> &str {
    let trimmed = text.trim_end_matches('0');
    match trimmed.strip_suffix('.') {
        Some(head) if trimmed.len() < text.len() => head,
        _ => text,
    }
}

fn parse_integer(text: &str) -> Result<i128, String> {
    let text = trim_zero_decimal(text);
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        Some("0o" | "0O") => (8, &unsigned[2..]),
        Some("0b" | "0B") => (2, &unsigned[2..]),
        _ => (10, unsigned),
    };

    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') {
        return Err("invalid syntax".to_owned());
    }
    let digits = digits.replace('_', "");
    if digits.starts_with(['+', '-']) {
        return Err("invalid syntax".to_owned());
    }

    let magnitude = u128::from_str_radix(&digits, radix).map_err(|e| e.to_string())?;
    let value = i128::try_from(magnitude).map_err(|_| "value out of range".to_owned())?;
    Ok(if negative { -value } else { value })
}

fn parse_int<T: TryFrom<i128>>(text: &str) -> Result<T, CoercionError> {
    let target = core::any::type_name::<T>();
    let value = parse_integer(text).map_err(|reason| CoercionError::new(text, target, reason))?;
    T::try_from(value).map_err(|_| CoercionError::new(text, target, "value out of range"))
}

fn parse_float<T: core::str::FromStr>(text: &str) -> Result<T, CoercionError>
where
    T::Err: core::fmt::Display,
{
    text.parse::<T>()
        .map_err(|e| CoercionError::new(text, core::any::type_name::<T>(), e))
}

// -----------------------------------------------------------------------------
// Implementations

macro_rules! impl_scalar_field {
    ($ty:ty, $kind:ident) => {
        impl FieldValue for $ty {
            #[inline]
            fn field_type() -> PortFieldType {
                PortFieldType::scalar::<$ty>(ScalarKind::$kind)
            }

            #[inline]
            fn new_default() -> Option<Self> {
                Some(<$ty>::default())
            }

            #[inline]
            fn value_ref(&self) -> FieldRef<'_> {
                FieldRef::Scalar(self)
            }

            #[inline]
            fn value_mut(&mut self) -> FieldMut<'_> {
                FieldMut::Scalar(self)
            }
        }
    };
}

macro_rules! impl_int_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Scalar for $ty {
            #[inline]
            fn kind(&self) -> ScalarKind {
                ScalarKind::$kind
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn to_json(&self) -> Value {
                Value::from(*self)
            }

            fn set_text(&mut self, text: &str) -> Result<(), CoercionError> {
                *self = parse_int::<$ty>(text)?;
                Ok(())
            }
        }

        impl_scalar_field!($ty, $kind);
    )*};
}

impl_int_scalar! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
}

macro_rules! impl_float_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Scalar for $ty {
            #[inline]
            fn kind(&self) -> ScalarKind {
                ScalarKind::$kind
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn to_json(&self) -> Value {
                serde_json::Number::from_f64(f64::from(*self))
                    .map_or(Value::Null, Value::Number)
            }

            fn set_text(&mut self, text: &str) -> Result<(), CoercionError> {
                *self = parse_float::<$ty>(text)?;
                Ok(())
            }
        }

        impl_scalar_field!($ty, $kind);
    )*};
}

impl_float_scalar! {
    f32 => F32,
    f64 => F64,
}

impl Scalar for bool {
    #[inline]
    fn kind(&self) -> ScalarKind {
        ScalarKind::Bool
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }

    fn set_text(&mut self, text: &str) -> Result<(), CoercionError> {
        *self = parse_bool(text).ok_or_else(|| CoercionError::new(text, "bool", "invalid syntax"))?;
        Ok(())
    }
}

impl_scalar_field!(bool, Bool);

impl Scalar for char {
    #[inline]
    fn kind(&self) -> ScalarKind {
        ScalarKind::Char
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }

    fn set_text(&mut self, text: &str) -> Result<(), CoercionError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                *self = c;
                Ok(())
            }
            _ => Err(CoercionError::new(text, "char", "expected exactly one character")),
        }
    }
}

impl_scalar_field!(char, Char);

impl Scalar for String {
    #[inline]
    fn kind(&self) -> ScalarKind {
        ScalarKind::String
    }

    fn to_text(&self) -> String {
        self.clone()
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }

    fn set_text(&mut self, text: &str) -> Result<(), CoercionError> {
        text.clone_into(self);
        Ok(())
    }
}

impl_scalar_field!(String, String);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Scalar, parse_int};

    fn set<T: Scalar + Default>(text: &str) -> Result<T, crate::CoercionError> {
        let mut value = T::default();
        value.set_text(text)?;
        Ok(value)
    }

    #[test]
    fn integers_accept_prefixes_and_zero_decimals() {
        assert_eq!(parse_int::<i32>("42"), Ok(42));
        assert_eq!(parse_int::<i32>("-0x1f"), Ok(-31));
        assert_eq!(parse_int::<u8>("0b101"), Ok(5));
        assert_eq!(parse_int::<i64>("1_000"), Ok(1000));
        assert_eq!(parse_int::<i32>("12.000"), Ok(12));
        assert!(parse_int::<i32>("12.5").is_err());
        assert!(parse_int::<i32>("12.").is_err());
        assert!(parse_int::<i32>("").is_err());
        assert!(parse_int::<i32>("--1").is_err());
    }

    #[test]
    fn integers_are_range_checked() {
        assert_eq!(parse_int::<u8>("255"), Ok(255));
        let error = parse_int::<u8>("256").unwrap_err();
        assert_eq!(error.target, "u8");
        assert_eq!(error.reason, "value out of range");
        assert!(parse_int::<u32>("-1").is_err());
    }

    #[test]
    fn scalar_text_round_trip() {
        assert!(set::<bool>("True").unwrap());
        assert!(set::<bool>("yes").is_err());
        assert_eq!(set::<f64>("2.5").unwrap(), 2.5);
        assert_eq!(set::<char>("x").unwrap(), 'x');
        assert!(set::<char>("xy").is_err());
        assert_eq!(set::<String>("any text").unwrap(), "any text");
        assert_eq!(7u16.to_text(), "7");
        assert_eq!(1.5f32.to_text(), "1.5");
    }

    #[test]
    fn floats_render_as_json_numbers() {
        assert_eq!(2.5f64.to_json(), serde_json::json!(2.5));
        assert_eq!(f64::NAN.to_json(), serde_json::Value::Null);
        assert_eq!(3i8.to_json(), serde_json::json!(3));
    }
}
