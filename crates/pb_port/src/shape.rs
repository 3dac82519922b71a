use core::any::TypeId;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::StructInfo;

// -----------------------------------------------------------------------------
// Shape

/// The wire category of a bound field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Shape {
    Primitive,
    Array,
    Object,
    File,
    FileArray,
    Content,
    Any,
    Unknown,
}

impl Shape {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primitive => "primitive",
            Self::Array => "array",
            Self::Object => "object",
            Self::File => "file",
            Self::FileArray => "fileArray",
            Self::Content => "content",
            Self::Any => "any",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// Handler

/// Scalar types with built-in text coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Char,
    String,
}

/// The conversion strategy used to read and write a field's base value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    Scalar(ScalarKind),
    Bytes,
    Runes,
    Text,
    Content,
    Reader,
    File,
    Any,
    List,
    Map,
    Struct,
    Unknown,
}

// -----------------------------------------------------------------------------
// StructInfoFn

/// Lazy accessor for the [`StructInfo`] of a nested carrier.
///
/// Kept as a function pointer so self-referencing carriers can describe
/// their element types without recursing at construction.
#[derive(Clone, Copy)]
pub struct StructInfoFn(pub fn() -> &'static StructInfo);

impl StructInfoFn {
    #[inline]
    pub fn get(self) -> &'static StructInfo {
        (self.0)()
    }
}

impl PartialEq for StructInfoFn {
    fn eq(&self, other: &Self) -> bool {
        self.get().type_id() == other.get().type_id()
    }
}

impl fmt::Debug for StructInfoFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StructInfoFn")
            .field(&self.get().type_name())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// PortFieldType

/// Classification of a field type.
///
/// `type_name` and `type_id` describe the base type, after every `Option`
/// layer counted in `indirections` has been removed.
#[derive(Debug, Clone, PartialEq)]
pub struct PortFieldType {
    pub shape: Shape,
    pub type_name: &'static str,
    pub type_id: TypeId,
    pub indirections: usize,
    pub handler: Handler,
    pub optional: bool,
    pub items: Option<Box<PortFieldType>>,
    pub keys: Option<Box<PortFieldType>>,
    pub values: Option<Box<PortFieldType>>,
    pub struct_info: Option<StructInfoFn>,
}

impl PortFieldType {
    pub fn new<T: ?Sized + 'static>(shape: Shape, handler: Handler, optional: bool) -> Self {
        Self {
            shape,
            type_name: core::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            indirections: 0,
            handler,
            optional,
            items: None,
            keys: None,
            values: None,
            struct_info: None,
        }
    }

    #[inline]
    pub fn scalar<T: 'static>(kind: ScalarKind) -> Self {
        Self::new::<T>(Shape::Primitive, Handler::Scalar(kind), false)
    }

    #[inline]
    pub fn text<T: 'static>() -> Self {
        Self::new::<T>(Shape::Primitive, Handler::Text, false)
    }

    #[inline]
    pub fn unknown<T: ?Sized + 'static>() -> Self {
        Self::new::<T>(Shape::Unknown, Handler::Unknown, true)
    }

    /// Object shape for a derived carrier.
    #[inline]
    pub fn carrier<T: 'static>(info: fn() -> &'static StructInfo) -> Self {
        Self::new::<T>(Shape::Object, Handler::Struct, false).with_struct_info(info)
    }

    pub fn with_items(mut self, items: PortFieldType) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    pub fn with_entries(mut self, keys: PortFieldType, values: PortFieldType) -> Self {
        self.keys = Some(Box::new(keys));
        self.values = Some(Box::new(values));
        self
    }

    pub fn with_struct_info(mut self, info: fn() -> &'static StructInfo) -> Self {
        self.struct_info = Some(StructInfoFn(info));
        self
    }

    /// Adds one `Option` layer.
    pub fn indirect(mut self) -> Self {
        self.indirections += 1;
        self.optional = true;
        self
    }

    #[inline]
    pub fn struct_info(&self) -> Option<&'static StructInfo> {
        self.struct_info.map(StructInfoFn::get)
    }

    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::Shape;

    #[test]
    fn shape_names_are_lower_camel() {
        assert_eq!(Shape::FileArray.to_string(), "fileArray");
        assert_eq!(serde_json::to_string(&Shape::FileArray).unwrap(), "\"fileArray\"");
        let shape: Shape = serde_json::from_str("\"content\"").unwrap();
        assert_eq!(shape, Shape::Content);
    }
}
