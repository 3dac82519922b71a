//! The capability model that replaces runtime reflection.
//!
//! Every bindable field type implements [`FieldValue`]: it classifies itself
//! with [`FieldValue::field_type`] and exposes a typed view of its contents
//! through [`FieldRef`] and [`FieldMut`]. The injector and extractor only ever
//! talk to field values through these views.

use core::any::{Any, TypeId};

use crate::{Carrier, CoercionError, PortError, PortFieldType, ScalarKind, ValidationError};
use pb_content::BoxError;

mod container;
mod convert;
mod scalar;
mod text;

pub(crate) use convert::{assign_json, assign_text, fill_list, to_json, to_text};
pub use scalar::parse_bool;

// -----------------------------------------------------------------------------
// FieldValue

/// A type that can be stored in a carrier field and bound to a port.
///
/// Implemented for the scalar types, `String`, `Vec<T>`, `Option<T>`,
/// `Box<T>`, `HashMap`/`BTreeMap`, the file and content types, and every
/// derived carrier. Types with a textual form can opt in with
/// [`impl_text_field!`](crate::impl_text_field).
pub trait FieldValue: Any {
    /// Classification of the type.
    fn field_type() -> PortFieldType
    where
        Self: Sized;

    /// A fresh value for a slot that is filled in place.
    ///
    /// `None` when the type has no neutral value; `Option` layers and list
    /// elements of such a type cannot be allocated while binding.
    fn new_default() -> Option<Self>
    where
        Self: Sized,
    {
        None
    }

    fn value_ref(&self) -> FieldRef<'_>;

    fn value_mut(&mut self) -> FieldMut<'_>;

    /// Checks the value after it has been written.
    fn validate_value(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn value_type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

impl dyn FieldValue {
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

impl core::fmt::Debug for dyn FieldValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FieldValue({})", self.value_type_name())
    }
}

// -----------------------------------------------------------------------------
// Views

/// Read access to a field value, by capability.
pub enum FieldRef<'a> {
    Scalar(&'a dyn Scalar),
    Text(&'a dyn TextValue),
    /// An `Option` layer; `None` when unset.
    Indirect(Option<&'a dyn FieldValue>),
    List(&'a dyn ListValue),
    Map(&'a dyn MapValue),
    Struct(&'a dyn Carrier),
    /// Values handled by concrete type, such as files and content.
    Opaque(&'a dyn FieldValue),
}

/// Write access to a field value, by capability.
pub enum FieldMut<'a> {
    Scalar(&'a mut dyn Scalar),
    Text(&'a mut dyn TextValue),
    Indirect(&'a mut dyn Indirect),
    List(&'a mut dyn ListValue),
    Map(&'a mut dyn MapValue),
    Struct(&'a mut dyn Carrier),
    Opaque(&'a mut dyn FieldValue),
}

// -----------------------------------------------------------------------------
// Capabilities

/// Built-in scalar conversions.
pub trait Scalar {
    fn kind(&self) -> ScalarKind;

    fn to_text(&self) -> String;

    fn to_json(&self) -> serde_json::Value;

    /// Parses `text` permissively and stores the result.
    fn set_text(&mut self, text: &str) -> Result<(), CoercionError>;
}

/// Conversion through a type's own text form.
pub trait TextValue {
    fn marshal_text(&self) -> Result<String, BoxError>;

    fn unmarshal_text(&mut self, text: &str) -> Result<(), BoxError>;
}

/// A nullable layer around a value.
pub trait Indirect {
    fn pointee(&self) -> Option<&dyn FieldValue>;

    fn pointee_mut(&mut self) -> Option<&mut dyn FieldValue>;

    /// Replaces the layer with a fresh value of the pointee.
    ///
    /// `None` when the pointee has no [`FieldValue::new_default`].
    fn materialize(&mut self) -> Option<&mut dyn FieldValue>;

    fn reset(&mut self);
}

/// A growable sequence.
pub trait ListValue {
    fn len(&self) -> usize;

    fn item_type_id(&self) -> TypeId;

    fn item(&self, index: usize) -> Option<&dyn FieldValue>;

    fn clear(&mut self);

    /// Appends a fresh element and returns it, or `None` when the element
    /// type has no [`FieldValue::new_default`].
    fn push_default(&mut self) -> Option<&mut dyn FieldValue>;
}

/// Callback filling a new map entry.
pub type EntryFill<'f> =
    dyn FnMut(&mut dyn FieldValue, &mut dyn FieldValue) -> Result<(), PortError> + 'f;

/// A keyed collection.
pub trait MapValue {
    fn len(&self) -> usize;

    fn entries(&self) -> Vec<(&dyn FieldValue, &dyn FieldValue)>;

    fn clear(&mut self);

    /// Fills a fresh key and value through `fill`, then inserts them.
    ///
    /// Returns `false` without calling `fill` when the key or value type
    /// has no [`FieldValue::new_default`].
    fn insert_with(&mut self, fill: &mut EntryFill<'_>) -> Result<bool, PortError>;
}
