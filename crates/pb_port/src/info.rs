use core::any::{Any, TypeId};
use core::fmt;
use std::sync::OnceLock;

use pb_content::Entity;

use crate::value::FieldValue;
use crate::{PortError, PortFieldType, ValidationError};

// -----------------------------------------------------------------------------
// FieldInfo

/// Compile-time description of one carrier field.
#[derive(Debug)]
pub struct FieldInfo {
    name: &'static str,
    index: usize,
    type_name: &'static str,
    tags: &'static [(&'static str, &'static str)],
    port_type: fn() -> PortFieldType,
    embedded: Option<fn() -> &'static StructInfo>,
}

impl FieldInfo {
    pub const fn new(
        name: &'static str,
        index: usize,
        type_name: &'static str,
        port_type: fn() -> PortFieldType,
    ) -> Self {
        Self {
            name,
            index,
            type_name,
            tags: &[],
            port_type,
            embedded: None,
        }
    }

    /// Annotation entries in declaration order.
    pub const fn with_tags(mut self, tags: &'static [(&'static str, &'static str)]) -> Self {
        self.tags = tags;
        self
    }

    /// Marks the field as a flattened carrier.
    pub const fn with_embedded(mut self, info: fn() -> &'static StructInfo) -> Self {
        self.embedded = Some(info);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn tags(&self) -> &'static [(&'static str, &'static str)] {
        self.tags
    }

    /// The first annotation value stored under `key`.
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| *value)
    }

    /// Classification of the declared field type.
    #[inline]
    pub fn port_field_type(&self) -> PortFieldType {
        (self.port_type)()
    }

    #[inline]
    pub fn is_embedded(&self) -> bool {
        self.embedded.is_some()
    }

    #[inline]
    pub fn embedded_info(&self) -> Option<&'static StructInfo> {
        self.embedded.map(|info| info())
    }
}

// -----------------------------------------------------------------------------
// StructInfo

/// Compile-time description of a carrier struct.
pub struct StructInfo {
    type_name: &'static str,
    type_id: TypeId,
    fields: Box<[FieldInfo]>,
}

impl StructInfo {
    pub fn new<T: Any>(fields: Vec<FieldInfo>) -> Self {
        Self {
            type_name: core::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            fields: fields.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    #[inline]
    pub fn field(&self, index: usize) -> Option<&FieldInfo> {
        self.fields.get(index)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl fmt::Debug for StructInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructInfo")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.iter().map(FieldInfo::name).collect::<Vec<_>>())
            .finish()
    }
}

/// Process-wide storage for a derived carrier's [`StructInfo`].
pub struct StructInfoCell(OnceLock<StructInfo>);

impl StructInfoCell {
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    #[inline]
    pub fn get_or_init(&self, f: impl FnOnce() -> StructInfo) -> &StructInfo {
        self.0.get_or_init(f)
    }
}

// -----------------------------------------------------------------------------
// Carrier

/// A struct whose fields bind to a port.
///
/// Implemented with `#[derive(Carrier)]`. Fields are addressed by
/// declaration index; flattened fields are reached through [`embedded`]
/// and [`embedded_mut`].
///
/// [`embedded`]: Carrier::embedded
/// [`embedded_mut`]: Carrier::embedded_mut
pub trait Carrier: Any {
    fn struct_info() -> &'static StructInfo
    where
        Self: Sized;

    fn info(&self) -> &'static StructInfo;

    /// The value of a non-flattened field, if its type is bindable.
    fn field(&self, index: usize) -> Option<&dyn FieldValue>;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn FieldValue>;

    /// The serde view of a field, if its type supports serde.
    fn entity(&self, index: usize) -> Option<&dyn Entity>;

    fn entity_mut(&mut self, index: usize) -> Option<&mut dyn Entity>;

    /// A flattened carrier, or `None` when it is unset.
    fn embedded(&self, index: usize) -> Option<&dyn Carrier>;

    /// A flattened carrier, allocated first when it is unset.
    fn embedded_mut(&mut self, index: usize) -> Option<&mut dyn Carrier>;

    /// Struct-level validation, run after population.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl dyn Carrier {
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

    fn invalid_path(&self, indices: &[usize]) -> PortError {
        PortError::InvalidPath {
            carrier: self.info().type_name(),
            indices: indices.to_vec(),
        }
    }

    /// Follows `indices` to a leaf field.
    ///
    /// Returns `Ok(None)` when an embedded carrier on the way is unset.
    pub fn field_at(&self, indices: &[usize]) -> Result<Option<&dyn FieldValue>, PortError> {
        let Some((&last, parents)) = indices.split_last() else {
            return Err(self.invalid_path(indices));
        };

        let mut carrier: &dyn Carrier = self;
        for &index in parents {
            if !carrier.info().field(index).is_some_and(FieldInfo::is_embedded) {
                return Err(self.invalid_path(indices));
            }
            match carrier.embedded(index) {
                Some(next) => carrier = next,
                None => return Ok(None),
            }
        }

        match carrier.field(last) {
            Some(value) => Ok(Some(value)),
            None => Err(self.invalid_path(indices)),
        }
    }

    /// Follows `indices` to a leaf field, allocating unset embedded carriers.
    pub fn field_at_mut(&mut self, indices: &[usize]) -> Result<&mut dyn FieldValue, PortError> {
        let carrier_name = self.info().type_name();
        let invalid = || PortError::InvalidPath {
            carrier: carrier_name,
            indices: indices.to_vec(),
        };
        let Some((&last, parents)) = indices.split_last() else {
            return Err(invalid());
        };

        let mut carrier: &mut dyn Carrier = self;
        for &index in parents {
            match carrier.embedded_mut(index) {
                Some(next) => carrier = next,
                None => return Err(invalid()),
            }
        }
        carrier.field_mut(last).ok_or_else(invalid)
    }

    /// The serde view of the field at `indices`, if it has one and every
    /// embedded carrier on the way is set.
    pub fn entity_at(&self, indices: &[usize]) -> Result<Option<&dyn Entity>, PortError> {
        let Some((&last, parents)) = indices.split_last() else {
            return Err(self.invalid_path(indices));
        };

        let mut carrier: &dyn Carrier = self;
        for &index in parents {
            match carrier.embedded(index) {
                Some(next) => carrier = next,
                None => return Ok(None),
            }
        }
        Ok(carrier.entity(last))
    }

    /// The serde view of the field at `indices`, allocating unset embedded
    /// carriers.
    pub fn entity_at_mut(&mut self, indices: &[usize]) -> Result<Option<&mut dyn Entity>, PortError> {
        let carrier_name = self.info().type_name();
        let invalid = || PortError::InvalidPath {
            carrier: carrier_name,
            indices: indices.to_vec(),
        };
        let Some((&last, parents)) = indices.split_last() else {
            return Err(invalid());
        };

        let mut carrier: &mut dyn Carrier = self;
        for &index in parents {
            match carrier.embedded_mut(index) {
                Some(next) => carrier = next,
                None => return Err(invalid()),
            }
        }
        Ok(carrier.entity_mut(last))
    }
}

impl fmt::Debug for dyn Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Carrier({})", self.info().type_name())
    }
}

// -----------------------------------------------------------------------------
// Embed

/// A field type that can be flattened into its parent carrier.
///
/// Implemented by the derive for every carrier, and for `Option` and `Box`
/// around an embeddable type.
pub trait Embed: 'static {
    fn embedded_info() -> &'static StructInfo
    where
        Self: Sized;

    /// The carrier, or `None` when an `Option` layer is unset.
    fn as_carrier(&self) -> Option<&dyn Carrier>;

    /// The carrier, allocating unset `Option` layers.
    fn as_carrier_mut(&mut self) -> &mut dyn Carrier;
}

impl<T: Embed + Default> Embed for Option<T> {
    #[inline]
    fn embedded_info() -> &'static StructInfo {
        T::embedded_info()
    }

    fn as_carrier(&self) -> Option<&dyn Carrier> {
        self.as_ref().and_then(|value| value.as_carrier())
    }

    fn as_carrier_mut(&mut self) -> &mut dyn Carrier {
        self.get_or_insert_with(T::default).as_carrier_mut()
    }
}

impl<T: Embed> Embed for Box<T> {
    #[inline]
    fn embedded_info() -> &'static StructInfo {
        T::embedded_info()
    }

    #[inline]
    fn as_carrier(&self) -> Option<&dyn Carrier> {
        (**self).as_carrier()
    }

    #[inline]
    fn as_carrier_mut(&mut self) -> &mut dyn Carrier {
        (**self).as_carrier_mut()
    }
}
