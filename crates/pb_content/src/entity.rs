use std::borrow::Cow;
use std::io::Write;

use serde::Serialize;
use serde::de::DeserializeOwned;

// -----------------------------------------------------------------------------
// Entity

/// A value that marshalers can write and read in place.
///
/// Implemented for every `Serialize + DeserializeOwned` type, so any serde
/// type can be used behind `dyn Entity`.
pub trait Entity {
    /// Serializable view of the value.
    fn as_serialize(&self) -> &dyn erased_serde::Serialize;

    /// Replaces the value with one deserialized from `deserializer`.
    fn deserialize_in_place(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), erased_serde::Error>;

    fn entity_type_name(&self) -> &'static str;
}

impl<T: Serialize + DeserializeOwned> Entity for T {
    #[inline]
    fn as_serialize(&self) -> &dyn erased_serde::Serialize {
        self
    }

    fn deserialize_in_place(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), erased_serde::Error> {
        *self = erased_serde::deserialize::<T>(deserializer)?;
        Ok(())
    }

    #[inline]
    fn entity_type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}

// -----------------------------------------------------------------------------
// EntityRef

/// A value on its way out to a marshaler.
pub enum EntityRef<'a> {
    Entity(&'a dyn erased_serde::Serialize),
    Value(serde_json::Value),
    Bytes(Cow<'a, [u8]>),
    Text(Cow<'a, str>),
}

impl<'a> EntityRef<'a> {
    #[inline]
    pub fn entity<T: Serialize>(value: &'a T) -> Self {
        Self::Entity(value)
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Entity(_) => "entity",
            Self::Value(_) => "value",
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
        }
    }

    /// Serializable view, used by structured marshalers.
    pub(crate) fn with_serialize<R>(&self, f: impl FnOnce(&dyn erased_serde::Serialize) -> R) -> R {
        match self {
            Self::Entity(value) => f(*value),
            Self::Value(value) => f(value),
            Self::Bytes(bytes) => f(&bytes.as_ref()),
            Self::Text(text) => f(&text.as_ref()),
        }
    }
}

impl core::fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Entity(_) => f.write_str("Entity(..)"),
        }
    }
}

// -----------------------------------------------------------------------------
// EntityMut

/// A destination a marshaler reads into.
pub enum EntityMut<'a> {
    Entity(&'a mut dyn Entity),
    Bytes(&'a mut Vec<u8>),
    Runes(&'a mut Vec<char>),
    Text(&'a mut String),
    Writer(&'a mut dyn Write),
}

impl<'a> EntityMut<'a> {
    #[inline]
    pub fn entity<T: Entity>(value: &'a mut T) -> Self {
        Self::Entity(value)
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Entity(_) => "entity",
            Self::Bytes(_) => "bytes",
            Self::Runes(_) => "runes",
            Self::Text(_) => "text",
            Self::Writer(_) => "writer",
        }
    }
}
