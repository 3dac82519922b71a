//! Items used by `#[derive(Carrier)]` expansions.
//!
//! The probes select an implementation by autoref: a call on `&&Probe<T>`
//! resolves to the `&Probe<T>` impl when `T` has the capability and falls
//! back to the `Probe<T>` impl otherwise. Field types without a binding
//! therefore classify as unknown instead of failing to compile.

use core::marker::PhantomData;

pub use pb_content::Entity;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::PortFieldType;
use crate::value::FieldValue;

pub struct Probe<T>(PhantomData<fn() -> T>);

impl<T> Probe<T> {
    #[inline(always)]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

// -----------------------------------------------------------------------------
// Field values

pub trait ViaFieldValue<T> {
    fn port_field_type(&self) -> PortFieldType;

    fn field_ref<'a>(&self, value: &'a T) -> Option<&'a dyn FieldValue>;

    fn field_mut<'a>(&self, value: &'a mut T) -> Option<&'a mut dyn FieldValue>;
}

impl<T: FieldValue> ViaFieldValue<T> for &Probe<T> {
    #[inline(always)]
    fn port_field_type(&self) -> PortFieldType {
        T::field_type()
    }

    #[inline(always)]
    fn field_ref<'a>(&self, value: &'a T) -> Option<&'a dyn FieldValue> {
        Some(value)
    }

    #[inline(always)]
    fn field_mut<'a>(&self, value: &'a mut T) -> Option<&'a mut dyn FieldValue> {
        Some(value)
    }
}

pub trait ViaUnknown<T> {
    fn port_field_type(&self) -> PortFieldType;

    fn field_ref<'a>(&self, value: &'a T) -> Option<&'a dyn FieldValue>;

    fn field_mut<'a>(&self, value: &'a mut T) -> Option<&'a mut dyn FieldValue>;
}

impl<T: 'static> ViaUnknown<T> for Probe<T> {
    #[inline(always)]
    fn port_field_type(&self) -> PortFieldType {
        PortFieldType::unknown::<T>()
    }

    #[inline(always)]
    fn field_ref<'a>(&self, _: &'a T) -> Option<&'a dyn FieldValue> {
        None
    }

    #[inline(always)]
    fn field_mut<'a>(&self, _: &'a mut T) -> Option<&'a mut dyn FieldValue> {
        None
    }
}

// -----------------------------------------------------------------------------
// Defaults

pub trait ViaDefault<T> {
    fn new_default(&self) -> Option<T>;
}

impl<T: Default> ViaDefault<T> for &Probe<T> {
    #[inline(always)]
    fn new_default(&self) -> Option<T> {
        Some(T::default())
    }
}

pub trait ViaNoDefault<T> {
    fn new_default(&self) -> Option<T>;
}

impl<T> ViaNoDefault<T> for Probe<T> {
    #[inline(always)]
    fn new_default(&self) -> Option<T> {
        None
    }
}

// -----------------------------------------------------------------------------
// Entities

pub trait ViaEntity<T> {
    fn entity_ref<'a>(&self, value: &'a T) -> Option<&'a dyn Entity>;

    fn entity_mut<'a>(&self, value: &'a mut T) -> Option<&'a mut dyn Entity>;
}

impl<T: Serialize + DeserializeOwned> ViaEntity<T> for &Probe<T> {
    #[inline(always)]
    fn entity_ref<'a>(&self, value: &'a T) -> Option<&'a dyn Entity> {
        Some(value)
    }

    #[inline(always)]
    fn entity_mut<'a>(&self, value: &'a mut T) -> Option<&'a mut dyn Entity> {
        Some(value)
    }
}

pub trait ViaNoEntity<T> {
    fn entity_ref<'a>(&self, value: &'a T) -> Option<&'a dyn Entity>;

    fn entity_mut<'a>(&self, value: &'a mut T) -> Option<&'a mut dyn Entity>;
}

impl<T> ViaNoEntity<T> for Probe<T> {
    #[inline(always)]
    fn entity_ref<'a>(&self, _: &'a T) -> Option<&'a dyn Entity> {
        None
    }

    #[inline(always)]
    fn entity_mut<'a>(&self, _: &'a mut T) -> Option<&'a mut dyn Entity> {
        None
    }
}
