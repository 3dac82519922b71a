use core::any::TypeId;
use core::hash::{BuildHasher, Hash};
use std::collections::{BTreeMap, HashMap};

use super::{EntryFill, FieldMut, FieldRef, FieldValue, Indirect, ListValue, MapValue};
use crate::{Handler, PortError, PortFieldType, Shape, ValidationError};

// -----------------------------------------------------------------------------
// Option

impl<T: FieldValue> FieldValue for Option<T> {
    fn field_type() -> PortFieldType {
        T::field_type().indirect()
    }

    #[inline]
    fn new_default() -> Option<Self> {
        Some(None)
    }

    #[inline]
    fn value_ref(&self) -> FieldRef<'_> {
        FieldRef::Indirect(self.as_ref().map(|v| v as &dyn FieldValue))
    }

    #[inline]
    fn value_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Indirect(self)
    }

    fn validate_value(&self) -> Result<(), ValidationError> {
        match self {
            Some(value) => value.validate_value(),
            None => Ok(()),
        }
    }
}

impl<T: FieldValue> Indirect for Option<T> {
    #[inline]
    fn pointee(&self) -> Option<&dyn FieldValue> {
        self.as_ref().map(|v| v as &dyn FieldValue)
    }

    #[inline]
    fn pointee_mut(&mut self) -> Option<&mut dyn FieldValue> {
        self.as_mut().map(|v| v as &mut dyn FieldValue)
    }

    fn materialize(&mut self) -> Option<&mut dyn FieldValue> {
        let value = T::new_default()?;
        Some(self.insert(value) as &mut dyn FieldValue)
    }

    #[inline]
    fn reset(&mut self) {
        *self = None;
    }
}

// -----------------------------------------------------------------------------
// Box

impl<T: FieldValue> FieldValue for Box<T> {
    #[inline]
    fn field_type() -> PortFieldType {
        T::field_type()
    }

    #[inline]
    fn new_default() -> Option<Self> {
        T::new_default().map(Box::new)
    }

    #[inline]
    fn value_ref(&self) -> FieldRef<'_> {
        (**self).value_ref()
    }

    #[inline]
    fn value_mut(&mut self) -> FieldMut<'_> {
        (**self).value_mut()
    }

    #[inline]
    fn validate_value(&self) -> Result<(), ValidationError> {
        (**self).validate_value()
    }

    #[inline]
    fn value_type_name(&self) -> &'static str {
        (**self).value_type_name()
    }
}

// -----------------------------------------------------------------------------
// Vec

impl<T: FieldValue> FieldValue for Vec<T> {
    fn field_type() -> PortFieldType {
        let items = T::field_type();
        let element = TypeId::of::<T>();

        let (shape, handler, optional) = if element == TypeId::of::<u8>() {
            (Shape::Primitive, Handler::Bytes, false)
        } else if element == TypeId::of::<char>() {
            (Shape::Primitive, Handler::Runes, false)
        } else if items.handler == Handler::File && items.indirections == 0 {
            (Shape::FileArray, Handler::List, true)
        } else {
            (Shape::Array, Handler::List, true)
        };

        PortFieldType::new::<Self>(shape, handler, optional).with_items(items)
    }

    #[inline]
    fn new_default() -> Option<Self> {
        Some(Vec::new())
    }

    #[inline]
    fn value_ref(&self) -> FieldRef<'_> {
        FieldRef::List(self)
    }

    #[inline]
    fn value_mut(&mut self) -> FieldMut<'_> {
        FieldMut::List(self)
    }
}

impl<T: FieldValue> ListValue for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn item_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    #[inline]
    fn item(&self, index: usize) -> Option<&dyn FieldValue> {
        self.get(index).map(|v| v as &dyn FieldValue)
    }

    #[inline]
    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn push_default(&mut self) -> Option<&mut dyn FieldValue> {
        self.push(T::new_default()?);
        self.last_mut().map(|v| v as &mut dyn FieldValue)
    }
}

// -----------------------------------------------------------------------------
// Maps

macro_rules! impl_map_value {
    (impl<$($param:ident),*> $ty:ty where $($bounds:tt)*) => {
        impl<$($param),*> FieldValue for $ty
        where
            $($bounds)*
        {
            fn field_type() -> PortFieldType {
                PortFieldType::new::<Self>(Shape::Object, Handler::Map, true)
                    .with_entries(K::field_type(), V::field_type())
            }

            #[inline]
            fn new_default() -> Option<Self> {
                Some(Self::default())
            }

            #[inline]
            fn value_ref(&self) -> FieldRef<'_> {
                FieldRef::Map(self)
            }

            #[inline]
            fn value_mut(&mut self) -> FieldMut<'_> {
                FieldMut::Map(self)
            }
        }

        impl<$($param),*> MapValue for $ty
        where
            $($bounds)*
        {
            #[inline]
            fn len(&self) -> usize {
                self.len()
            }

            fn entries(&self) -> Vec<(&dyn FieldValue, &dyn FieldValue)> {
                self.iter()
                    .map(|(k, v)| (k as &dyn FieldValue, v as &dyn FieldValue))
                    .collect()
            }

            #[inline]
            fn clear(&mut self) {
                self.clear();
            }

            fn insert_with(&mut self, fill: &mut EntryFill<'_>) -> Result<bool, PortError> {
                let (Some(mut key), Some(mut value)) = (K::new_default(), V::new_default()) else {
                    return Ok(false);
                };
                fill(&mut key, &mut value)?;
                self.insert(key, value);
                Ok(true)
            }
        }
    };
}

impl_map_value!(impl<K, V, S> HashMap<K, V, S> where
    K: FieldValue + Eq + Hash,
    V: FieldValue,
    S: BuildHasher + Default + 'static,
);

impl_map_value!(impl<K, V> BTreeMap<K, V> where
    K: FieldValue + Ord,
    V: FieldValue,
);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::collections::{BTreeMap, HashMap};

    use crate::value::{FieldMut, FieldValue, ListValue};
    use crate::{FileHandle, Handler, Shape};

    struct Fixed;

    impl FieldValue for Fixed {
        fn field_type() -> crate::PortFieldType {
            crate::PortFieldType::unknown::<Self>()
        }

        fn value_ref(&self) -> crate::FieldRef<'_> {
            crate::FieldRef::Opaque(self)
        }

        fn value_mut(&mut self) -> FieldMut<'_> {
            FieldMut::Opaque(self)
        }
    }

    #[test]
    fn option_layers_are_counted() {
        let ty = <Option<Option<Box<Option<u32>>>>>::field_type();
        assert_eq!(ty.shape, Shape::Primitive);
        assert_eq!(ty.indirections, 3);
        assert!(ty.optional);
        assert!(ty.is::<u32>());
    }

    #[test]
    fn vec_classification() {
        assert_eq!(Vec::<u8>::field_type().handler, Handler::Bytes);
        assert_eq!(Vec::<char>::field_type().handler, Handler::Runes);
        assert_eq!(Vec::<FileHandle>::field_type().shape, Shape::FileArray);

        let strings = Vec::<String>::field_type();
        assert_eq!(strings.shape, Shape::Array);
        assert!(strings.optional);
        assert_eq!(strings.items.map(|items| items.shape), Some(Shape::Primitive));
    }

    #[test]
    fn maps_are_objects() {
        let ty = HashMap::<String, i32>::field_type();
        assert_eq!((ty.shape, ty.handler), (Shape::Object, Handler::Map));
        assert_eq!(BTreeMap::<u8, bool>::field_type().shape, Shape::Object);
    }

    #[test]
    fn option_materializes_fresh_value() {
        let mut value: Option<u8> = Some(4);
        match value.value_mut() {
            FieldMut::Indirect(layer) => {
                let inner = layer.materialize().unwrap();
                assert_eq!(inner.downcast_ref::<u8>(), Some(&0));
            }
            _ => panic!("expected indirect view"),
        }
        assert_eq!(value, Some(0));
    }

    #[test]
    fn list_push_default() {
        let mut list: Vec<String> = vec!["a".into()];
        ListValue::clear(&mut list);
        if let Some(slot) = list.push_default().unwrap().downcast_mut::<String>() {
            slot.push('b');
        }
        assert_eq!(list, ["b"]);
    }

    #[test]
    fn text_types_wrap_like_scalars() {
        let addr = <Option<IpAddr>>::field_type();
        assert_eq!((addr.shape, addr.handler), (Shape::Primitive, Handler::Text));
        assert_eq!(addr.indirections, 1);
        assert!(addr.optional);
        assert!(addr.is::<IpAddr>());

        let peers = Vec::<SocketAddr>::field_type();
        assert_eq!((peers.shape, peers.handler), (Shape::Array, Handler::List));
        assert_eq!(peers.items.map(|items| items.handler), Some(Handler::Text));

        let mut value: Option<IpAddr> = None;
        match value.value_mut() {
            FieldMut::Indirect(layer) => assert!(layer.materialize().is_some()),
            _ => panic!("expected indirect view"),
        }
        assert_eq!(value, Some(IpAddr::from(Ipv4Addr::UNSPECIFIED)));
    }

    #[test]
    fn values_without_default_are_not_allocated() {
        assert_eq!(<Option<Fixed>>::field_type().indirections, 1);

        let mut value: Option<Fixed> = None;
        match value.value_mut() {
            FieldMut::Indirect(layer) => assert!(layer.materialize().is_none()),
            _ => panic!("expected indirect view"),
        }
        assert!(value.is_none());

        let mut list: Vec<Fixed> = Vec::new();
        assert!(list.push_default().is_none());
        assert!(list.is_empty());
    }
}
