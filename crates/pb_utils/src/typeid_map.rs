use core::any::TypeId;
use core::fmt::Debug;

use crate::hash::NoOpHashState;
use crate::hash::hashbrown::HashMap;

// -----------------------------------------------------------------------------
// TypeIdMap

/// A map keyed by [`TypeId`], one slot per Rust type.
///
/// Used for per-type extension data, such as transport baggage attached
/// to a bound field or per-type classification overrides.
///
/// # Examples
///
/// ```
/// use pb_utils::TypeIdMap;
///
/// let mut map = TypeIdMap::new();
/// map.insert_type::<u32>("thirty-two");
///
/// assert_eq!(map.get_type::<u32>(), Some(&"thirty-two"));
/// assert!(map.get_type::<u64>().is_none());
/// ```
pub struct TypeIdMap<V>(HashMap<TypeId, V, NoOpHashState>);

impl<V> TypeIdMap<V> {
    /// Creates an empty map.
    #[inline]
    pub const fn new() -> Self {
        Self(HashMap::with_hasher(NoOpHashState))
    }

    /// Returns the value stored for `type_id`.
    #[inline]
    pub fn get(&self, type_id: &TypeId) -> Option<&V> {
        self.0.get(type_id)
    }

    /// Returns the value stored for `T`.
    #[inline(always)]
    pub fn get_type<T: ?Sized + 'static>(&self) -> Option<&V> {
        self.get(&TypeId::of::<T>())
    }

    /// Returns the value stored for `T`, mutably.
    #[inline]
    pub fn get_mut_type<T: ?Sized + 'static>(&mut self) -> Option<&mut V> {
        self.0.get_mut(&TypeId::of::<T>())
    }

    /// Stores `v` for `type_id`, returning the replaced value.
    #[inline]
    pub fn insert(&mut self, type_id: TypeId, v: V) -> Option<V> {
        self.0.insert(type_id, v)
    }

    /// Stores `v` for `T`, returning the replaced value.
    #[inline(always)]
    pub fn insert_type<T: ?Sized + 'static>(&mut self, v: V) -> Option<V> {
        self.insert(TypeId::of::<T>(), v)
    }

    /// Removes and returns the value stored for `T`.
    #[inline]
    pub fn remove_type<T: ?Sized + 'static>(&mut self) -> Option<V> {
        self.0.remove(&TypeId::of::<T>())
    }

    #[inline]
    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.0.contains_key(type_id)
    }

    #[inline(always)]
    pub fn contains_type<T: ?Sized + 'static>(&self) -> bool {
        self.contains(&TypeId::of::<T>())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the stored values in arbitrary order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.0.values()
    }
}

// -----------------------------------------------------------------------------
// Traits

impl<V> Default for TypeIdMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for TypeIdMap<V> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<V: Debug> Debug for TypeIdMap<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.0.values()).finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::TypeIdMap;

    #[test]
    fn insert_replaces_per_type() {
        let mut map = TypeIdMap::new();
        assert!(map.insert_type::<u8>(1).is_none());
        assert_eq!(map.insert_type::<u8>(2), Some(1));
        map.insert_type::<i8>(3);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get_type::<u8>(), Some(&2));
        assert!(map.contains_type::<i8>());
    }

    #[test]
    fn remove_and_mutate() {
        let mut map = TypeIdMap::new();
        map.insert_type::<str>(10);
        if let Some(v) = map.get_mut_type::<str>() {
            *v += 1;
        }
        assert_eq!(map.remove_type::<str>(), Some(11));
        assert!(map.is_empty());
    }
}
