//! Field type classification.

use core::any::TypeId;

use pb_utils::TypeIdMap;

use crate::{FieldInfo, Handler, PortFieldType, Shape};

/// Maps a field to its [`PortFieldType`] and default optionality.
///
/// Transports install their own reflector to classify types they treat
/// specially.
pub trait PortFieldTypeReflector: Send + Sync {
    fn reflect_port_field_type(&self, field: &FieldInfo) -> (PortFieldType, bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Override {
    shape: Shape,
    handler: Handler,
}

/// Classifies fields by their [`FieldValue`](crate::FieldValue)
/// implementation, after consulting a table of per-type overrides.
///
/// # Examples
///
/// ```
/// use pb_port::{DefaultPortFieldTypeReflector, Handler, Shape};
///
/// // Bind raw byte vectors as request content instead of text.
/// let reflector = DefaultPortFieldTypeReflector::new()
///     .with_override::<Vec<u8>>(Shape::Content, Handler::Bytes);
/// assert!(reflector.has_override::<Vec<u8>>());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultPortFieldTypeReflector {
    overrides: TypeIdMap<Override>,
}

impl DefaultPortFieldTypeReflector {
    #[inline]
    pub const fn new() -> Self {
        Self {
            overrides: TypeIdMap::new(),
        }
    }

    /// Classifies base type `T` with `shape` and `handler`.
    pub fn with_override<T: 'static>(mut self, shape: Shape, handler: Handler) -> Self {
        self.overrides.insert_type::<T>(Override { shape, handler });
        self
    }

    #[inline]
    pub fn has_override<T: 'static>(&self) -> bool {
        self.overrides.contains_type::<T>()
    }

    fn override_for(&self, type_id: TypeId) -> Option<Override> {
        self.overrides.get(&type_id).copied()
    }
}

impl PortFieldTypeReflector for DefaultPortFieldTypeReflector {
    fn reflect_port_field_type(&self, field: &FieldInfo) -> (PortFieldType, bool) {
        let mut port_type = field.port_field_type();

        if let Some(Override { shape, handler }) = self.override_for(port_type.type_id) {
            port_type.shape = shape;
            port_type.handler = handler;
        }

        if port_type.shape == Shape::Unknown {
            log::warn!(
                "field {:?} of type `{}` has no port binding",
                field.name(),
                field.type_name()
            );
        }

        let optional = port_type.optional;
        (port_type, optional)
    }
}

#[cfg(test)]
mod tests {
    use super::{DefaultPortFieldTypeReflector, PortFieldTypeReflector};
    use crate::{Carrier, Handler, Shape};

    struct Opaque;

    #[derive(Carrier)]
    struct Sample {
        count: Option<u32>,
        bytes: Vec<u8>,
        raw: Option<Vec<u8>>,
        other: Opaque,
    }

    fn classify(
        reflector: &DefaultPortFieldTypeReflector,
        name: &str,
    ) -> (Shape, Handler, usize, bool) {
        let field = Sample::struct_info().field_by_name(name).unwrap();
        let (ty, optional) = reflector.reflect_port_field_type(field);
        (ty.shape, ty.handler, ty.indirections, optional)
    }

    #[test]
    fn default_classification() {
        let reflector = DefaultPortFieldTypeReflector::new();
        let count = Handler::Scalar(crate::ScalarKind::U32);
        assert_eq!(classify(&reflector, "count"), (Shape::Primitive, count, 1, true));
        assert_eq!(classify(&reflector, "bytes"), (Shape::Primitive, Handler::Bytes, 0, false));
        assert_eq!(classify(&reflector, "other"), (Shape::Unknown, Handler::Unknown, 0, true));
    }

    #[test]
    fn overrides_apply_to_base_type() {
        let reflector = DefaultPortFieldTypeReflector::new()
            .with_override::<Vec<u8>>(Shape::Content, Handler::Bytes);
        assert_eq!(classify(&reflector, "bytes").0, Shape::Content);
        assert_eq!(classify(&reflector, "raw"), (Shape::Content, Handler::Bytes, 1, true));
    }
}
