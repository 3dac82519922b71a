//! Compiles carrier annotations into a [`Port`].

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use pb_utils::text::lower_camel;

use crate::classify::{DefaultPortFieldTypeReflector, PortFieldTypeReflector};
use crate::port::options;
use crate::tags::PrimaryTag;
use crate::walk::{IndexPath, StructVisitor, walk_struct};
use crate::{
    Carrier, FieldGroup, FieldInfo, Port, PortDirection, PortError, PortField, Shape, StructInfo,
};

/// Hook run on every compiled field before its peer is defaulted.
///
/// Fields of a [`FieldGroup::content`] group already carry the content
/// shape when the hook runs.
pub type FieldPostProcessor = dyn Fn(&mut PortField, &FieldInfo) + Send + Sync;

/// Builds ports for one transport.
///
/// A reflector is configured once with the transport's field groups and
/// then shared; compiling a port never mutates it.
///
/// # Examples
///
/// ```
/// use pb_port::{Carrier, CardinalityRange, FieldGroup, PortDirection, PortReflector, Shape};
///
/// #[derive(Carrier, Default)]
/// struct Request {
///     #[port(req = "header,optional")]
///     a: String,
///     #[port(req = "header,default=abc")]
///     b: String,
/// }
///
/// let reflector = PortReflector::new(PortDirection::In).with_field_group(
///     "header",
///     FieldGroup::new(CardinalityRange::zero_to_many()).with_shapes([Shape::Primitive]),
/// );
/// let port = reflector.reflect_port::<Request>("req").unwrap();
///
/// let a = port.field_by_name("a").unwrap();
/// assert!(a.optional);
/// assert_eq!(a.option("required"), Some("false"));
///
/// let b = port.field_by_name("b").unwrap();
/// assert!(!b.optional);
/// assert_eq!(b.default_value(), Some("abc"));
/// ```
#[derive(Clone)]
pub struct PortReflector {
    direction: PortDirection,
    field_groups: BTreeMap<String, FieldGroup>,
    post_processor: Option<Arc<FieldPostProcessor>>,
    type_reflector: Arc<dyn PortFieldTypeReflector>,
}

impl PortReflector {
    pub fn new(direction: PortDirection) -> Self {
        Self {
            direction,
            field_groups: BTreeMap::new(),
            post_processor: None,
            type_reflector: Arc::new(DefaultPortFieldTypeReflector::new()),
        }
    }

    pub fn with_field_group(mut self, name: impl Into<String>, group: FieldGroup) -> Self {
        self.field_groups.insert(name.into(), group);
        self
    }

    pub fn with_field_groups<N: Into<String>>(mut self, groups: impl IntoIterator<Item = (N, FieldGroup)>) -> Self {
        self.field_groups
            .extend(groups.into_iter().map(|(name, group)| (name.into(), group)));
        self
    }

    pub fn with_post_processor(
        mut self,
        post_processor: impl Fn(&mut PortField, &FieldInfo) + Send + Sync + 'static,
    ) -> Self {
        self.post_processor = Some(Arc::new(post_processor));
        self
    }

    pub fn with_type_reflector(mut self, type_reflector: impl PortFieldTypeReflector + 'static) -> Self {
        self.type_reflector = Arc::new(type_reflector);
        self
    }

    #[inline]
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    #[inline]
    pub fn field_groups(&self) -> &BTreeMap<String, FieldGroup> {
        &self.field_groups
    }

    #[inline]
    pub fn field_group(&self, name: &str) -> Option<&FieldGroup> {
        self.field_groups.get(name)
    }

    /// Compiles the `kind` annotations of carrier `T`.
    #[inline]
    pub fn reflect_port<T: Carrier>(&self, kind: &str) -> Result<Port, PortError> {
        self.reflect_port_struct(kind, T::struct_info())
    }

    /// Compiles the `kind` annotations of the carrier described by `info`.
    pub fn reflect_port_struct(&self, kind: &str, info: &'static StructInfo) -> Result<Port, PortError> {
        let mut compiler = PortCompiler {
            reflector: self,
            kind,
            path: IndexPath::new(),
            fields: Vec::new(),
        };
        walk_struct(info, &mut compiler)?;

        let fields = compiler.fields;
        self.validate_fields(&fields)?;

        log::debug!(
            "compiled {kind:?} port of `{}` with {} fields",
            info.type_name(),
            fields.len()
        );
        Ok(Port::new(kind.to_owned(), self.direction, info, fields))
    }

    fn validate_fields(&self, fields: &[PortField]) -> Result<(), PortError> {
        for (name, group) in &self.field_groups {
            if group.cardinality.is_none() {
                continue;
            }
            let count = fields.iter().filter(|field| field.has_group(name)).count();
            if !group.cardinality.contains(count) {
                return Err(PortError::InvalidCardinality {
                    group: name.clone(),
                    count,
                    cardinality: group.cardinality,
                });
            }
        }

        for field in fields {
            let allowed = self
                .field_groups
                .get(&field.group)
                .is_some_and(|group| group.allows(field.shape()));
            if !allowed {
                return Err(PortError::InvalidShape {
                    field: field.name.to_owned(),
                    group: field.group.clone(),
                    shape: field.shape(),
                });
            }
        }
        Ok(())
    }

    fn usable_group(&self, name: &str) -> bool {
        self.field_groups
            .get(name)
            .is_some_and(|group| !group.cardinality.is_none())
    }

    fn group_names(&self) -> String {
        self.field_groups.keys().map(String::as_str).collect::<Vec<_>>().join(",")
    }
}

impl fmt::Debug for PortReflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortReflector")
            .field("direction", &self.direction)
            .field("field_groups", &self.field_groups)
            .field("post_processor", &self.post_processor.is_some())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// PortCompiler

struct PortCompiler<'r> {
    reflector: &'r PortReflector,
    kind: &'r str,
    path: IndexPath,
    fields: Vec<PortField>,
}

impl PortCompiler<'_> {
    fn compile_field(&self, field: &'static FieldInfo) -> Result<Option<PortField>, PortError> {
        let Some(primary) = field.tag(self.kind) else {
            return Ok(None);
        };
        if primary == "-" {
            log::trace!("skipping ignored field {:?} of {:?} port", field.name(), self.kind);
            return Ok(None);
        }

        let tag = PrimaryTag::parse(field.name(), primary)?;
        if !self.reflector.usable_group(tag.group) {
            return Err(PortError::InvalidGroup {
                field: field.name().to_owned(),
                group: tag.group.to_owned(),
                expected: self.reflector.group_names(),
            });
        }

        let (port_type, optional) = self.reflector.type_reflector.reflect_port_field_type(field);
        let mut port_field = PortField::new(
            field.name(),
            tag.peer.unwrap_or_default(),
            tag.group,
            optional,
            port_type,
            self.path.current().to_vec(),
        );
        if self.reflector.field_group(tag.group).is_some_and(|group| group.content) {
            port_field.port_type.shape = Shape::Content;
        }

        for (name, value) in tag.options {
            match name {
                options::OPTIONAL => {
                    let optional = value == "true";
                    port_field
                        .with_optional(optional)
                        .with_option(options::REQUIRED, (!optional).to_string());
                }
                options::REQUIRED => {
                    port_field.with_optional(value != "true").with_option(name, value);
                }
                _ => {
                    port_field.with_option(name, value);
                }
            }
        }

        for &(key, value) in field.tags() {
            if key == self.kind {
                continue;
            }
            match key {
                options::REQUIRED => {
                    port_field.with_optional(value != "true");
                }
                options::OPTIONAL => {
                    port_field.with_optional(value == "true");
                }
                _ => {}
            }
            port_field.with_option(key, value);
        }

        if let Some(post_processor) = &self.reflector.post_processor {
            post_processor(&mut port_field, field);
        }

        if port_field.peer.is_empty() {
            port_field.peer = lower_camel(port_field.name);
        }

        Ok(Some(port_field))
    }
}

impl StructVisitor for PortCompiler<'_> {
    fn visit_field(&mut self, field: &'static FieldInfo) -> Result<(), PortError> {
        if let Some(port_field) = self.compile_field(field)? {
            self.fields.push(port_field);
        }
        self.path.advance();
        Ok(())
    }

    fn enter_embedded(&mut self, _: &'static FieldInfo) -> Result<(), PortError> {
        self.path.push();
        Ok(())
    }

    fn exit_embedded(&mut self, _: &'static FieldInfo) -> Result<(), PortError> {
        self.path.pop();
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
