use core::any::Any;
use core::fmt;
use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use pb_utils::TypeIdMap;
use pb_utils::text::split_list;
use serde::{Deserialize, Serialize};

use crate::{PortFieldType, Shape, StructInfo};

// -----------------------------------------------------------------------------
// CardinalityRange

/// The number of fields a group admits; `max` of `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardinalityRange {
    pub min: usize,
    #[serde(default)]
    pub max: Option<usize>,
}

impl CardinalityRange {
    #[inline]
    pub const fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    /// Admits no fields; marks a group as unusable.
    #[inline]
    pub const fn none() -> Self {
        Self::new(0, Some(0))
    }

    #[inline]
    pub const fn zero_to_one() -> Self {
        Self::new(0, Some(1))
    }

    #[inline]
    pub const fn zero_to_many() -> Self {
        Self::new(0, None)
    }

    #[inline]
    pub const fn one_to_one() -> Self {
        Self::new(1, Some(1))
    }

    #[inline]
    pub const fn one_to_many() -> Self {
        Self::new(1, None)
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.max == Some(0)
    }
}

impl fmt::Display for CardinalityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..={max}", self.min),
            None => write!(f, "{}..", self.min),
        }
    }
}

// -----------------------------------------------------------------------------
// FieldGroup

/// A named category of port fields, such as `header` or `body`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldGroup {
    pub cardinality: CardinalityRange,
    /// Shapes the group admits; empty admits every shape.
    #[serde(default)]
    pub allowed_shapes: BTreeSet<Shape>,
    /// Fields of the group carry a body and bind as [`Shape::Content`],
    /// whatever their type.
    #[serde(default)]
    pub content: bool,
}

impl FieldGroup {
    #[inline]
    pub fn new(cardinality: CardinalityRange) -> Self {
        Self {
            cardinality,
            allowed_shapes: BTreeSet::new(),
            content: false,
        }
    }

    pub fn with_shapes(mut self, shapes: impl IntoIterator<Item = Shape>) -> Self {
        self.allowed_shapes.extend(shapes);
        self
    }

    #[inline]
    pub fn with_content(mut self, content: bool) -> Self {
        self.content = content;
        self
    }

    pub fn allows(&self, shape: Shape) -> bool {
        self.allowed_shapes.is_empty() || self.allowed_shapes.contains(&shape)
    }
}

// -----------------------------------------------------------------------------
// Baggage

/// Transport data attached to a port field, one value per type.
#[derive(Clone, Default)]
pub struct Baggage(TypeIdMap<Arc<dyn Any + Send + Sync>>);

impl Baggage {
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.0.insert_type::<T>(Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.get_type::<T>().and_then(|value| (**value).downcast_ref::<T>())
    }

    #[inline]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.0.contains_type::<T>()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for Baggage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Baggage").field("len", &self.0.len()).finish()
    }
}

// -----------------------------------------------------------------------------
// PortField

/// Option keys with typed accessors on [`PortField`].
pub mod options {
    pub const DEFAULT: &str = "default";
    pub const CONST: &str = "const";
    pub const ENUM: &str = "enum";
    pub const REQUIRED: &str = "required";
    pub const OPTIONAL: &str = "optional";
    pub const SANITIZE: &str = "san";
}

/// One bound field of a [`Port`].
#[derive(Debug, Clone)]
pub struct PortField {
    pub name: &'static str,
    pub indices: Vec<usize>,
    pub peer: String,
    pub group: String,
    pub optional: bool,
    pub port_type: PortFieldType,
    options: IndexMap<String, String>,
    default_value: Option<String>,
    const_value: Option<String>,
    enum_values: Option<Vec<String>>,
    pub baggage: Baggage,
}

impl PortField {
    pub fn new(
        name: &'static str,
        peer: impl Into<String>,
        group: impl Into<String>,
        optional: bool,
        port_type: PortFieldType,
        indices: Vec<usize>,
    ) -> Self {
        Self {
            name,
            indices,
            peer: peer.into(),
            group: group.into(),
            optional,
            port_type,
            options: IndexMap::new(),
            default_value: None,
            const_value: None,
            enum_values: None,
            baggage: Baggage::default(),
        }
    }

    /// Sets an option, keeping the typed accessors in step.
    pub fn with_option(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            options::DEFAULT => self.default_value = Some(value.clone()),
            options::CONST => self.const_value = Some(value.clone()),
            options::ENUM => self.enum_values = Some(split_list(&value)),
            _ => {}
        }
        self.options.insert(key, value);
        self
    }

    pub fn remove_option(&mut self, key: &str) -> Option<String> {
        match key {
            options::DEFAULT => self.default_value = None,
            options::CONST => self.const_value = None,
            options::ENUM => self.enum_values = None,
            _ => {}
        }
        self.options.shift_remove(key)
    }

    #[inline]
    pub fn with_optional(&mut self, optional: bool) -> &mut Self {
        self.optional = optional;
        self
    }

    #[inline]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Options in annotation order.
    #[inline]
    pub fn options(&self) -> &IndexMap<String, String> {
        &self.options
    }

    /// A boolean option; `None` when unset or not a boolean.
    pub fn bool_option(&self, key: &str) -> Option<bool> {
        self.option(key).and_then(crate::value::parse_bool)
    }

    #[inline]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    #[inline]
    pub fn const_value(&self) -> Option<&str> {
        self.const_value.as_deref()
    }

    #[inline]
    pub fn enum_values(&self) -> Option<&[String]> {
        self.enum_values.as_deref()
    }

    /// The value to bind when the source has none: `const`, then `default`.
    #[inline]
    pub fn fallback_value(&self) -> Option<&str> {
        self.const_value().or(self.default_value())
    }

    /// Sanitizers named by the `san` option, such as `xss` or `path`.
    ///
    /// `None` when the option is absent, false or `-`. A bare `san` enables
    /// sanitizing without naming a sanitizer.
    pub fn sanitizers(&self) -> Option<Vec<&str>> {
        let value = self.option(options::SANITIZE)?;
        if value == "-" {
            return None;
        }
        match crate::value::parse_bool(value) {
            Some(true) => Some(Vec::new()),
            Some(false) => None,
            None => Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .collect(),
            ),
        }
    }

    #[inline]
    pub fn has_group(&self, group: &str) -> bool {
        self.group == group
    }

    #[inline]
    pub fn has_peer(&self, peer: &str) -> bool {
        self.peer == peer
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.port_type.shape
    }
}

// -----------------------------------------------------------------------------
// Port

/// Direction of data flow through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    In,
    Out,
}

/// The compiled binding between one carrier type and a transport.
///
/// Ports are immutable once compiled and may be shared between threads.
#[derive(Debug, Clone)]
pub struct Port {
    kind: String,
    direction: PortDirection,
    struct_info: &'static StructInfo,
    fields: Vec<PortField>,
}

impl Port {
    pub(crate) fn new(
        kind: String,
        direction: PortDirection,
        struct_info: &'static StructInfo,
        fields: Vec<PortField>,
    ) -> Self {
        Self {
            kind,
            direction,
            struct_info,
            fields,
        }
    }

    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[inline]
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    #[inline]
    pub fn struct_info(&self) -> &'static StructInfo {
        self.struct_info
    }

    #[inline]
    pub fn fields(&self) -> &[PortField] {
        &self.fields
    }

    pub fn first(&self, predicate: impl Fn(&PortField) -> bool) -> Option<&PortField> {
        self.fields.iter().find(|field| predicate(field))
    }

    pub fn all<'a>(
        &'a self,
        predicate: impl Fn(&PortField) -> bool + 'a,
    ) -> impl Iterator<Item = &'a PortField> + 'a {
        self.fields.iter().filter(move |field| predicate(field))
    }

    #[inline]
    pub fn field_by_group(&self, group: &str) -> Option<&PortField> {
        self.first(|field| field.has_group(group))
    }

    pub fn fields_by_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a PortField> + 'a {
        self.all(move |field| field.has_group(group))
    }

    #[inline]
    pub fn field_by_name(&self, name: &str) -> Option<&PortField> {
        self.first(|field| field.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Baggage, CardinalityRange, FieldGroup, PortField};
    use crate::{FieldValue, Shape};

    #[test]
    fn cardinality_bounds() {
        assert!(CardinalityRange::zero_to_one().contains(0));
        assert!(!CardinalityRange::zero_to_one().contains(2));
        assert!(CardinalityRange::one_to_many().contains(9));
        assert!(!CardinalityRange::one_to_many().contains(0));
        assert!(CardinalityRange::none().is_none());
        assert_eq!(CardinalityRange::one_to_many().to_string(), "1..");
        assert_eq!(CardinalityRange::zero_to_one().to_string(), "0..=1");
    }

    #[test]
    fn groups_load_from_json() {
        let group: FieldGroup = serde_json::from_str(
            r#"{"cardinality": {"min": 0, "max": 1}, "allowedShapes": ["content", "primitive"]}"#,
        )
        .unwrap();
        assert_eq!(group.cardinality, CardinalityRange::zero_to_one());
        assert!(group.allows(Shape::Content));
        assert!(!group.allows(Shape::Array));
        assert!(FieldGroup::new(CardinalityRange::zero_to_many()).allows(Shape::Unknown));
        assert!(!group.content);

        let json = r#"{"cardinality": {"min": 0, "max": 1}, "content": true}"#;
        let body: FieldGroup = serde_json::from_str(json).unwrap();
        assert!(body.content);
        assert_eq!(body, FieldGroup::new(CardinalityRange::zero_to_one()).with_content(true));
    }

    #[test]
    fn sanitize_option() {
        let mut field = PortField::new("a", "a", "header", false, String::field_type(), vec![0]);
        assert_eq!(field.sanitizers(), None);

        field.with_option("san", "true");
        assert_eq!(field.sanitizers(), Some(vec![]));
        field.with_option("san", "xss, path");
        assert_eq!(field.sanitizers(), Some(vec!["xss", "path"]));
        field.with_option("san", "-");
        assert_eq!(field.sanitizers(), None);
        field.with_option("san", "false");
        assert_eq!(field.sanitizers(), None);
    }

    #[test]
    fn typed_options_follow_writes() {
        let mut field = PortField::new("a", "a", "header", false, String::field_type(), vec![0]);
        field.with_option("enum", "x,y").with_option("default", "x");
        assert_eq!(field.enum_values(), Some(&["x".to_owned(), "y".to_owned()][..]));
        assert_eq!(field.fallback_value(), Some("x"));

        field.with_option("const", "y");
        assert_eq!(field.fallback_value(), Some("y"));
        field.remove_option("const");
        assert_eq!(field.fallback_value(), Some("x"));
        assert_eq!(field.options().keys().collect::<Vec<_>>(), ["enum", "default"]);
    }

    #[test]
    fn baggage_by_type() {
        #[derive(Debug, PartialEq)]
        struct Style(&'static str);

        let mut baggage = Baggage::default();
        baggage.insert(Style("form"));
        assert_eq!(baggage.get::<Style>(), Some(&Style("form")));
        assert!(baggage.get::<u8>().is_none());
    }
}
