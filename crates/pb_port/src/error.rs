use alloc::borrow::Cow;

use pb_content::{BoxError, ContentError};
use thiserror::Error;

use crate::{CardinalityRange, Shape};

// -----------------------------------------------------------------------------
// CoercionError

/// A text value could not be converted to the field's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to cast {value:?} to {target}: {reason}")]
pub struct CoercionError {
    pub value: String,
    pub target: &'static str,
    pub reason: String,
}

impl CoercionError {
    pub fn new(value: &str, target: &'static str, reason: impl ToString) -> Self {
        Self {
            value: value.to_owned(),
            target,
            reason: reason.to_string(),
        }
    }
}

// -----------------------------------------------------------------------------
// ValidationError

/// A value was written but rejected by its validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(Cow<'static, str>);

impl ValidationError {
    #[inline]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self(message.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// -----------------------------------------------------------------------------
// PortError

/// Errors raised while compiling ports and binding values.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("field {field:?} uses unknown field group {group:?}, expected one of {expected}")]
    InvalidGroup {
        field: String,
        group: String,
        expected: String,
    },

    #[error("field group {group:?} has {count} fields, expected {cardinality}")]
    InvalidCardinality {
        group: String,
        count: usize,
        cardinality: CardinalityRange,
    },

    #[error("field {field:?} has shape {shape}, which group {group:?} does not allow")]
    InvalidShape {
        field: String,
        group: String,
        shape: Shape,
    },

    #[error("invalid annotation on field {field:?}: {message}")]
    InvalidTag { field: String, message: String },

    #[error("struct `{type_name}` embeds itself")]
    RecursiveStruct { type_name: &'static str },

    #[error("`{carrier}` has no bindable field at index path {indices:?}")]
    InvalidPath {
        carrier: &'static str,
        indices: Vec<usize>,
    },

    #[error("field {field:?} has shape {actual}, expected {expected}")]
    IncorrectShape {
        field: String,
        expected: Shape,
        actual: Shape,
    },

    #[error("cannot {operation} field {field:?} of type `{type_name}`")]
    UnsupportedType {
        field: String,
        type_name: &'static str,
        operation: &'static str,
    },

    #[error("missing required value {0:?}")]
    MissingRequiredValue(String),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("invalid value for field {field:?}: {source}")]
    Validation {
        field: String,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("port binds `{expected}`, got `{actual}`")]
    CarrierMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("content type not specified")]
    MissingContentType,

    #[error("{shape} values are not supported by the {transport} transport")]
    NotImplemented {
        transport: &'static str,
        shape: Shape,
    },

    /// Raised by [`InputDecoder`](crate::InputDecoder) and
    /// [`OutputEncoder`](crate::OutputEncoder) implementations.
    #[error(transparent)]
    Transport(BoxError),

    #[error("{group} field {name:?}: {source}")]
    Field {
        group: String,
        name: String,
        #[source]
        source: Box<PortError>,
    },
}

impl PortError {
    /// Wraps the error with the group and name of the field it occurred on.
    pub fn in_field(self, group: &str, name: &str) -> Self {
        Self::Field {
            group: group.to_owned(),
            name: name.to_owned(),
            source: Box::new(self),
        }
    }

    /// The error beneath any [`PortError::Field`] context layers.
    pub fn root_cause(&self) -> &PortError {
        let mut error = self;
        while let Self::Field { source, .. } = error {
            error = &**source;
        }
        error
    }
}
