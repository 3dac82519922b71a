use std::io;

use thiserror::Error;

/// Boxed error used for failures reported by external marshalers and
/// user conversions.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors raised while reading or writing [`Content`](crate::Content).
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unknown encoder {0:?}")]
    UnknownEncoder(String),
    #[error("unknown marshaler for media type {0:?}")]
    UnknownMarshaler(String),
    #[error("invalid media type {mime:?}: {reason}")]
    InvalidMediaType { mime: String, reason: &'static str },
    /// The content was created without a source.
    #[error("content source not present")]
    NotPresent,
    /// The single-pass source was already handed out.
    #[error("content source already consumed")]
    Consumed,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{format} marshaling failed: {source}")]
    Marshal {
        format: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("{marshaler} marshaler cannot handle {target}")]
    Unsupported {
        marshaler: &'static str,
        target: &'static str,
    },
}

impl ContentError {
    pub(crate) fn marshal(format: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Marshal {
            format,
            source: source.into(),
        }
    }
}
