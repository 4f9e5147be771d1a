//! Error types for graph conversion

use std::fmt;

use thiserror::Error;
use trellis_stream::StreamError;

/// Failure categories raised while converting a graph
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// No registered converter accepts the type.
    #[error("No converter available for type '{type_name}'")]
    NoConverter {
        /// Canonical name of the unconvertible type
        type_name: String,
    },
    /// A serialized name does not resolve to any registered type.
    #[error("Cannot resolve '{name}' to a registered type")]
    ClassResolution {
        /// Serialized name as found in the stream
        name: String,
    },
    /// The type permissions reject a resolved type.
    #[error("Type '{type_name}' is forbidden by the configured type permissions")]
    ForbiddenType {
        /// Canonical name of the rejected type
        type_name: String,
    },
    /// An object was reached again through its own subtree with references disabled.
    #[error("Circular reference to an object of type '{type_name}' while references are disabled")]
    Circularity {
        /// Canonical name of the type closing the cycle
        type_name: String,
    },
    /// A back-reference marker names no previously read object.
    #[error("Unresolved reference '{reference}'")]
    UnresolvedReference {
        /// Marker as found in the stream
        reference: String,
    },
    /// The underlying stream was misused or is malformed.
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
    /// An element matches no field of the type being read.
    #[error("Unknown field '{field}' in type '{type_name}'")]
    UnknownField {
        /// Canonical name of the type being read
        type_name: String,
        /// Element name as found in the stream
        field: String,
    },
    /// A field occurs twice within one object.
    #[error("Duplicate field '{field}' in type '{type_name}'")]
    DuplicateField {
        /// Canonical name of the type being read
        type_name: String,
        /// Field name
        field: String,
    },
    /// Text could not be parsed into a value of the type.
    #[error("Invalid value '{value}' for type '{type_name}'")]
    InvalidValue {
        /// Canonical name of the target type
        type_name: String,
        /// Offending text or value
        value: String,
    },
    /// A value or object does not have the shape its type requires.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// What was required
        expected: String,
        /// What was present
        found: String,
    },
    /// A converter was invoked explicitly for a type it does not accept.
    #[error("Converter '{converter}' cannot convert type '{type_name}'")]
    ConverterMismatch {
        /// Converter name
        converter: String,
        /// Canonical name of the rejected type
        type_name: String,
    },
    /// Configuration refers to unknown types or is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Conversion failure with the diagnostic context gathered while it propagated.
///
/// Context entries are ordered key/value pairs such as `path`, `type` or
/// `required-type`. The innermost frame wins: a key already present is not
/// overwritten by outer frames.
#[derive(Debug)]
pub struct ConversionError {
    kind: ErrorKind,
    context: Vec<(String, String)>,
}

impl ConversionError {
    /// Wrap an error kind with empty context.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: Vec::new(),
        }
    }

    /// Attach a context entry unless `key` is already present.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if self.context(&key).is_none() {
            self.context.push((key, value.into()));
        }
        self
    }

    /// The failure category.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Consume the error, keeping only its category.
    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Context value for `key`.
    pub fn context(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All context entries in insertion order.
    pub fn context_entries(&self) -> &[(String, String)] {
        &self.context
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for (key, value) in &self.context {
            write!(f, "\n  {:<14}: {}", key, value)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConversionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for ConversionError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<StreamError> for ConversionError {
    fn from(err: StreamError) -> Self {
        Self::new(ErrorKind::Stream(err))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_innermost_context_wins() {
        let err = ConversionError::new(ErrorKind::UnresolvedReference {
            reference: "7".to_string(),
        })
        .with_context("path", "/a/b")
        .with_context("path", "/a")
        .with_context("type", "acme.Person");

        assert_eq!(err.context("path"), Some("/a/b"));
        assert_eq!(err.context("type"), Some("acme.Person"));
        assert_eq!(err.context_entries().len(), 2);
    }

    #[test]
    fn test_display_lists_context() {
        let err = ConversionError::from(ErrorKind::NoConverter {
            type_name: "acme.Thing".to_string(),
        })
        .with_context("path", "/thing");
        let text = err.to_string();
        assert!(text.starts_with("No converter available for type 'acme.Thing'"));
        assert!(text.contains("path"));
        assert!(text.contains("/thing"));
    }

    #[test]
    fn test_source_chain_reaches_stream_error() {
        let err = ConversionError::from(StreamError::AtRoot);
        assert!(matches!(err.kind(), ErrorKind::Stream(StreamError::AtRoot)));
        let kind = err.source().expect("kind as source");
        assert!(kind.source().is_some());
    }
}
