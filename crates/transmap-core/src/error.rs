//! Error types for the Transmap core library
//!
//! This module defines the error handling system for Transmap, using
//! thiserror for the error definitions and anyhow for collaborator contexts.
//!
//! Recoverable validation outcomes are deliberately not part of [`Error`];
//! see [`crate::validation::ValidationFailure`].

use thiserror::Error;

/// Main error type for Transmap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Expression parsing or evaluation errors
    #[error("Expression error: {message}")]
    Expression {
        message: String,
        expression: Option<String>,
    },

    /// Attribute or mapping store errors
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Schema lookup errors from the schema provider
    #[error("Schema error: {interface} - {message}")]
    Schema {
        interface: String,
        message: String,
    },

    /// A stored mapping document could not be interpreted
    #[error("Malformed mapping {id}: {message}")]
    MalformedMapping {
        id: String,
        message: String,
    },

    /// A mapping body did not have the shape the caller required
    #[error("Unexpected mapping kind: expected {expected}, found {found}")]
    MappingKind {
        expected: String,
        found: String,
    },

    /// Invalid inputs handed to a public operation
    #[error("Validation error: {field} - {message}")]
    Validation {
        field: String,
        message: String,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a store error without an underlying source
    pub fn store(message: impl Into<String>) -> Self {
        Error::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error for a named input
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Schema {
            interface: "petstore_getPet_200".to_string(),
            message: "operation not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Schema error: petstore_getPet_200 - operation not found"
        );
    }

    #[test]
    fn test_json_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Json { .. }));
    }

    #[test]
    fn test_store_helper() {
        let err = Error::store("document locked");
        assert!(err.to_string().contains("document locked"));
    }
}
