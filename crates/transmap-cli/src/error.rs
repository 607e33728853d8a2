//! Error types and handling for the CLI
//!
//! Every failure of a subcommand ends up in [`Error`], which knows the
//! process exit code it maps to.

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from the transmap-core library
    #[error("Core error: {0}")]
    Core(#[from] transmap_core::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {}", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument combination
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// A mapping failed validation
    #[error("Mapping is incomplete: {0}")]
    ValidationFailed(#[from] transmap_core::ValidationFailure),

    /// No stored mapping was found for a lookup
    #[error("No mapping found from '{}' to '{}'", source_id, target_id)]
    MappingNotFound {
        source_id: String,
        target_id: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(_) => 2,
            Self::FileNotFound { .. } => 3,
            Self::InvalidFormat { .. } => 4,
            Self::Config(_) => 5,
            Self::InvalidArgs(_) => 6,
            Self::ValidationFailed(_) => 7,
            Self::MappingNotFound { .. } => 8,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Toml(_) => 14,
            Self::Other { .. } => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidArgs(_))
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    if use_color {
        use colored::Colorize;
        format!("{} {}", "Error:".red().bold(), error)
    } else {
        format!("Error: {}", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transmap_core::{key_chain, ValidationFailure};

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let not_found = Error::FileNotFound {
            path: PathBuf::from("missing.json"),
        };
        assert_eq!(not_found.exit_code(), 3);
        assert_eq!(Error::invalid_args("x").exit_code(), 6);
        assert_eq!(Error::other("x").exit_code(), 99);

        let failure = ValidationFailure::UnmappedPairs {
            required: vec![key_chain(["t", "b"])],
        };
        assert_eq!(Error::from(failure).exit_code(), 7);
    }

    #[test]
    fn test_only_argument_errors_show_help() {
        assert!(Error::invalid_args("bad combination").should_show_help());
        assert!(!Error::config("bad").should_show_help());
    }

    #[test]
    fn test_format_error_without_color() {
        let error = Error::MappingNotFound {
            source_id: "a_op_200".to_string(),
            target_id: "b_op_200".to_string(),
        };
        assert_eq!(
            format_error(&error, false),
            "Error: No mapping found from 'a_op_200' to 'b_op_200'"
        );
    }
}
