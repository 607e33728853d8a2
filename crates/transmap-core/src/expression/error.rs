//! Error types for expression parsing and evaluation
//!
//! Copyright (c) 2025 Transmap Team
//! Licensed under the Apache-2.0 license

use thiserror::Error;

/// Errors raised while parsing, evaluating or inverting an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Parse errors with position information
    #[error("Parse error at position {position}: {message}")]
    Parse {
        message: String,
        position: usize,
        input: String,
    },

    /// Syntax errors naming what the parser expected
    #[error("Syntax error at position {position}: {message}")]
    Syntax {
        message: String,
        position: usize,
        input: String,
        expected: Vec<String>,
        found: String,
    },

    /// Operand types that an operator cannot combine
    #[error("Type mismatch: expected {expected}, found {found} in {context}")]
    TypeMismatch {
        expected: String,
        found: String,
        context: String,
    },

    /// Builtin function failures
    #[error("Function error: ${function}() - {message}")]
    Function { function: String, message: String },

    /// Arithmetic results that cannot be represented as JSON numbers
    #[error("Number out of range: {message}")]
    NumberOutOfRange { message: String },

    /// The expression is outside the invertible subset
    #[error("Expression is not invertible: {message}")]
    NotInvertible { message: String, expression: String },

    /// Constructs the engine recognises but does not support
    #[error("Unsupported feature: {feature}")]
    Unsupported { feature: String },
}

impl ExpressionError {
    /// Create a parse error with position and input
    pub fn parse(message: impl Into<String>, position: usize, input: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            position,
            input: input.into(),
        }
    }

    /// Create a syntax error with the expected alternatives
    pub fn syntax(
        message: impl Into<String>,
        position: usize,
        input: impl Into<String>,
        expected: Vec<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
            input: input.into(),
            expected,
            found: found.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        expected: impl Into<String>,
        found: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            context: context.into(),
        }
    }

    /// Create a builtin function error
    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Create a not-invertible error for the given expression source
    pub fn not_invertible(message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::NotInvertible {
            message: message.into(),
            expression: expression.into(),
        }
    }

    /// The expression source this error refers to, when known
    pub fn source_text(&self) -> Option<&str> {
        match self {
            Self::Parse { input, .. } | Self::Syntax { input, .. } => Some(input),
            Self::NotInvertible { expression, .. } => Some(expression),
            _ => None,
        }
    }

    /// Render the error with a caret under the failing position
    pub fn detailed_message(&self) -> String {
        match self {
            Self::Parse { position, input, .. } | Self::Syntax { position, input, .. } => {
                let mut result = self.to_string();
                if let Self::Syntax { expected, found, .. } = self {
                    result.push_str(&format!("\nExpected one of: {}", expected.join(", ")));
                    result.push_str(&format!("\nFound: {}", found));
                }
                if !input.is_empty() {
                    result.push_str(&format!("\nInput: {}", input));
                    let caret = input[..(*position).min(input.len())].chars().count();
                    result.push_str(&format!("\n       {}^", " ".repeat(caret)));
                }
                result
            }
            _ => self.to_string(),
        }
    }
}

impl From<ExpressionError> for crate::Error {
    fn from(err: ExpressionError) -> Self {
        crate::Error::Expression {
            expression: err.source_text().map(str::to_string),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_creation() {
        let err = ExpressionError::parse("Unterminated string literal", 4, "a & 'b");
        assert_eq!(
            err.to_string(),
            "Parse error at position 4: Unterminated string literal"
        );
        assert_eq!(err.source_text(), Some("a & 'b"));
    }

    #[test]
    fn test_detailed_message_points_at_position() {
        let err = ExpressionError::syntax(
            "Unexpected character",
            2,
            "a # b",
            vec!["operator".to_string()],
            "#",
        );
        let detailed = err.detailed_message();
        assert!(detailed.contains("Expected one of: operator"));
        assert!(detailed.ends_with("\n         ^"));
    }

    #[test]
    fn test_conversion_into_crate_error() {
        let err: crate::Error = ExpressionError::not_invertible("no path", "5").into();
        match err {
            crate::Error::Expression { expression, .. } => {
                assert_eq!(expression.as_deref(), Some("5"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
