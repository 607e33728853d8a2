//! Mapping expression language
//!
//! Mapping code is written in a small JSONata-style expression language:
//! dotted paths into the input document, arithmetic, string concatenation,
//! comparisons, conditionals and a handful of builtin functions. This module
//! parses that language into [`Expr`] trees, evaluates trees against JSON
//! input, and provides the symbolic algebra (classification, inversion,
//! substitution) the attribute graph and chain composer rely on.
//!
//! # Examples
//!
//! ```
//! use transmap_core::expression::{invert, parse_expression};
//!
//! let expr = parse_expression("(src.celsius * 1.8) + 32").unwrap();
//! let inverse = invert("tgt.fahrenheit", &expr).unwrap();
//! assert_eq!(inverse.to_string(), "((tgt.fahrenheit - 32) / 1.8)");
//! ```
//!
//! Copyright (c) 2025 Transmap Team
//! Licensed under the Apache-2.0 license

pub mod algebra;
pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;

pub use algebra::{
    classify, classify_source, invert, invert_source, referenced_paths, stringify,
    substitute_paths, Classification,
};
pub use ast::{BinaryOp, Expr, UnaryOp};
pub use error::ExpressionError;
pub use eval::{evaluate, navigate};
pub use parser::Parser;

use crate::Result;
use serde_json::Value;

/// Parse expression source into a tree
pub fn parse_expression(source: &str) -> std::result::Result<Expr, ExpressionError> {
    Parser::new(source)?.parse()
}

/// Expression source referencing the leaf at `chain`
pub fn key_reference(chain: &[String]) -> String {
    ast::render_path(chain)
}

/// Pluggable expression engine used when executing mappings
///
/// Implementations must be pure with respect to their input: the same
/// expression evaluated against the same document yields the same value.
pub trait ExpressionEngine: Send + Sync {
    /// Parse expression source
    fn parse(&self, source: &str) -> Result<Expr>;

    /// Evaluate a parsed expression; `None` means the result is undefined
    fn evaluate(&self, expr: &Expr, input: &Value) -> Result<Option<Value>>;

    /// Parse and evaluate in one step
    fn evaluate_source(&self, source: &str, input: &Value) -> Result<Option<Value>> {
        let expr = self.parse(source)?;
        self.evaluate(&expr, input)
    }
}

/// The built-in engine backed by [`Parser`] and [`evaluate`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEngine;

impl DefaultEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionEngine for DefaultEngine {
    fn parse(&self, source: &str) -> Result<Expr> {
        Ok(parse_expression(source)?)
    }

    fn evaluate(&self, expr: &Expr, input: &Value) -> Result<Option<Value>> {
        Ok(evaluate(expr, input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::key_chain;
    use serde_json::json;

    #[test]
    fn test_key_reference_round_trips_through_parser() {
        let chain = key_chain(["api_op_200", "body", "content-type"]);
        let source = key_reference(&chain);
        assert_eq!(source, "api_op_200.body.`content-type`");
        assert_eq!(parse_expression(&source).unwrap(), Expr::Path(chain));
    }

    #[test]
    fn test_default_engine_evaluates_source() {
        let engine = DefaultEngine::new();
        let value = engine
            .evaluate_source("order.qty * order.price", &json!({"order": {"qty": 3, "price": 2.5}}))
            .unwrap();
        assert_eq!(value, Some(json!(7.5)));
    }

    #[test]
    fn test_engine_errors_convert() {
        let engine = DefaultEngine::new();
        let err = engine.evaluate_source("a +", &json!({})).unwrap_err();
        assert!(matches!(err, crate::Error::Expression { .. }));
    }
}
