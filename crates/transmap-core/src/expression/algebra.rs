//! Symbolic operations on expression trees
//!
//! Classification decides whether an expression belongs to the invertible
//! subset: numbers, a single path, and `+ - * /` or unary minus applied so
//! that at most one operand along every binary node contains the path.
//! Inversion rewrites such an expression into the one computing the path
//! back from the result.
//!
//! Copyright (c) 2025 Transmap Team
//! Licensed under the Apache-2.0 license

use super::ast::*;
use super::error::ExpressionError;
use crate::types::{split_key_chain, KeyChain};

type AlgebraResult<T> = std::result::Result<T, ExpressionError>;

/// Result of classifying an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// The expression is in the invertible subset
    pub is_simple: bool,
    /// The expression references at least one path
    pub contains_path: bool,
}

impl Classification {
    const fn new(is_simple: bool, contains_path: bool) -> Self {
        Self {
            is_simple,
            contains_path,
        }
    }

    /// Simple and carrying exactly the one path needed for inversion
    pub fn is_invertible(&self) -> bool {
        self.is_simple && self.contains_path
    }
}

/// Classify an expression tree
pub fn classify(expr: &Expr) -> Classification {
    match expr {
        Expr::Number(_) => Classification::new(true, false),
        Expr::Path(_) => Classification::new(true, true),
        Expr::Unary { expr, .. } => classify(expr),
        Expr::Block(items) if items.len() == 1 => classify(&items[0]),
        Expr::Binary { op, lhs, rhs } if op.is_invertible_arithmetic() => {
            let left = classify(lhs);
            let right = classify(rhs);
            Classification::new(
                left.is_simple && right.is_simple && !(left.contains_path && right.contains_path),
                left.contains_path || right.contains_path,
            )
        }
        other => Classification::new(false, !referenced_paths(other).is_empty()),
    }
}

/// Invert an expression, naming its result with `attribute_id`
///
/// Given `expr` computing `y` from a path `p`, the returned expression
/// computes `p` from a path named `attribute_id` holding `y`.
pub fn invert(attribute_id: &str, expr: &Expr) -> AlgebraResult<Expr> {
    let classification = classify(expr);
    if !classification.is_invertible() {
        return Err(ExpressionError::not_invertible(
            if classification.is_simple {
                "expression references no path"
            } else {
                "expression is outside the invertible subset"
            },
            expr.to_string(),
        ));
    }

    let mut accumulator = Expr::Path(split_key_chain(attribute_id));
    let mut node = expr;

    loop {
        match node {
            Expr::Path(_) => return Ok(accumulator),
            Expr::Block(items) if items.len() == 1 => node = &items[0],
            Expr::Unary { op, expr } => {
                if *op == UnaryOp::Minus {
                    accumulator = Expr::unary(UnaryOp::Minus, accumulator);
                }
                node = expr;
            }
            Expr::Binary { op, lhs, rhs } => {
                if classify(lhs).contains_path {
                    // p OP c = y  =>  p = y OP^-1 c
                    let inverse = op.inverse().ok_or_else(|| {
                        ExpressionError::not_invertible("operator has no inverse", expr.to_string())
                    })?;
                    accumulator = Expr::binary(inverse, accumulator, (**rhs).clone());
                    node = lhs;
                } else {
                    // c OP p = y
                    accumulator = match op {
                        BinaryOp::Add => Expr::binary(BinaryOp::Sub, accumulator, (**lhs).clone()),
                        BinaryOp::Mul => Expr::binary(BinaryOp::Div, accumulator, (**lhs).clone()),
                        BinaryOp::Sub => Expr::binary(BinaryOp::Sub, (**lhs).clone(), accumulator),
                        BinaryOp::Div => Expr::binary(BinaryOp::Div, (**lhs).clone(), accumulator),
                        _ => {
                            return Err(ExpressionError::not_invertible(
                                "operator has no inverse",
                                expr.to_string(),
                            ))
                        }
                    };
                    node = rhs;
                }
            }
            _ => {
                return Err(ExpressionError::not_invertible(
                    "unexpected node on the path spine",
                    expr.to_string(),
                ))
            }
        }
    }
}

/// Parse, invert and stringify in one step
pub fn invert_source(attribute_id: &str, source: &str) -> AlgebraResult<String> {
    let expr = super::parse_expression(source)?;
    Ok(invert(attribute_id, &expr)?.to_string())
}

/// Classify expression source, treating unparsable input as not simple
pub fn classify_source(source: &str) -> Classification {
    match super::parse_expression(source) {
        Ok(expr) => classify(&expr),
        Err(_) => Classification::new(false, false),
    }
}

/// Canonical, fully parenthesized rendering of an expression
pub fn stringify(expr: &Expr) -> String {
    expr.to_string()
}

/// Distinct paths referenced by an expression, in first-seen order
pub fn referenced_paths(expr: &Expr) -> Vec<KeyChain> {
    let mut paths = Vec::new();
    collect_paths(expr, &mut paths);
    paths
}

fn collect_paths(expr: &Expr, out: &mut Vec<KeyChain>) {
    match expr {
        Expr::Path(chain) => {
            if !out.contains(chain) {
                out.push(chain.clone());
            }
        }
        Expr::Unary { expr, .. } => collect_paths(expr, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_paths(lhs, out);
            collect_paths(rhs, out);
        }
        Expr::Block(items) => items.iter().for_each(|item| collect_paths(item, out)),
        Expr::Condition {
            condition,
            then,
            otherwise,
        } => {
            collect_paths(condition, out);
            collect_paths(then, out);
            if let Some(otherwise) = otherwise {
                collect_paths(otherwise, out);
            }
        }
        Expr::Function { args, .. } => args.iter().for_each(|arg| collect_paths(arg, out)),
        Expr::Number(_) | Expr::String(_) | Expr::Bool(_) | Expr::Null => {}
    }
}

/// Replace path nodes for which `replace` yields an expression
///
/// Rendering parenthesizes every compound node, so replacements keep their
/// grouping without extra wrapping.
pub fn substitute_paths<F>(expr: &Expr, replace: &mut F) -> Expr
where
    F: FnMut(&KeyChain) -> Option<Expr>,
{
    match expr {
        Expr::Path(chain) => replace(chain).unwrap_or_else(|| expr.clone()),
        Expr::Unary { op, expr } => Expr::unary(*op, substitute_paths(expr, replace)),
        Expr::Binary { op, lhs, rhs } => Expr::binary(
            *op,
            substitute_paths(lhs, replace),
            substitute_paths(rhs, replace),
        ),
        Expr::Block(items) => Expr::Block(
            items
                .iter()
                .map(|item| substitute_paths(item, replace))
                .collect(),
        ),
        Expr::Condition {
            condition,
            then,
            otherwise,
        } => Expr::Condition {
            condition: Box::new(substitute_paths(condition, replace)),
            then: Box::new(substitute_paths(then, replace)),
            otherwise: otherwise
                .as_ref()
                .map(|otherwise| Box::new(substitute_paths(otherwise, replace))),
        },
        Expr::Function { name, args } => Expr::Function {
            name: name.clone(),
            args: args
                .iter()
                .map(|arg| substitute_paths(arg, replace))
                .collect(),
        },
        Expr::Number(_) | Expr::String(_) | Expr::Bool(_) | Expr::Null => expr.clone(),
    }
}
