//! Abstract syntax tree for mapping expressions
//!
//! The tree covers the expression subset mapping code is written in. Its
//! `Display` implementation is the canonical stringifier: every binary
//! operation is parenthesized so re-parsing never depends on precedence.
//!
//! Copyright (c) 2025 Transmap Team
//! Licensed under the Apache-2.0 license

use crate::types::KeyChain;
use std::fmt;

/// A parsed mapping expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Bool(bool),
    /// The null literal
    Null,
    /// Dotted path into the input document
    Path(KeyChain),
    /// Prefix operator applied to an operand
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// Infix operator applied to two operands
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Parenthesized sequence of expressions separated by `;`
    Block(Vec<Expr>),
    /// Ternary `condition ? then : otherwise`
    Condition {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
    /// Builtin function call such as `$uppercase(name)`
    Function { name: String, args: Vec<Expr> },
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation
    Minus,
    /// Identity
    Plus,
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Source text of the operator
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Concat => "&",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    /// True for the four operators with a closed-form inverse
    pub fn is_invertible_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }

    /// The operator undoing this one, for the invertible arithmetic subset
    pub fn inverse(&self) -> Option<BinaryOp> {
        match self {
            BinaryOp::Add => Some(BinaryOp::Sub),
            BinaryOp::Sub => Some(BinaryOp::Add),
            BinaryOp::Mul => Some(BinaryOp::Div),
            BinaryOp::Div => Some(BinaryOp::Mul),
            _ => None,
        }
    }
}

impl Expr {
    /// Path expression from a key chain
    pub fn path(chain: KeyChain) -> Self {
        Expr::Path(chain)
    }

    /// Binary expression helper
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Unary expression helper
    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }
}

/// True when the segment can be written without backtick quoting
pub fn is_plain_name(segment: &str) -> bool {
    let mut chars = segment.chars();
    let starts_ok = chars
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);
    starts_ok
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !is_reserved_word(segment)
}

/// Words the parser treats as literals or operators
pub fn is_reserved_word(word: &str) -> bool {
    matches!(word, "and" | "or" | "true" | "false" | "null")
}

/// Render a key chain as a path reference, quoting awkward segments
pub fn render_path(chain: &[String]) -> String {
    chain
        .iter()
        .map(|segment| {
            if is_plain_name(segment) {
                segment.clone()
            } else {
                format!("`{}`", segment)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in value.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            other => write!(f, "{}", other)?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Minus => write!(f, "-"),
            UnaryOp::Plus => write!(f, "+"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::String(s) => write_string_literal(f, s),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Null => write!(f, "null"),
            Expr::Path(chain) => write!(f, "{}", render_path(chain)),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Minus => write!(f, "-{}", expr),
                UnaryOp::Plus => write!(f, "{}", expr),
            },
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Expr::Block(exprs) => {
                write!(f, "(")?;
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", expr)?;
                }
                write!(f, ")")
            }
            Expr::Condition {
                condition,
                then,
                otherwise,
            } => match otherwise {
                Some(otherwise) => write!(f, "({} ? {} : {})", condition, then, otherwise),
                None => write!(f, "({} ? {})", condition, then),
            },
            Expr::Function { name, args } => {
                write!(f, "${}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
