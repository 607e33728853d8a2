//! Expression evaluation against JSON input
//!
//! Evaluation follows the usual mapping-language conventions: a path that
//! does not resolve yields *undefined* (`None`), arithmetic on undefined
//! stays undefined, and a path stepping through an array maps over its
//! elements and flattens the results.
//!
//! Copyright (c) 2025 Transmap Team
//! Licensed under the Apache-2.0 license

use super::ast::*;
use super::error::ExpressionError;
use serde_json::{Number, Value};
use std::cmp::Ordering;

type EvalResult<T> = std::result::Result<T, ExpressionError>;

/// Evaluate an expression, returning `None` for an undefined result
pub fn evaluate(expr: &Expr, input: &Value) -> EvalResult<Option<Value>> {
    match expr {
        Expr::Number(n) => number_value(*n).map(Some),
        Expr::String(s) => Ok(Some(Value::String(s.clone()))),
        Expr::Bool(b) => Ok(Some(Value::Bool(*b))),
        Expr::Null => Ok(Some(Value::Null)),
        Expr::Path(chain) => Ok(navigate(input, chain)),
        Expr::Unary { op, expr } => evaluate_unary(*op, expr, input),
        Expr::Binary { op, lhs, rhs } => evaluate_binary(*op, lhs, rhs, input),
        Expr::Block(exprs) => {
            let mut last = None;
            for expr in exprs {
                last = evaluate(expr, input)?;
            }
            Ok(last)
        }
        Expr::Condition {
            condition,
            then,
            otherwise,
        } => {
            let condition = evaluate(condition, input)?;
            if is_truthy(condition.as_ref()) {
                evaluate(then, input)
            } else if let Some(otherwise) = otherwise {
                evaluate(otherwise, input)
            } else {
                Ok(None)
            }
        }
        Expr::Function { name, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, input))
                .collect::<EvalResult<Vec<_>>>()?;
            call_function(name, values)
        }
    }
}

/// Walk a key chain through the input, mapping over arrays on the way
pub fn navigate(input: &Value, chain: &[String]) -> Option<Value> {
    let mut current = vec![input.clone()];

    for segment in chain {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(mut map) => {
                    if let Some(child) = map.remove(segment) {
                        push_flattened(&mut next, child);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Value::Object(mut map) = item {
                            if let Some(child) = map.remove(segment) {
                                push_flattened(&mut next, child);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        if next.is_empty() {
            return None;
        }
        current = next;
    }

    match current.len() {
        0 => None,
        1 => current.pop(),
        _ => Some(Value::Array(current)),
    }
}

fn push_flattened(out: &mut Vec<Value>, value: Value) {
    match value {
        Value::Array(items) => out.extend(items),
        other => out.push(other),
    }
}

fn evaluate_unary(op: UnaryOp, operand: &Expr, input: &Value) -> EvalResult<Option<Value>> {
    let value = match evaluate(operand, input)? {
        Some(value) => value,
        None => return Ok(None),
    };
    let n = expect_number(&value, "unary operand")?;
    match op {
        UnaryOp::Minus => number_value(-n).map(Some),
        UnaryOp::Plus => number_value(n).map(Some),
    }
}

/// Evaluate binary operation with short-circuit evaluation
fn evaluate_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    input: &Value,
) -> EvalResult<Option<Value>> {
    match op {
        BinaryOp::And => {
            let left = evaluate(lhs, input)?;
            if !is_truthy(left.as_ref()) {
                return Ok(Some(Value::Bool(false)));
            }
            let right = evaluate(rhs, input)?;
            Ok(Some(Value::Bool(is_truthy(right.as_ref()))))
        }
        BinaryOp::Or => {
            let left = evaluate(lhs, input)?;
            if is_truthy(left.as_ref()) {
                return Ok(Some(Value::Bool(true)));
            }
            let right = evaluate(rhs, input)?;
            Ok(Some(Value::Bool(is_truthy(right.as_ref()))))
        }
        BinaryOp::Concat => {
            let left = evaluate(lhs, input)?;
            let right = evaluate(rhs, input)?;
            Ok(Some(Value::String(format!(
                "{}{}",
                concat_text(left.as_ref()),
                concat_text(right.as_ref())
            ))))
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            let left = evaluate(lhs, input)?;
            let right = evaluate(rhs, input)?;
            let (left, right) = match (left, right) {
                (Some(l), Some(r)) => (l, r),
                _ => return Ok(Some(Value::Bool(false))),
            };
            let equal = values_equal(&left, &right);
            Ok(Some(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal })))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let left = evaluate(lhs, input)?;
            let right = evaluate(rhs, input)?;
            let (left, right) = match (left, right) {
                (Some(l), Some(r)) => (l, r),
                _ => return Ok(Some(Value::Bool(false))),
            };
            let ordering = value_ordering(&left, &right)?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Some(Value::Bool(result)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let left = evaluate(lhs, input)?;
            let right = evaluate(rhs, input)?;
            let (left, right) = match (left, right) {
                (Some(l), Some(r)) => (l, r),
                _ => return Ok(None),
            };
            let a = expect_number(&left, "left side of arithmetic")?;
            let b = expect_number(&right, "right side of arithmetic")?;
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            };
            number_value(result).map(Some)
        }
    }
}

/// Truthiness of a possibly undefined value
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => items.iter().any(|item| is_truthy(Some(item))),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Convert an `f64` result into a JSON number, keeping integers integral
pub fn number_value(n: f64) -> EvalResult<Value> {
    if !n.is_finite() {
        return Err(ExpressionError::NumberOutOfRange {
            message: format!("{} cannot be represented", n),
        });
    }
    // 2^53: every integer below is exactly representable
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Ok(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| ExpressionError::NumberOutOfRange {
            message: format!("{} cannot be represented", n),
        })
}

fn expect_number(value: &Value, context: &str) -> EvalResult<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            ExpressionError::type_mismatch("number", "unrepresentable number", context)
        }),
        other => Err(ExpressionError::type_mismatch(
            "number",
            value_type_name(other),
            context,
        )),
    }
}

fn expect_string<'v>(value: &'v Value, function: &str) -> EvalResult<&'v str> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ExpressionError::function(
            function,
            format!("expected a string argument, found {}", value_type_name(other)),
        )),
    }
}

/// Text a value contributes to `&` concatenation
fn concat_text(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => format_number(n),
        Some(other) => other.to_string(),
    }
}

fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => f.to_string(),
        _ => n.to_string(),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn value_ordering(left: &Value, right: &Value) -> EvalResult<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
        }
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(ExpressionError::type_mismatch(
            "two numbers or two strings",
            format!("{} and {}", value_type_name(left), value_type_name(right)),
            "comparison",
        )),
    }
}

/// Get type name for a JSON value
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn arity(function: &str, args: &[Option<Value>], min: usize, max: usize) -> EvalResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(ExpressionError::function(
            function,
            format!("expected {} arguments, got {}", expected, args.len()),
        ));
    }
    Ok(())
}

fn as_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Round half to even at the given number of decimal places
fn round_half_even(n: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    let scaled = n * factor;
    let rounded = if (scaled - scaled.trunc()).abs() == 0.5 {
        2.0 * (scaled / 2.0).round()
    } else {
        scaled.round()
    };
    rounded / factor
}

fn call_function(name: &str, mut args: Vec<Option<Value>>) -> EvalResult<Option<Value>> {
    match name {
        "exists" => {
            arity(name, &args, 1, 1)?;
            Ok(Some(Value::Bool(args[0].is_some())))
        }
        "count" => {
            arity(name, &args, 1, 1)?;
            let count = match args.remove(0) {
                None => 0,
                Some(value) => as_items(value).len(),
            };
            Ok(Some(Value::from(count)))
        }
        "boolean" => {
            arity(name, &args, 1, 1)?;
            Ok(args[0].as_ref().map(|v| Value::Bool(is_truthy(Some(v)))))
        }
        "not" => {
            arity(name, &args, 1, 1)?;
            Ok(args[0].as_ref().map(|v| Value::Bool(!is_truthy(Some(v)))))
        }
        "string" => {
            arity(name, &args, 1, 1)?;
            Ok(args
                .remove(0)
                .map(|value| Value::String(concat_text(Some(&value)))))
        }
        "number" => {
            arity(name, &args, 1, 1)?;
            let value = match args.remove(0) {
                Some(value) => value,
                None => return Ok(None),
            };
            if value.is_number() {
                return Ok(Some(value));
            }
            let n = match &value {
                Value::Bool(b) => {
                    if *b {
                        1.0
                    } else {
                        0.0
                    }
                }
                Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
                    ExpressionError::function(name, format!("cannot convert '{}' to a number", s))
                })?,
                other => {
                    return Err(ExpressionError::function(
                        name,
                        format!("cannot convert {} to a number", value_type_name(other)),
                    ))
                }
            };
            number_value(n).map(Some)
        }
        "uppercase" | "lowercase" | "length" => {
            arity(name, &args, 1, 1)?;
            let value = match args.remove(0) {
                Some(value) => value,
                None => return Ok(None),
            };
            let text = expect_string(&value, name)?;
            Ok(Some(match name {
                "uppercase" => Value::String(text.to_uppercase()),
                "lowercase" => Value::String(text.to_lowercase()),
                _ => Value::from(text.chars().count()),
            }))
        }
        "substring" => {
            arity(name, &args, 2, 3)?;
            let value = match args[0].take() {
                Some(value) => value,
                None => return Ok(None),
            };
            let chars: Vec<char> = expect_string(&value, name)?.chars().collect();
            let len = chars.len() as i64;
            let start = match &args[1] {
                Some(v) => expect_number(v, "$substring start")? as i64,
                None => return Ok(None),
            };
            let start = if start < 0 { len.saturating_add(start).max(0) } else { start.min(len) };
            let end = match args.get(2).and_then(|v| v.as_ref()) {
                Some(v) => {
                    let count = expect_number(v, "$substring length")? as i64;
                    start.saturating_add(count.max(0)).min(len)
                }
                None => len,
            };
            let text: String = chars[start as usize..end as usize].iter().collect();
            Ok(Some(Value::String(text)))
        }
        "abs" | "floor" | "ceil" => {
            arity(name, &args, 1, 1)?;
            let value = match args.remove(0) {
                Some(value) => value,
                None => return Ok(None),
            };
            let n = expect_number(&value, name)?;
            let result = match name {
                "abs" => n.abs(),
                "floor" => n.floor(),
                _ => n.ceil(),
            };
            number_value(result).map(Some)
        }
        "round" => {
            arity(name, &args, 1, 2)?;
            let value = match args[0].take() {
                Some(value) => value,
                None => return Ok(None),
            };
            let n = expect_number(&value, name)?;
            let precision = match args.get(1).and_then(|v| v.as_ref()) {
                Some(v) => expect_number(v, "$round precision")? as i32,
                None => 0,
            };
            number_value(round_half_even(n, precision)).map(Some)
        }
        "sum" => {
            arity(name, &args, 1, 1)?;
            let value = match args.remove(0) {
                Some(value) => value,
                None => return number_value(0.0).map(Some),
            };
            let mut total = 0.0;
            for item in as_items(value) {
                total += expect_number(&item, "$sum item")?;
            }
            number_value(total).map(Some)
        }
        "join" => {
            arity(name, &args, 1, 2)?;
            let value = match args[0].take() {
                Some(value) => value,
                None => return Ok(None),
            };
            let separator = match args.get(1).and_then(|v| v.as_ref()) {
                Some(v) => expect_string(v, name)?.to_string(),
                None => String::new(),
            };
            let parts = as_items(value)
                .iter()
                .map(|item| expect_string(item, name).map(str::to_string))
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Some(Value::String(parts.join(&separator))))
        }
        other => Err(ExpressionError::Unsupported {
            feature: format!("function ${}", other),
        }),
    }
}
