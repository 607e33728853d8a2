//! Expression command handlers

use super::utils::read_document;
use crate::cli::{ExprAction, ExprArgs};
use crate::error::Result;
use crate::output::OutputWriter;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use transmap_core::expression::{classify, invert_source};
use transmap_core::{parse_expression, DefaultEngine, ExpressionEngine};

/// Handle the expr command
#[instrument(skip_all)]
pub async fn handle_expr(args: ExprArgs, output: &mut OutputWriter) -> Result<()> {
    match args.action {
        ExprAction::Classify { expression } => classify_expression(&expression, output),
        ExprAction::Invert {
            attribute,
            expression,
        } => invert_expression(&attribute, &expression, output),
        ExprAction::Eval { expression, input } => {
            let input = match input {
                Some(path) => read_document(&path)?,
                None => json!({}),
            };
            evaluate_expression(&expression, &input, output)
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn classify_expression(expression: &str, output: &mut OutputWriter) -> Result<()> {
    let expr = parse_expression(expression).map_err(transmap_core::Error::from)?;
    let classification = classify(&expr);
    debug!(?classification, "classified expression");

    if !output.is_human() {
        return output.data(&json!({
            "expression": expr.to_string(),
            "isSimple": classification.is_simple,
            "containsPath": classification.contains_path,
            "invertible": classification.is_invertible(),
        }));
    }

    output.writeln(&format!("simple:        {}", yes_no(classification.is_simple)))?;
    output.writeln(&format!("contains path: {}", yes_no(classification.contains_path)))?;
    output.writeln(&format!("invertible:    {}", yes_no(classification.is_invertible())))
}

fn invert_expression(attribute: &str, expression: &str, output: &mut OutputWriter) -> Result<()> {
    let inverse = invert_source(attribute, expression).map_err(transmap_core::Error::from)?;

    if output.is_human() {
        output.writeln(&inverse)
    } else {
        output.data(&json!({ "inverse": inverse }))
    }
}

fn evaluate_expression(expression: &str, input: &Value, output: &mut OutputWriter) -> Result<()> {
    let value = DefaultEngine::new().evaluate_source(expression, input)?;

    match (output.is_human(), value) {
        (true, None) => output.warning("Expression is undefined for this input"),
        (true, Some(value)) => output.data(&value),
        (false, value) => output.data(&json!({
            "defined": value.is_some(),
            "value": value,
        })),
    }
}
