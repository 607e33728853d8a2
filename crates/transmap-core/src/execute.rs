//! Running compiled mappings against payloads

use crate::error::Result;
use crate::expression::ExpressionEngine;
use crate::mapping::{MappingLeaf, MappingTree};
use crate::types::join_key_chain;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Evaluate a compiled mapping tree against `input`
///
/// Code leaves are evaluated with `engine`; literal leaves are copied.
/// Keys whose expression is undefined are left out of the output, their
/// enclosing objects are kept.
pub fn execute_mapping(
    tree: &MappingTree,
    input: &Value,
    engine: &dyn ExpressionEngine,
) -> Result<Value> {
    let mut chain = Vec::new();
    let output = execute_node(tree, input, engine, &mut chain)?;
    Ok(output.unwrap_or_else(|| Value::Object(Map::new())))
}

fn execute_node(
    tree: &MappingTree,
    input: &Value,
    engine: &dyn ExpressionEngine,
    chain: &mut Vec<String>,
) -> Result<Option<Value>> {
    match tree {
        MappingTree::Leaf(MappingLeaf::Literal(value)) => Ok(Some(value.clone())),
        MappingTree::Leaf(MappingLeaf::Code(code)) => {
            let value = engine.evaluate_source(code, input)?;
            if value.is_none() {
                trace!(leaf = %join_key_chain(chain), %code, "expression is undefined");
            }
            Ok(value)
        }
        MappingTree::Branch(children) => {
            let mut object = Map::new();
            for (key, child) in children {
                chain.push(key.clone());
                let value = execute_node(child, input, engine, chain)?;
                chain.pop();
                if let Some(value) = value {
                    object.insert(key.clone(), value);
                }
            }
            Ok(Some(Value::Object(object)))
        }
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"))
}

/// Substitute `{name}` placeholders of a channel template
///
/// String parameters are inserted as is, other values in their JSON form.
/// Placeholders without a parameter are kept verbatim.
pub fn resolve_topic(template: &str, params: &Map<String, Value>) -> String {
    let resolved = placeholder().replace_all(template, |captures: &Captures<'_>| {
        match params.get(&captures[1]) {
            Some(Value::String(value)) => value.clone(),
            Some(Value::Null) | None => captures[0].to_string(),
            Some(other) => other.to_string(),
        }
    });
    debug!(%template, topic = %resolved, "resolved topic");
    resolved.into_owned()
}
