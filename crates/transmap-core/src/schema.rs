//! Type trees derived from JSON Schema
//!
//! Mapping only needs the shape of a document, never its values. A type
//! tree is a nested JSON object whose leaves name the primitive type found
//! there (`"string"`, `"integer"`, ...); arrays become a one-element array
//! holding the item's tree.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Type name used when a schema declares no type
pub const ANY_TYPE: &str = "any";

/// Merge the properties of every `allOf` member into one object schema
fn flatten_all_of(schema: &Value) -> Value {
    let members = match schema.get("allOf").and_then(Value::as_array) {
        Some(members) => members,
        None => return schema.clone(),
    };

    let mut properties = Map::new();
    for member in members {
        let flattened = flatten_all_of(member);
        if let Some(Value::Object(member_properties)) = flattened.get("properties") {
            for (name, property) in member_properties {
                properties.insert(name.clone(), property.clone());
            }
        }
    }

    let mut combined = Map::new();
    combined.insert("type".to_string(), Value::String("object".to_string()));
    combined.insert("properties".to_string(), Value::Object(properties));
    Value::Object(combined)
}

/// Convert a JSON Schema into a type tree
pub fn schema_to_type_tree(schema: &Value) -> Value {
    let schema = flatten_all_of(schema);
    let type_name = schema.get("type").and_then(Value::as_str);

    match type_name {
        Some("object") => {
            let properties = schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|properties| {
                    properties
                        .iter()
                        .map(|(name, property)| (name.clone(), schema_to_type_tree(property)))
                        .collect::<Map<_, _>>()
                })
                .unwrap_or_default();
            Value::Object(properties)
        }
        Some("array") => {
            let items = schema
                .get("items")
                .map(schema_to_type_tree)
                .unwrap_or_else(|| Value::String(ANY_TYPE.to_string()));
            Value::Array(vec![items])
        }
        Some(primitive) => Value::String(primitive.to_string()),
        None if schema.get("properties").is_some() => {
            // untyped schema with properties is still an object
            let mut typed = schema.clone();
            if let Value::Object(map) = &mut typed {
                map.insert("type".to_string(), Value::String("object".to_string()));
            }
            schema_to_type_tree(&typed)
        }
        None => Value::String(ANY_TYPE.to_string()),
    }
}

/// An operation parameter as declared in an OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// `path`, `query`, `header`, `cookie` or `body`
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub schema: Value,
}

/// Type tree of an operation request
///
/// Non-body parameters are collected under `parameters`, the JSON body
/// under `body`. Optional parameters other than path parameters are left
/// out when `required_only` is set.
pub fn request_type_tree(parameters: &[Parameter], body: Option<&Value>, required_only: bool) -> Value {
    let mut tree = Map::new();

    let parameter_tree: Map<String, Value> = parameters
        .iter()
        .filter(|p| p.location != "body")
        .filter(|p| !required_only || p.location == "path" || p.required)
        .map(|p| (p.name.clone(), schema_to_type_tree(&p.schema)))
        .collect();
    if !parameter_tree.is_empty() {
        tree.insert("parameters".to_string(), Value::Object(parameter_tree));
    }
    if let Some(body) = body {
        tree.insert("body".to_string(), schema_to_type_tree(body));
    }

    Value::Object(tree)
}

/// Source of request, response and message type trees by interface id
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Request type tree of an OpenAPI interface
    async fn request_schema(&self, interface_id: &str) -> Result<Option<Value>>;

    /// Response type tree of an OpenAPI interface
    async fn response_schema(&self, interface_id: &str) -> Result<Option<Value>>;

    /// Message type tree of an AsyncAPI interface
    async fn message_schema(&self, interface_id: &str) -> Result<Option<Value>>;
}

/// Schema provider over type trees registered up front
///
/// Deserializes from `{"request": {id: tree}, "response": {...}, "message": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticSchemaProvider {
    #[serde(default)]
    pub request: BTreeMap<String, Value>,
    #[serde(default)]
    pub response: BTreeMap<String, Value>,
    #[serde(default)]
    pub message: BTreeMap<String, Value>,
}

impl StaticSchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request(mut self, interface_id: impl Into<String>, tree: Value) -> Self {
        self.request.insert(interface_id.into(), tree);
        self
    }

    pub fn with_response(mut self, interface_id: impl Into<String>, tree: Value) -> Self {
        self.response.insert(interface_id.into(), tree);
        self
    }

    pub fn with_message(mut self, interface_id: impl Into<String>, tree: Value) -> Self {
        self.message.insert(interface_id.into(), tree);
        self
    }
}

#[async_trait]
impl SchemaProvider for StaticSchemaProvider {
    async fn request_schema(&self, interface_id: &str) -> Result<Option<Value>> {
        Ok(self.request.get(interface_id).cloned())
    }

    async fn response_schema(&self, interface_id: &str) -> Result<Option<Value>> {
        Ok(self.response.get(interface_id).cloned())
    }

    async fn message_schema(&self, interface_id: &str) -> Result<Option<Value>> {
        Ok(self.message.get(interface_id).cloned())
    }
}
