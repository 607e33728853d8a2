//! Core types shared across the Transmap mapping engine
//!
//! This module defines the small vocabulary every component speaks: key
//! chains addressing leaves inside nested JSON, the authored mapping pair,
//! and the closed enums describing mapping direction and provenance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered property names locating a leaf inside nested JSON (no array indexing)
pub type KeyChain = Vec<String>;

/// Join a key chain into its dotted attribute id
pub fn join_key_chain(chain: &[String]) -> String {
    chain.join(".")
}

/// Split a dotted attribute id back into a key chain
///
/// An empty string yields an empty chain.
pub fn split_key_chain(dotted: &str) -> KeyChain {
    if dotted.is_empty() {
        return Vec::new();
    }
    dotted.split('.').map(str::to_string).collect()
}

/// Build a key chain from string slices
pub fn key_chain<I, S>(segments: I) -> KeyChain
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    segments.into_iter().map(Into::into).collect()
}

/// Id of an OpenAPI interface: `apiId_operationId_responseId`
pub fn openapi_interface_id(api_id: &str, operation_id: &str, response_id: &str) -> String {
    format!("{}_{}_{}", api_id, operation_id, response_id)
}

/// Id of an AsyncAPI interface: `apiId_operationId`
pub fn asyncapi_interface_id(api_id: &str, operation_id: &str) -> String {
    format!("{}_{}", api_id, operation_id)
}

/// How a mapping pair came into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreationType {
    /// Authored by the user in the mapping editor
    Manual,
    /// Suggested from the attribute knowledge graph
    Attribute,
}

/// Direction in which messages flow through a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingDirection {
    /// Source and targets subscribe: messages from the targets feed the source
    Input,
    /// Source publishes: messages from the source feed the targets
    Output,
}

/// Provenance of a persisted mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingType {
    /// Hand-written mapping outside the transformation editor
    Manual,
    /// Authored in the transformation editor and validated
    Transformation,
    /// Composed automatically from a chain of existing mappings
    Auto,
}

impl fmt::Display for MappingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingDirection::Input => write!(f, "input"),
            MappingDirection::Output => write!(f, "output"),
        }
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingType::Manual => write!(f, "manual"),
            MappingType::Transformation => write!(f, "transformation"),
            MappingType::Auto => write!(f, "auto"),
        }
    }
}

impl fmt::Display for CreationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationType::Manual => write!(f, "manual"),
            CreationType::Attribute => write!(f, "attribute"),
        }
    }
}

/// The atomic authored unit: one required leaf fed by provided leaves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingPair {
    /// Source-side leaves feeding the expression
    pub provided: Vec<KeyChain>,

    /// The single target-side leaf receiving the value
    pub required: KeyChain,

    /// Expression computing the required leaf; empty while unmapped
    #[serde(default)]
    pub mapping_code: String,

    /// How the pair was created
    pub creation_type: CreationType,
}

impl MappingPair {
    /// Create a manual pair, pre-filling the code when a single leaf is provided
    pub fn manual(provided: Vec<KeyChain>, required: KeyChain) -> Self {
        let mapping_code = match provided.as_slice() {
            [single] => crate::expression::key_reference(single),
            _ => String::new(),
        };
        Self {
            provided,
            required,
            mapping_code,
            creation_type: CreationType::Manual,
        }
    }

    /// Create a pair with an explicit expression
    pub fn with_code(
        provided: Vec<KeyChain>,
        required: KeyChain,
        mapping_code: impl Into<String>,
        creation_type: CreationType,
    ) -> Self {
        Self {
            provided,
            required,
            mapping_code: mapping_code.into(),
            creation_type,
        }
    }

    /// True while no expression has been bound to the required leaf
    pub fn is_unmapped(&self) -> bool {
        self.mapping_code.trim().is_empty()
    }

    /// The provided key chain when exactly one leaf feeds this pair
    pub fn single_provided(&self) -> Option<&KeyChain> {
        match self.provided.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }

    /// Dotted id of the required leaf
    pub fn required_id(&self) -> String {
        join_key_chain(&self.required)
    }
}
