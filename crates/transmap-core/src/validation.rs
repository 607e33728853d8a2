//! Completeness checks for compiled mappings
//!
//! A mapping is complete when every leaf of the required shape has a
//! value in the compiled tree. Missing leaves are a recoverable outcome,
//! reported as [`ValidationFailure`] inside an `Ok`; only collaborator
//! failures (unknown schema, store errors) surface as [`crate::Error`].

use crate::error::{Error, Result};
use crate::mapping::{Mapping, MappingBody};
use crate::schema::SchemaProvider;
use crate::types::{join_key_chain, KeyChain, MappingDirection, MappingPair};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error as ThisError;
use tracing::{debug, instrument};

/// Why a mapping is not complete
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationFailure {
    #[error("{}", describe_openapi(.missing_request, .missing_response))]
    OpenApi {
        missing_request: Vec<KeyChain>,
        missing_response: Vec<KeyChain>,
    },

    #[error("missing message mappings: {}", describe_messages(.missing_message))]
    AsyncApi {
        missing_message: BTreeMap<String, Vec<KeyChain>>,
    },

    #[error("unmapped required leaves: {}", DottedList(.required))]
    UnmappedPairs { required: Vec<KeyChain> },
}

struct DottedList<'a>(&'a [KeyChain]);

impl fmt::Display for DottedList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dotted: Vec<String> = self.0.iter().map(|chain| join_key_chain(chain)).collect();
        write!(f, "{}", dotted.join(", "))
    }
}

fn describe_openapi(request: &[KeyChain], response: &[KeyChain]) -> String {
    match (request.is_empty(), response.is_empty()) {
        (false, true) => format!("missing request mappings: {}", DottedList(request)),
        (true, false) => format!("missing response mappings: {}", DottedList(response)),
        _ => format!(
            "missing request mappings: {}; missing response mappings: {}",
            DottedList(request),
            DottedList(response)
        ),
    }
}

fn describe_messages(missing: &BTreeMap<String, Vec<KeyChain>>) -> String {
    missing
        .iter()
        .map(|(target, chains)| format!("{} [{}]", target, DottedList(chains)))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationFailure {
    /// Every missing leaf, across all sections
    pub fn missing(&self) -> Vec<KeyChain> {
        match self {
            ValidationFailure::OpenApi {
                missing_request,
                missing_response,
            } => missing_request
                .iter()
                .chain(missing_response)
                .cloned()
                .collect(),
            ValidationFailure::AsyncApi { missing_message } => {
                missing_message.values().flatten().cloned().collect()
            }
            ValidationFailure::UnmappedPairs { required } => required.clone(),
        }
    }
}

/// Leaves present in `required` but absent from `provided`
///
/// Non-array objects in `required` are descended into; everything else is
/// a leaf that must exist at the same key chain in `provided`.
pub fn find_missing(provided: &Value, required: &Value) -> Vec<KeyChain> {
    let mut missing = Vec::new();
    collect_missing(Some(provided), required, &mut Vec::new(), &mut missing);
    missing
}

fn collect_missing(
    provided: Option<&Value>,
    required: &Value,
    chain: &mut KeyChain,
    missing: &mut Vec<KeyChain>,
) {
    let required = match required {
        Value::Object(map) => map,
        _ => return,
    };

    for (key, child) in required {
        let provided_child = provided.and_then(|value| value.get(key));
        chain.push(key.clone());
        match child {
            Value::Object(_) => collect_missing(provided_child, child, chain, missing),
            _ if provided_child.is_none() => missing.push(chain.clone()),
            _ => {}
        }
        chain.pop();
    }
}

/// First pair whose required leaf has no code yet
pub fn first_unmapped(pairs: &[MappingPair]) -> Option<&MappingPair> {
    pairs.iter().find(|pair| pair.is_unmapped())
}

/// Reject pair sets that still contain unmapped leaves
pub fn ensure_all_mapped(pairs: &[MappingPair]) -> std::result::Result<(), ValidationFailure> {
    let required: Vec<KeyChain> = pairs
        .iter()
        .filter(|pair| pair.is_unmapped())
        .map(|pair| pair.required.clone())
        .collect();
    if required.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure::UnmappedPairs { required })
    }
}

/// Validates stored mappings against schemas from a [`SchemaProvider`]
#[derive(Debug, Clone)]
pub struct ValidationEngine<P> {
    schemas: P,
}

impl<P: SchemaProvider> ValidationEngine<P> {
    pub fn new(schemas: P) -> Self {
        Self { schemas }
    }

    pub fn schemas(&self) -> &P {
        &self.schemas
    }

    /// Check that an OpenAPI mapping fills every target request leaf and
    /// every source response leaf
    #[instrument(skip_all, fields(source = %mapping.source_id))]
    pub async fn validate_openapi(
        &self,
        mapping: &Mapping,
    ) -> Result<std::result::Result<(), ValidationFailure>> {
        let (request, response) = mapping.openapi_trees()?;

        let mut required_request = Map::new();
        for target in &mapping.target_ids {
            let tree = self.schemas.request_schema(target).await?;
            required_request.insert(target.clone(), require_schema(target, "request", tree)?);
        }
        let mut required_response = Map::new();
        let tree = self.schemas.response_schema(&mapping.source_id).await?;
        required_response.insert(
            mapping.source_id.clone(),
            require_schema(&mapping.source_id, "response", tree)?,
        );

        let missing_request = find_missing(&request.to_json(), &Value::Object(required_request));
        let missing_response =
            find_missing(&response.to_json(), &Value::Object(required_response));
        debug!(
            missing_request = missing_request.len(),
            missing_response = missing_response.len(),
            "validated openapi mapping"
        );

        if missing_request.is_empty() && missing_response.is_empty() {
            Ok(Ok(()))
        } else {
            Ok(Err(ValidationFailure::OpenApi {
                missing_request,
                missing_response,
            }))
        }
    }

    /// Check every per-target message tree of an AsyncAPI mapping
    ///
    /// An output mapping must fill the target's message; an input mapping
    /// must fill the source's message from each target.
    #[instrument(skip_all, fields(source = %mapping.source_id))]
    pub async fn validate_asyncapi(
        &self,
        mapping: &Mapping,
    ) -> Result<std::result::Result<(), ValidationFailure>> {
        let (direction, trees) = mapping.asyncapi_trees()?;
        let mut missing_message = BTreeMap::new();

        for target in &mapping.target_ids {
            let required_id = match direction {
                MappingDirection::Output => target,
                MappingDirection::Input => &mapping.source_id,
            };
            let schema = self.schemas.message_schema(required_id).await?;
            let mut required = Map::new();
            required.insert(required_id.clone(), require_schema(required_id, "message", schema)?);

            let provided = trees.get(target).map(|tree| tree.to_json()).unwrap_or(Value::Null);
            let missing = find_missing(&provided, &Value::Object(required));
            if !missing.is_empty() {
                missing_message.insert(target.clone(), missing);
            }
        }

        if missing_message.is_empty() {
            Ok(Ok(()))
        } else {
            Ok(Err(ValidationFailure::AsyncApi { missing_message }))
        }
    }

    /// Validate a mapping of either kind
    pub async fn validate(
        &self,
        mapping: &Mapping,
    ) -> Result<std::result::Result<(), ValidationFailure>> {
        match mapping.body {
            MappingBody::OpenApi { .. } => self.validate_openapi(mapping).await,
            MappingBody::AsyncApi { .. } => self.validate_asyncapi(mapping).await,
        }
    }
}

fn require_schema(interface_id: &str, kind: &str, tree: Option<Value>) -> Result<Value> {
    tree.ok_or_else(|| Error::Schema {
        interface: interface_id.to_string(),
        message: format!("no {} schema", kind),
    })
}
