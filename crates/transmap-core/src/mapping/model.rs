//! Persisted mapping documents and their builders

use super::compiler::compile;
use super::tree::{json_string, json_string_map, MappingTree};
use crate::error::{Error, Result};
use crate::types::{asyncapi_interface_id, MappingDirection, MappingPair, MappingType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A compiled mapping between one source interface and its targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    /// Store-assigned id; absent until persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// User who created the mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(rename = "type")]
    pub mapping_type: MappingType,

    /// Interface id of the source operation
    pub source_id: String,

    /// Interface ids of the target operations
    pub target_ids: Vec<String>,

    #[serde(flatten)]
    pub body: MappingBody,
}

/// Adapter-type specific part of a mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingBody {
    /// Request/response mapping of a synchronous operation
    #[serde(rename_all = "camelCase")]
    OpenApi {
        /// Builds every target request from the source request
        #[serde(with = "json_string")]
        request_mapping: MappingTree,
        /// Builds the source response from the target responses
        #[serde(with = "json_string")]
        response_mapping: MappingTree,
    },
    /// Message mappings of an event-driven operation
    #[serde(rename_all = "camelCase")]
    AsyncApi {
        direction: MappingDirection,
        topics: Endpoints,
        servers: Endpoints,
        /// One compiled tree per target interface id
        #[serde(with = "json_string_map")]
        message_mappings: BTreeMap<String, MappingTree>,
    },
}

/// Source and per-target values of an AsyncAPI mapping (topics or servers)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub source: String,
    pub targets: BTreeMap<String, String>,
}

/// An AsyncAPI operation taking part in a mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncApiOperation {
    pub api_id: String,
    pub operation_id: String,
    /// Channel name, possibly containing `{param}` placeholders
    pub topic: String,
    /// Server the channel lives on
    pub server: String,
}

impl AsyncApiOperation {
    pub fn interface_id(&self) -> String {
        asyncapi_interface_id(&self.api_id, &self.operation_id)
    }
}

impl MappingBody {
    fn kind(&self) -> &'static str {
        match self {
            MappingBody::OpenApi { .. } => "OpenAPI",
            MappingBody::AsyncApi { .. } => "AsyncAPI",
        }
    }
}

impl Mapping {
    /// Name of the adapter type
    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }

    /// Request and response trees of an OpenAPI mapping
    pub fn openapi_trees(&self) -> Result<(&MappingTree, &MappingTree)> {
        match &self.body {
            MappingBody::OpenApi {
                request_mapping,
                response_mapping,
            } => Ok((request_mapping, response_mapping)),
            other => Err(Error::MappingKind {
                expected: "OpenAPI".to_string(),
                found: other.kind().to_string(),
            }),
        }
    }

    /// Direction and per-target trees of an AsyncAPI mapping
    pub fn asyncapi_trees(&self) -> Result<(MappingDirection, &BTreeMap<String, MappingTree>)> {
        match &self.body {
            MappingBody::AsyncApi {
                direction,
                message_mappings,
                ..
            } => Ok((*direction, message_mappings)),
            other => Err(Error::MappingKind {
                expected: "AsyncAPI".to_string(),
                found: other.kind().to_string(),
            }),
        }
    }

    /// True when `target_id` is one of the mapping's targets
    pub fn targets(&self, target_id: &str) -> bool {
        self.target_ids.iter().any(|id| id == target_id)
    }
}

/// Build an OpenAPI mapping from request and response pairs
///
/// Request pairs are compiled as [`MappingDirection::Input`], response
/// pairs as [`MappingDirection::Output`].
pub fn build_openapi_mapping(
    source_id: &str,
    target_ids: &[String],
    request_pairs: &[MappingPair],
    response_pairs: &[MappingPair],
    mapping_type: MappingType,
    created_by: Option<String>,
) -> Result<Mapping> {
    let request_mapping = compile(request_pairs, MappingDirection::Input)?;
    let response_mapping = compile(response_pairs, MappingDirection::Output)?;

    Ok(Mapping {
        id: None,
        created_by,
        mapping_type,
        source_id: source_id.to_string(),
        target_ids: target_ids.to_vec(),
        body: MappingBody::OpenApi {
            request_mapping,
            response_mapping,
        },
    })
}

/// Interface id a message pair belongs to
///
/// Publishing sources fill the targets, so an output pair belongs to the
/// root of its required leaf; an input pair belongs to the root of its
/// first provided leaf.
fn pair_target(pair: &MappingPair, direction: MappingDirection) -> Option<&str> {
    match direction {
        MappingDirection::Output => pair.required.first(),
        MappingDirection::Input => pair.provided.first().and_then(|chain| chain.first()),
    }
    .map(String::as_str)
}

/// Build an AsyncAPI mapping, compiling one tree per target
pub fn build_asyncapi_mapping(
    source: &AsyncApiOperation,
    targets: &[AsyncApiOperation],
    pairs: &[MappingPair],
    direction: MappingDirection,
    mapping_type: MappingType,
    created_by: Option<String>,
) -> Result<Mapping> {
    let mut message_mappings = BTreeMap::new();
    let mut topics = Endpoints {
        source: source.topic.clone(),
        targets: BTreeMap::new(),
    };
    let mut servers = Endpoints {
        source: source.server.clone(),
        targets: BTreeMap::new(),
    };

    for target in targets {
        let target_id = target.interface_id();
        let target_pairs: Vec<MappingPair> = pairs
            .iter()
            .filter(|pair| pair_target(pair, direction) == Some(target_id.as_str()))
            .cloned()
            .collect();
        debug!(%target_id, pairs = target_pairs.len(), %direction, "grouped message pairs");

        message_mappings.insert(target_id.clone(), compile(&target_pairs, direction)?);
        topics.targets.insert(target_id.clone(), target.topic.clone());
        servers.targets.insert(target_id, target.server.clone());
    }

    Ok(Mapping {
        id: None,
        created_by,
        mapping_type,
        source_id: source.interface_id(),
        target_ids: targets.iter().map(AsyncApiOperation::interface_id).collect(),
        body: MappingBody::AsyncApi {
            direction,
            topics,
            servers,
            message_mappings,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{key_chain, CreationType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn operation(api: &str, op: &str) -> AsyncApiOperation {
        AsyncApiOperation {
            api_id: api.to_string(),
            operation_id: op.to_string(),
            topic: format!("{}/{{deviceId}}/{}", api, op),
            server: "mqtt://broker:1883".to_string(),
        }
    }

    fn pair(provided: &str, required: &str) -> MappingPair {
        MappingPair::manual(
            vec![key_chain(provided.split('.'))],
            key_chain(required.split('.')),
        )
    }

    #[test]
    fn test_openapi_mapping_serializes_trees_as_strings() {
        let mapping = build_openapi_mapping(
            "shop_getOrder_200",
            &["erp_fetch_200".to_string()],
            &[pair("shop_getOrder_200.parameters.id", "erp_fetch_200.parameters.orderId")],
            &[pair("erp_fetch_200.body.total", "shop_getOrder_200.body.amount")],
            MappingType::Transformation,
            Some("user-1".to_string()),
        )
        .unwrap();

        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["type"], "TRANSFORMATION");
        assert_eq!(json["sourceId"], "shop_getOrder_200");
        assert_eq!(
            json["requestMapping"],
            "{\"erp_fetch_200\":{\"parameters\":{\"orderId\":\"shop_getOrder_200.parameters.id\"}}}"
        );
        assert!(json.get("id").is_none());

        let restored: Mapping = serde_json::from_value(json).unwrap();
        assert_eq!(restored, mapping);
    }

    #[test]
    fn test_asyncapi_output_groups_by_required_root() {
        let source = operation("lights", "measured");
        let targets = vec![operation("dash", "show"), operation("log", "append")];
        let pairs = vec![
            pair("lights_measured.lumens", "dash_show.value"),
            pair("lights_measured.sentAt", "log_append.time"),
            pair("lights_measured.lumens", "log_append.value"),
        ];

        let mapping = build_asyncapi_mapping(
            &source,
            &targets,
            &pairs,
            MappingDirection::Output,
            MappingType::Transformation,
            None,
        )
        .unwrap();

        let (direction, trees) = mapping.asyncapi_trees().unwrap();
        assert_eq!(direction, MappingDirection::Output);
        assert_eq!(trees["dash_show"].leaf_count(), 1);
        assert_eq!(trees["log_append"].leaf_count(), 2);
        assert!(mapping.openapi_trees().is_err());

        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["direction"], "OUTPUT");
        assert_eq!(json["topics"]["targets"]["dash_show"], "dash/{deviceId}/show");
        let restored: Mapping = serde_json::from_value(json).unwrap();
        assert_eq!(restored, mapping);
    }

    #[test]
    fn test_asyncapi_input_groups_by_provided_root() {
        let source = operation("hub", "collect");
        let targets = vec![operation("sensor", "emit")];
        let pairs = vec![
            MappingPair::with_code(
                vec![key_chain(["sensor_emit", "celsius"])],
                key_chain(["hub_collect", "fahrenheit"]),
                "sensor_emit.celsius * 1.8 + 32",
                CreationType::Manual,
            ),
            pair("other_op.x", "hub_collect.y"),
        ];

        let mapping = build_asyncapi_mapping(
            &source,
            &targets,
            &pairs,
            MappingDirection::Input,
            MappingType::Manual,
            None,
        )
        .unwrap();
        let (_, trees) = mapping.asyncapi_trees().unwrap();
        assert_eq!(
            trees["sensor_emit"].to_json(),
            json!({"hub_collect": {"fahrenheit": "sensor_emit.celsius * 1.8 + 32"}})
        );
    }
}
