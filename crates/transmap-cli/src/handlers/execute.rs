//! Execute command handler

use super::utils::{read_as, read_document};
use crate::cli::{ExecuteArgs, PartArg};
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, instrument};
use transmap_core::{
    execute_mapping, resolve_topic, DefaultEngine, Endpoints, Mapping, MappingBody,
    MappingDirection, MappingTree,
};

/// Handle the execute command
#[instrument(skip(output), fields(mapping = %args.mapping.display()))]
pub async fn handle_execute(args: ExecuteArgs, output: &mut OutputWriter) -> Result<()> {
    let mapping: Mapping = read_as(&args.mapping, "a mapping")?;
    let payload = read_document(&args.payload)?;
    let engine = DefaultEngine::new();

    match &mapping.body {
        MappingBody::OpenApi {
            request_mapping,
            response_mapping,
        } => {
            let tree = match args.part {
                PartArg::Request => request_mapping,
                PartArg::Response => response_mapping,
                PartArg::Message => {
                    return Err(Error::invalid_args(
                        "request/response mappings have no message part",
                    ))
                }
            };
            let result = execute_mapping(tree, &payload, &engine)?;
            output.data(&result)
        }
        MappingBody::AsyncApi {
            direction,
            topics,
            message_mappings,
            ..
        } => {
            let params: Map<String, Value> = args
                .params
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect();
            let trees = select_targets(message_mappings, args.target.as_deref())?;

            let mut messages = Map::new();
            for (target_id, tree) in trees {
                let message = execute_mapping(tree, &payload, &engine)?;
                let topic = resolve_topic(message_topic(topics, *direction, target_id), &params);
                debug!(%target_id, %topic, "built message");
                messages.insert(
                    target_id.clone(),
                    json!({ "topic": topic, "payload": message }),
                );
            }
            output.data(&Value::Object(messages))
        }
    }
}

fn select_targets<'a>(
    trees: &'a BTreeMap<String, MappingTree>,
    target: Option<&str>,
) -> Result<Vec<(&'a String, &'a MappingTree)>> {
    match target {
        None => Ok(trees.iter().collect()),
        Some(target) => trees
            .get_key_value(target)
            .map(|entry| vec![entry])
            .ok_or_else(|| Error::invalid_args(format!("'{}' is not a target of this mapping", target))),
    }
}

/// Channel a built message is published on
///
/// Output mappings feed the targets; input mappings feed the source.
fn message_topic<'a>(topics: &'a Endpoints, direction: MappingDirection, target_id: &str) -> &'a str {
    match direction {
        MappingDirection::Output => topics
            .targets
            .get(target_id)
            .map(String::as_str)
            .unwrap_or_default(),
        MappingDirection::Input => &topics.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints {
            source: "lamps/{id}/set".to_string(),
            targets: BTreeMap::from([("hub_notify".to_string(), "hub/{room}".to_string())]),
        }
    }

    #[test]
    fn test_message_topic_follows_direction() {
        let topics = endpoints();
        assert_eq!(
            message_topic(&topics, MappingDirection::Output, "hub_notify"),
            "hub/{room}"
        );
        assert_eq!(
            message_topic(&topics, MappingDirection::Input, "hub_notify"),
            "lamps/{id}/set"
        );
        assert_eq!(message_topic(&topics, MappingDirection::Output, "other"), "");
    }

    #[test]
    fn test_select_targets() {
        let trees = BTreeMap::from([
            ("a".to_string(), MappingTree::new()),
            ("b".to_string(), MappingTree::new()),
        ]);
        assert_eq!(select_targets(&trees, None).unwrap().len(), 2);
        assert_eq!(select_targets(&trees, Some("b")).unwrap()[0].0, "b");
        assert!(matches!(
            select_targets(&trees, Some("c")),
            Err(Error::InvalidArgs(_))
        ));
    }
}
