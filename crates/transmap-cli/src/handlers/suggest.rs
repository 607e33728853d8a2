//! Suggest command handler

use super::utils::{load_schemas, open_graph};
use crate::cli::{PartArg, SuggestArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use serde_json::json;
use tracing::{info, instrument};
use transmap_core::{
    attribute_suggestions, leaf_key_chains, merge_pairs, same_name_pairs, to_tree, MappingPair,
    MergeKey, PathTreeNode, SchemaProvider, StaticSchemaProvider,
};

async fn interface_tree(
    schemas: &StaticSchemaProvider,
    part: PartArg,
    interface_id: &str,
) -> Result<Vec<PathTreeNode>> {
    let (name, schema) = match part {
        PartArg::Request => ("request", schemas.request_schema(interface_id).await?),
        PartArg::Response => ("response", schemas.response_schema(interface_id).await?),
        PartArg::Message => ("message", schemas.message_schema(interface_id).await?),
    };
    let schema = schema.ok_or_else(|| {
        Error::invalid_args(format!("No {} schema for '{}'", name, interface_id))
    })?;
    Ok(to_tree(&json!({ interface_id: schema }), &[]))
}

/// Handle the suggest command
///
/// Same-name leaves are paired first; remaining required leaves are filled
/// from the attribute graph. Leaves without any suggestion are listed
/// unmapped. With `--per-provider` a required leaf keeps one suggestion
/// for each provided interface.
#[instrument(skip(config, output), fields(required = %args.required, provided = ?args.provided))]
pub async fn handle_suggest(
    args: SuggestArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let schemas = load_schemas(&args.schemas)?;
    let required = interface_tree(&schemas, args.part, &args.required).await?;
    let required_leaves = leaf_key_chains(&required);
    let mut providers = Vec::with_capacity(args.provided.len());
    for interface_id in &args.provided {
        providers.push(interface_tree(&schemas, args.part, interface_id).await?);
    }
    let key = merge_key(args.per_provider);

    let mut pairs = Vec::new();
    let all_provided: Vec<PathTreeNode> = providers.iter().flatten().cloned().collect();
    let by_name = merge_pairs(&mut pairs, same_name_pairs(&required, &all_provided), key);

    let graph = open_graph(config, &args.stores).await?;
    let mut by_attribute = 0;
    for provided in &providers {
        let suggested = attribute_suggestions(
            &required_leaves,
            &leaf_key_chains(provided),
            &pairs,
            &graph,
        )
        .await?;
        by_attribute += merge_pairs(&mut pairs, suggested, key);
    }

    // placeholders carry no provider, so they only fill leaves nothing maps
    let unmapped = required_leaves
        .iter()
        .map(|leaf| MappingPair::manual(Vec::new(), leaf.clone()))
        .collect();
    merge_pairs(&mut pairs, unmapped, MergeKey::Required);
    info!(by_name, by_attribute, total = pairs.len(), "suggested pairs");

    output.mapping_pairs(&pairs)?;
    output.info(&format!(
        "{} suggestions for {} required leaves ({} by name, {} from the attribute graph)",
        by_name + by_attribute,
        required_leaves.len(),
        by_name,
        by_attribute
    ))
}

fn merge_key(per_provider: bool) -> MergeKey {
    if per_provider {
        MergeKey::RequiredAndProvider
    } else {
        MergeKey::Required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transmap_core::key_chain;

    #[tokio::test]
    async fn test_interface_tree_roots_leaves_at_interface() {
        let schemas = StaticSchemaProvider::new()
            .with_message("hub_notify", json!({"room": "string"}));

        let tree = interface_tree(&schemas, PartArg::Message, "hub_notify").await.unwrap();
        assert_eq!(leaf_key_chains(&tree), vec![key_chain(["hub_notify", "room"])]);

        let missing = interface_tree(&schemas, PartArg::Request, "hub_notify").await;
        assert!(matches!(missing, Err(Error::InvalidArgs(_))));
    }

    #[test]
    fn test_per_provider_keeps_each_provider() {
        let required = to_tree(&json!({"lamp_set": {"level": "integer"}}), &[]);
        let provided = to_tree(
            &json!({"hub_a": {"level": "integer"}, "hub_b": {"level": "integer"}}),
            &[],
        );

        let mut shared = Vec::new();
        merge_pairs(&mut shared, same_name_pairs(&required, &provided), merge_key(false));
        assert_eq!(shared.len(), 1);

        let mut per_provider = Vec::new();
        merge_pairs(&mut per_provider, same_name_pairs(&required, &provided), merge_key(true));
        assert_eq!(per_provider.len(), 2);
        assert_eq!(per_provider[1].provided, vec![key_chain(["hub_b", "level"])]);
    }
}
