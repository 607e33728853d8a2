//! Mapping store command handlers

use super::utils::{open_graph, open_mappings, read_as};
use crate::cli::{MappingsAction, MappingsArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use serde_json::json;
use std::path::Path;
use tracing::{info, instrument};
use transmap_core::{
    commit_pairs, decompile, Mapping, MappingBody, MappingDirection, MappingPair, MappingStore,
    MappingType,
};

/// Handle the mappings command
#[instrument(skip_all)]
pub async fn handle_mappings(
    args: MappingsArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    match args.action {
        MappingsAction::Import { file, learn } => {
            let store = open_mappings(config, &args.stores).await?;
            let id = import_mapping(&store, &file, config).await?;

            let learned = if learn {
                let mapping = store
                    .get(&id)
                    .await?
                    .ok_or_else(|| Error::other(format!("Mapping {} vanished after import", id)))?;
                let graph = open_graph(config, &args.stores).await?;
                Some(commit_pairs(&graph, &mapping_pairs(&mapping)).await?)
            } else {
                None
            };

            if !output.is_human() {
                return output.data(&json!({ "id": id, "learned": learned }));
            }
            output.success(&format!("✓ Imported mapping {}", id))?;
            if let Some(count) = learned {
                output.info(&format!("Recorded {} transformations in the attribute graph", count))?;
            }
            Ok(())
        }
        MappingsAction::List { mapping_type } => {
            let store = open_mappings(config, &args.stores).await?;
            let mappings = store.list(mapping_type.map(MappingType::from)).await?;
            list_mappings(&mappings, output)
        }
        MappingsAction::Show { id } => {
            let store = open_mappings(config, &args.stores).await?;
            let mapping = store
                .get(&id)
                .await?
                .ok_or_else(|| Error::other(format!("Mapping {} not found", id)))?;
            output.data(&mapping)
        }
    }
}

async fn import_mapping(store: &impl MappingStore, file: &Path, config: &Config) -> Result<String> {
    let mut mapping: Mapping = read_as(file, "a mapping")?;
    if mapping.created_by.is_none() {
        mapping.created_by = config.created_by.clone();
    }
    let id = store.create(mapping).await?;
    info!(%id, file = %file.display(), "imported mapping");
    Ok(id)
}

/// Every pair of a mapping, across all of its trees
fn mapping_pairs(mapping: &Mapping) -> Vec<MappingPair> {
    match &mapping.body {
        MappingBody::OpenApi {
            request_mapping,
            response_mapping,
        } => decompile(request_mapping, MappingDirection::Input)
            .into_iter()
            .chain(decompile(response_mapping, MappingDirection::Output))
            .collect(),
        MappingBody::AsyncApi {
            direction,
            message_mappings,
            ..
        } => message_mappings
            .values()
            .flat_map(|tree| decompile(tree, *direction))
            .collect(),
    }
}

fn list_mappings(mappings: &[Mapping], output: &mut OutputWriter) -> Result<()> {
    if !output.is_human() {
        return output.data(&mappings);
    }
    if mappings.is_empty() {
        return output.info("No mappings stored");
    }

    let rows = mappings
        .iter()
        .map(|mapping| {
            vec![
                mapping.id.clone().unwrap_or_default(),
                mapping.kind().to_string(),
                mapping.mapping_type.to_string(),
                mapping.source_id.clone(),
                mapping.target_ids.join(", "),
            ]
        })
        .collect();
    output.table(&["Id", "Kind", "Type", "Source", "Targets"], rows)
}
