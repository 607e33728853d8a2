//! Attribute graph command handlers

use super::utils::{open_graph, read_pairs};
use crate::cli::{GraphAction, GraphArgs};
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use serde_json::json;
use tracing::{info, instrument};
use transmap_core::{AttributeGraph, JsonFileAttributeStore, LocalOverlay};

type FileGraph = AttributeGraph<JsonFileAttributeStore>;

/// Handle the graph command
#[instrument(skip_all)]
pub async fn handle_graph(args: GraphArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let graph = open_graph(config, &args.stores).await?;

    match args.action {
        GraphAction::Add {
            source,
            target,
            transformation,
        } => add_mapping(&graph, &source, &target, &transformation, output).await,
        GraphAction::Component { id, pairs } => {
            let pairs = read_pairs(pairs.as_deref())?;
            show_component(&graph, &id, &pairs, output).await
        }
        GraphAction::Path {
            source,
            target,
            pairs,
        } => {
            let pairs = read_pairs(pairs.as_deref())?;
            show_path(&graph, &source, &target, &pairs, output).await
        }
    }
}

async fn add_mapping(
    graph: &FileGraph,
    source: &str,
    target: &str,
    transformation: &str,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("graph_add", &format!("{} -> {}", source, target));
    graph.add_mapping(source, target, transformation).await?;

    // add_mapping skips transformations it cannot invert
    let recorded = !graph.get_mapping(source, target).await?.is_empty();
    info!(%source, %target, recorded, "graph add");

    if !output.is_human() {
        return output.data(&json!({
            "source": source,
            "target": target,
            "recorded": recorded,
        }));
    }
    if recorded {
        output.success(&format!("✓ Recorded {} → {} and its inverse", source, target))
    } else {
        output.warning(&format!(
            "Transformation was not recorded: it must be invertible and read exactly {}",
            source
        ))
    }
}

async fn show_component(
    graph: &FileGraph,
    id: &str,
    pairs: &[transmap_core::MappingPair],
    output: &mut OutputWriter,
) -> Result<()> {
    let component = if pairs.is_empty() {
        graph.get_component(id).await?.unwrap_or_default()
    } else {
        graph.get_component_local(id, pairs).await?
    };

    if !output.is_human() {
        return output.data(&component);
    }
    if component.is_empty() {
        return output.warning(&format!("Attribute {} is not in the graph", id));
    }
    for member in &component {
        output.writeln(member)?;
    }
    Ok(())
}

async fn show_path(
    graph: &FileGraph,
    source: &str,
    target: &str,
    pairs: &[transmap_core::MappingPair],
    output: &mut OutputWriter,
) -> Result<()> {
    let overlay = (!pairs.is_empty()).then(|| LocalOverlay::build(pairs));
    let edges = graph.shortest_path(source, target, overlay.as_ref()).await?;
    let transformation = transmap_core::graph::join_transformations(&edges);

    if !output.is_human() {
        return output.data(&json!({
            "edges": edges,
            "transformation": transformation,
        }));
    }

    if edges.is_empty() {
        return output.warning(&format!("No path from {} to {}", source, target));
    }

    let rows = edges
        .iter()
        .map(|edge| {
            vec![
                edge.source.clone(),
                edge.target.clone(),
                edge.transformation.clone(),
            ]
        })
        .collect();
    output.table(&["From", "To", "Transformation"], rows)?;
    output.section("Composed")?;
    output.writeln(&transformation)
}
