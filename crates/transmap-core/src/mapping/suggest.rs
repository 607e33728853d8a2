//! Mapping pair suggestions
//!
//! Two sources of suggestions feed the editor: leaves that share a name
//! below their interface roots, and attributes the knowledge graph already
//! knows how to derive from one another.

use crate::error::Result;
use crate::expression::classify_source;
use crate::graph::{AttributeGraph, AttributeStore};
use crate::tree::{leaf_key_chains, PathTreeNode};
use crate::types::{join_key_chain, CreationType, KeyChain, MappingPair};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// How [`merge_pairs`] decides that a candidate is already present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKey {
    /// Same required leaf
    Required,
    /// Same required leaf fed from the same provided interface
    RequiredAndProvider,
}

/// Pair every required leaf with same-named provided leaves
///
/// Leaves match when their key chains are equal after dropping the
/// interface-id root segment. A required leaf matching leaves under several
/// provided roots yields one pair per root.
pub fn same_name_pairs(required: &[PathTreeNode], provided: &[PathTreeNode]) -> Vec<MappingPair> {
    let mut by_tail: HashMap<&[String], Vec<&KeyChain>> = HashMap::new();
    let provided_leaves = leaf_key_chains(provided);
    for leaf in &provided_leaves {
        if leaf.len() > 1 {
            by_tail.entry(&leaf[1..]).or_default().push(leaf);
        }
    }

    let pairs: Vec<MappingPair> = leaf_key_chains(required)
        .into_iter()
        .filter(|leaf| leaf.len() > 1)
        .flat_map(|leaf| {
            by_tail
                .get(&leaf[1..])
                .map(|matches| {
                    matches
                        .iter()
                        .map(|provided| MappingPair::manual(vec![(*provided).clone()], leaf.clone()))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })
        .collect();

    debug!(pairs = pairs.len(), "matched same-name leaves");
    pairs
}

fn provider_root(pair: &MappingPair) -> Option<&str> {
    pair.provided
        .first()
        .and_then(|chain| chain.first())
        .map(String::as_str)
}

fn is_present(existing: &[MappingPair], candidate: &MappingPair, key: MergeKey) -> bool {
    existing.iter().any(|pair| {
        pair.required == candidate.required
            && (key == MergeKey::Required || provider_root(pair) == provider_root(candidate))
    })
}

/// Append candidates not already present; returns how many were added
pub fn merge_pairs(existing: &mut Vec<MappingPair>, candidates: Vec<MappingPair>, key: MergeKey) -> usize {
    let mut added = 0;
    for candidate in candidates {
        if !is_present(existing, &candidate, key) {
            existing.push(candidate);
            added += 1;
        }
    }
    added
}

/// Suggest pairs from the attribute graph
///
/// For every required leaf the component is looked up across persisted and
/// in-flight pairs; each provided leaf in it gets the composed
/// transformation as its code. Required leaves without a reachable provided
/// leaf get no suggestion.
#[instrument(skip_all, fields(required = required.len(), provided = provided.len()))]
pub async fn attribute_suggestions<S: AttributeStore>(
    required: &[KeyChain],
    provided: &[KeyChain],
    local_pairs: &[MappingPair],
    graph: &AttributeGraph<S>,
) -> Result<Vec<MappingPair>> {
    let mut suggestions = Vec::new();

    for required_leaf in required {
        let required_id = join_key_chain(required_leaf);
        let component = graph.get_component_local(&required_id, local_pairs).await?;
        if component.len() < 2 {
            continue;
        }

        for provided_leaf in provided {
            let provided_id = join_key_chain(provided_leaf);
            if !component.contains(&provided_id) {
                continue;
            }
            let code = graph
                .get_mapping_local(&provided_id, &required_id, local_pairs)
                .await?;
            if code.is_empty() {
                continue;
            }
            debug!(%provided_id, %required_id, %code, "suggesting attribute mapping");
            suggestions.push(MappingPair::with_code(
                vec![provided_leaf.clone()],
                required_leaf.clone(),
                code,
                CreationType::Attribute,
            ));
            break;
        }
    }

    Ok(suggestions)
}

/// Teach the graph every simple single-provided pair; returns the count
pub async fn commit_pairs<S: AttributeStore>(
    graph: &AttributeGraph<S>,
    pairs: &[MappingPair],
) -> Result<usize> {
    let mut committed = 0;
    for pair in pairs {
        let provided = match pair.single_provided() {
            Some(provided) => provided,
            None => continue,
        };
        if !classify_source(&pair.mapping_code).is_invertible() {
            continue;
        }
        graph
            .add_mapping(&join_key_chain(provided), &pair.required_id(), &pair.mapping_code)
            .await?;
        committed += 1;
    }
    info!(committed, total = pairs.len(), "committed pairs to attribute graph");
    Ok(committed)
}
