//! In-memory overlay of not-yet-persisted mapping pairs
//!
//! While a mapping is being edited its pairs are not in the attribute
//! store. The overlay turns the simple single-source pairs into the same
//! node shape the store holds, so graph queries can consult both.

use super::is_learnable;
use super::store::{AttributeNode, MappingEdge};
use crate::expression::{invert, parse_expression};
use crate::types::{join_key_chain, MappingPair};
use std::collections::HashMap;
use tracing::trace;

/// Ephemeral attribute nodes built from in-flight mapping pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalOverlay {
    nodes: HashMap<String, AttributeNode>,
}

impl LocalOverlay {
    /// Build the overlay from mapping pairs
    ///
    /// Only pairs with exactly one provided leaf and an invertible mapping
    /// code reading exactly that leaf contribute. A pair connecting
    /// attributes already in the same component adds its edges but leaves
    /// components untouched.
    pub fn build(pairs: &[MappingPair]) -> Self {
        let mut overlay = Self::default();

        for pair in pairs {
            let provided = match pair.single_provided() {
                Some(provided) => provided,
                None => continue,
            };
            let expr = match parse_expression(&pair.mapping_code) {
                Ok(expr) if is_learnable(&expr, provided) => expr,
                _ => continue,
            };

            let source_id = join_key_chain(provided);
            let target_id = join_key_chain(&pair.required);
            let inverse = match invert(&target_id, &expr) {
                Ok(inverse) => inverse.to_string(),
                Err(_) => continue,
            };

            overlay.node_mut(&source_id).edges.push(MappingEdge::new(
                source_id.clone(),
                target_id.clone(),
                pair.mapping_code.clone(),
            ));
            overlay
                .node_mut(&target_id)
                .edges
                .push(MappingEdge::new(target_id.clone(), source_id.clone(), inverse));

            if overlay.nodes[&source_id].component.contains(&target_id) {
                trace!(source = %source_id, target = %target_id, "already connected locally");
                continue;
            }
            overlay.merge_components(&source_id, &target_id);
        }

        overlay
    }

    fn node_mut(&mut self, id: &str) -> &mut AttributeNode {
        self.nodes
            .entry(id.to_string())
            .or_insert_with(|| AttributeNode::singleton(id))
    }

    /// Give every member of both components the combined member list
    fn merge_components(&mut self, a: &str, b: &str) {
        let mut combined = self.nodes[a].component.clone();
        for id in &self.nodes[b].component {
            if !combined.contains(id) {
                combined.push(id.clone());
            }
        }
        for id in &combined {
            self.node_mut(id).component = combined.clone();
        }
    }

    /// Local node for an attribute id
    pub fn get(&self, id: &str) -> Option<&AttributeNode> {
        self.nodes.get(id)
    }

    /// Local component of an attribute, if it appears in the overlay
    pub fn component(&self, id: &str) -> Option<&[String]> {
        self.nodes.get(id).map(|node| node.component.as_slice())
    }

    /// Local outgoing edges of an attribute
    pub fn edges(&self, id: &str) -> &[MappingEdge] {
        self.nodes
            .get(id)
            .map(|node| node.edges.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
