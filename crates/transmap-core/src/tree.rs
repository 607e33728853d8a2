//! Path trees over nested JSON documents
//!
//! The editor presents request, response and message shapes as trees whose
//! leaves are the attributes a mapping can connect. Each node remembers the
//! full key chain from the document root, so selecting a leaf is enough to
//! know what it addresses.

use crate::types::KeyChain;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node in a path tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathTreeNode {
    /// Property name of this node
    pub name: String,
    /// Key chain from the document root, ending with `name`
    pub key_chain: KeyChain,
    /// Child nodes; empty for leaves
    pub children: Vec<PathTreeNode>,
}

impl PathTreeNode {
    /// True when the node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Key chains of every leaf below (or at) this node, depth first
    pub fn leaf_key_chains(&self) -> Vec<KeyChain> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(&self, out: &mut Vec<KeyChain>) {
        if self.is_leaf() {
            out.push(self.key_chain.clone());
        } else {
            for child in &self.children {
                child.collect_leaves(out);
            }
        }
    }

    /// Find the node addressed by `chain` below this node
    pub fn find(&self, chain: &[String]) -> Option<&PathTreeNode> {
        if self.key_chain.as_slice() == chain {
            return Some(self);
        }
        if !chain.starts_with(&self.key_chain) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(chain))
    }
}

/// Convert a nested JSON object into path tree nodes
///
/// Objects contribute one node per key. Arrays and primitives are leaves;
/// a non-object root yields no nodes.
pub fn to_tree(value: &Value, prefix: &[String]) -> Vec<PathTreeNode> {
    let map = match value {
        Value::Object(map) => map,
        _ => return Vec::new(),
    };

    map.iter()
        .map(|(name, child)| {
            let mut key_chain = prefix.to_vec();
            key_chain.push(name.clone());
            let children = to_tree(child, &key_chain);
            PathTreeNode {
                name: name.clone(),
                key_chain,
                children,
            }
        })
        .collect()
}

/// Key chains of every leaf in a forest
pub fn leaf_key_chains(nodes: &[PathTreeNode]) -> Vec<KeyChain> {
    nodes.iter().flat_map(PathTreeNode::leaf_key_chains).collect()
}
