//! Persistence for the attribute knowledge graph
//!
//! Nodes are documents keyed by attribute id, each holding the node's
//! connected-component list and its outgoing edges. Two backends are
//! provided: an in-process map and a JSON file.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A directed, transformation-labelled edge between two attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEdge {
    /// Attribute id the edge starts from
    pub source: String,
    /// Attribute id the edge points to
    pub target: String,
    /// Expression computing `target` from a path named `source`
    pub transformation: String,
}

impl MappingEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        transformation: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            transformation: transformation.into(),
        }
    }
}

/// Persisted document of one attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeNode {
    /// Ids of every attribute reachable from this one, itself included
    pub component: Vec<String>,
    /// Outgoing edges
    pub edges: Vec<MappingEdge>,
}

impl AttributeNode {
    /// A fresh node whose component is only itself
    pub fn singleton(id: &str) -> Self {
        Self {
            component: vec![id.to_string()],
            edges: Vec::new(),
        }
    }
}

/// Storage backend for attribute nodes
///
/// `append_edge` and `extend_component` behave like array unions on the
/// stored document: they never duplicate entries already present.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Fetch a node by id
    async fn get(&self, id: &str) -> Result<Option<AttributeNode>>;

    /// Insert or replace a node
    async fn upsert(&self, id: &str, node: AttributeNode) -> Result<()>;

    /// Fetch every existing node among `ids`, skipping unknown ids
    async fn list_by_ids(&self, ids: &[String]) -> Result<Vec<(String, AttributeNode)>> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.get(id).await? {
                nodes.push((id.clone(), node));
            }
        }
        Ok(nodes)
    }

    /// Append an edge to an existing node
    async fn append_edge(&self, id: &str, edge: MappingEdge) -> Result<()> {
        let mut node = self
            .get(id)
            .await?
            .ok_or_else(|| Error::store(format!("attribute {} does not exist", id)))?;
        if !node.edges.contains(&edge) {
            node.edges.push(edge);
        }
        self.upsert(id, node).await
    }

    /// Union `ids` into an existing node's component list
    async fn extend_component(&self, id: &str, ids: &[String]) -> Result<()> {
        let mut node = self
            .get(id)
            .await?
            .ok_or_else(|| Error::store(format!("attribute {} does not exist", id)))?;
        for other in ids {
            if !node.component.contains(other) {
                node.component.push(other.clone());
            }
        }
        self.upsert(id, node).await
    }
}

/// Attribute store held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttributeStore {
    nodes: Arc<RwLock<HashMap<String, AttributeNode>>>,
}

impl InMemoryAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}

#[async_trait]
impl AttributeStore for InMemoryAttributeStore {
    async fn get(&self, id: &str) -> Result<Option<AttributeNode>> {
        Ok(self.nodes.read().await.get(id).cloned())
    }

    async fn upsert(&self, id: &str, node: AttributeNode) -> Result<()> {
        self.nodes.write().await.insert(id.to_string(), node);
        Ok(())
    }
}

/// Attribute store persisted as a single JSON document on disk
///
/// The whole graph is loaded on open and rewritten after every mutation.
#[derive(Debug, Clone)]
pub struct JsonFileAttributeStore {
    path: PathBuf,
    nodes: Arc<RwLock<BTreeMap<String, AttributeNode>>>,
}

impl JsonFileAttributeStore {
    /// Open the store at `path`, starting empty when the file is missing
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let nodes = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), nodes = nodes.len(), "opened attribute store");

        Ok(Self {
            path,
            nodes: Arc::new(RwLock::new(nodes)),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, nodes: &BTreeMap<String, AttributeNode>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(nodes)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl AttributeStore for JsonFileAttributeStore {
    async fn get(&self, id: &str) -> Result<Option<AttributeNode>> {
        Ok(self.nodes.read().await.get(id).cloned())
    }

    async fn upsert(&self, id: &str, node: AttributeNode) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        let mut updated = nodes.clone();
        updated.insert(id.to_string(), node);
        self.flush(&updated).await?;
        *nodes = updated;
        Ok(())
    }
}
