//! Attribute knowledge graph
//!
//! Every validated single-source mapping pair teaches the graph two edges:
//! the forward transformation and its algebraic inverse. Nodes also carry
//! the list of attributes in their connected component, which lets the
//! editor decide cheaply whether a suggestion exists before searching for
//! the transformation path itself.
//!
//! Queries come in two flavours. The persisted variants consult only the
//! [`AttributeStore`]; the `_local` variants additionally consult a
//! [`LocalOverlay`] built from pairs still being edited.

pub mod local;
pub mod store;

pub use local::LocalOverlay;
pub use store::{
    AttributeNode, AttributeStore, InMemoryAttributeStore, JsonFileAttributeStore, MappingEdge,
};

use crate::error::Result;
use crate::expression::ast::render_path;
use crate::expression::{
    classify, invert, parse_expression, referenced_paths, substitute_paths, Expr,
};
use crate::types::{split_key_chain, MappingPair};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, instrument, warn};

/// Knowledge graph of attribute transformations over a store
#[derive(Debug, Clone)]
pub struct AttributeGraph<S> {
    store: S,
}

impl<S: AttributeStore> AttributeGraph<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch a node, creating a singleton one first when `upsert` is set
    pub async fn get_node(&self, id: &str, upsert: bool) -> Result<Option<AttributeNode>> {
        if let Some(node) = self.store.get(id).await? {
            return Ok(Some(node));
        }
        if !upsert {
            return Ok(None);
        }
        let node = AttributeNode::singleton(id);
        self.store.upsert(id, node.clone()).await?;
        Ok(Some(node))
    }

    /// Record a transformation and its inverse between two attributes
    ///
    /// Transformations outside the invertible subset, or that do not read
    /// exactly `source_id`, are skipped with a warning. Edge writes are
    /// issued one after another; a failure part way leaves the earlier
    /// writes in place.
    #[instrument(skip(self), level = "debug")]
    pub async fn add_mapping(
        &self,
        source_id: &str,
        target_id: &str,
        transformation: &str,
    ) -> Result<()> {
        let expr = match parse_expression(transformation) {
            Ok(expr) => expr,
            Err(err) => {
                warn!(%source_id, %target_id, error = %err, "skipping unparsable transformation");
                return Ok(());
            }
        };
        if !classify(&expr).is_invertible() {
            warn!(%source_id, %target_id, %transformation, "skipping non-invertible transformation");
            return Ok(());
        }
        if !is_learnable(&expr, &split_key_chain(source_id)) {
            warn!(%source_id, %target_id, %transformation, "transformation does not read its source");
            return Ok(());
        }
        let inverse = invert(target_id, &expr)?.to_string();

        let source = self.require_node(source_id).await?;
        let target = self.require_node(target_id).await?;

        self.store
            .append_edge(
                source_id,
                MappingEdge::new(source_id, target_id, transformation),
            )
            .await?;
        self.store
            .append_edge(target_id, MappingEdge::new(target_id, source_id, inverse))
            .await?;

        if source.component.iter().any(|id| id == target_id) {
            info!(%source_id, %target_id, "attributes already connected");
            return Ok(());
        }

        self.union_components(&source.component, &target.component)
            .await
    }

    async fn require_node(&self, id: &str) -> Result<AttributeNode> {
        self.get_node(id, true)
            .await?
            .ok_or_else(|| crate::Error::store(format!("attribute {} could not be created", id)))
    }

    /// Every member of each side learns every member of the other side
    async fn union_components(&self, a: &[String], b: &[String]) -> Result<()> {
        for id in a {
            self.store.extend_component(id, b).await?;
        }
        for id in b {
            self.store.extend_component(id, a).await?;
        }
        debug!(left = a.len(), right = b.len(), "merged components");
        Ok(())
    }

    /// Persisted component of an attribute; `None` when the node is unknown
    pub async fn get_component(&self, id: &str) -> Result<Option<Vec<String>>> {
        Ok(self.get_node(id, false).await?.map(|node| node.component))
    }

    /// Component of an attribute across persisted and in-flight pairs
    ///
    /// The local component is extended with the persisted component of
    /// each of its members (one hop), then deduplicated.
    pub async fn get_component_local(
        &self,
        id: &str,
        pairs: &[MappingPair],
    ) -> Result<Vec<String>> {
        let overlay = LocalOverlay::build(pairs);
        let local = overlay
            .component(id)
            .map(<[String]>::to_vec)
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut push = |candidate: String| {
            if seen.insert(candidate.clone()) {
                result.push(candidate);
            }
        };

        for member in self.get_component(id).await?.unwrap_or_default() {
            push(member);
        }
        for member in &local {
            push(member.clone());
            for persisted in self.get_component(member).await?.unwrap_or_default() {
                push(persisted);
            }
        }

        Ok(result)
    }

    /// Composed transformation from `source_id` to `target_id`
    ///
    /// Returns an empty string when the ids are equal or no path exists.
    pub async fn get_mapping(&self, source_id: &str, target_id: &str) -> Result<String> {
        let path = self.shortest_path(source_id, target_id, None).await?;
        Ok(join_transformations(&path))
    }

    /// Like [`get_mapping`](Self::get_mapping), also walking in-flight pairs
    pub async fn get_mapping_local(
        &self,
        source_id: &str,
        target_id: &str,
        pairs: &[MappingPair],
    ) -> Result<String> {
        let overlay = LocalOverlay::build(pairs);
        let path = self
            .shortest_path(source_id, target_id, Some(&overlay))
            .await?;
        Ok(join_transformations(&path))
    }

    /// Breadth-first search for the fewest-edge path between attributes
    ///
    /// Local edges are explored before persisted ones. Each node is
    /// expanded once; an empty path means no path (or identical ids).
    pub async fn shortest_path(
        &self,
        source_id: &str,
        target_id: &str,
        overlay: Option<&LocalOverlay>,
    ) -> Result<Vec<MappingEdge>> {
        if source_id == target_id {
            return Ok(Vec::new());
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<Vec<MappingEdge>> = VecDeque::new();
        queue.push_back(vec![MappingEdge::new("", source_id, "")]);

        while let Some(path) = queue.pop_front() {
            let current = match path.last() {
                Some(edge) => edge.target.clone(),
                None => continue,
            };
            if !visited.insert(current.clone()) {
                continue;
            }

            let mut edges: Vec<MappingEdge> = overlay
                .map(|overlay| overlay.edges(&current).to_vec())
                .unwrap_or_default();
            if let Some(node) = self.store.get(&current).await? {
                edges.extend(node.edges);
            }

            for edge in edges {
                if visited.contains(&edge.target) {
                    continue;
                }
                let reached = edge.target == target_id;
                let mut next = path.clone();
                next.push(edge);
                if reached {
                    // drop the seed edge
                    let found = next.split_off(1);
                    debug!(%source_id, %target_id, hops = found.len(), "found attribute path");
                    return Ok(found);
                }
                queue.push_back(next);
            }
        }

        Ok(Vec::new())
    }
}

/// True when `expr` is invertible and reads exactly the `source` path
pub(crate) fn is_learnable(expr: &Expr, source: &[String]) -> bool {
    classify(expr).is_invertible() && referenced_paths(expr) == vec![source.to_vec()]
}

/// Compose a path of edges into one expression
///
/// Each step substitutes the running expression for every path node in the
/// edge's transformation that reads the edge's source attribute. Stored
/// transformations that no longer parse fall back to whole-token text
/// replacement of the source id, raw or quoted.
pub fn join_transformations(edges: &[MappingEdge]) -> String {
    let mut edges = edges.iter();
    let first = match edges.next() {
        Some(edge) => edge.transformation.clone(),
        None => return String::new(),
    };

    edges.fold(first, |previous, edge| {
        substitute_source(&edge.transformation, &edge.source, &previous)
    })
}

fn substitute_source(transformation: &str, source_id: &str, previous: &str) -> String {
    let source = split_key_chain(source_id);
    match (parse_expression(transformation), parse_expression(previous)) {
        (Ok(expr), Ok(replacement)) => {
            substitute_paths(&expr, &mut |chain| {
                (chain == &source).then(|| replacement.clone())
            })
            .to_string()
        }
        _ => {
            debug!(%source_id, %transformation, "joining by text");
            let grouped = format!("({})", previous);
            let quoted = render_path(&source);
            let text = replace_attribute_token(transformation, &quoted, &grouped);
            if quoted == source_id {
                text
            } else {
                replace_attribute_token(&text, source_id, &grouped)
            }
        }
    }
}

fn is_token_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.' || ch == '`' || ch == '$'
}

/// Replace occurrences of `id` not embedded in a longer name or path
fn replace_attribute_token(haystack: &str, id: &str, replacement: &str) -> String {
    if id.is_empty() {
        return haystack.to_string();
    }
    let pattern = match regex::Regex::new(&regex::escape(id)) {
        Ok(pattern) => pattern,
        Err(_) => return haystack.to_string(),
    };

    let mut result = String::with_capacity(haystack.len());
    let mut last = 0;
    for found in pattern.find_iter(haystack) {
        let before = haystack[..found.start()].chars().next_back();
        let after = haystack[found.end()..].chars().next();
        let standalone = !before.map(is_token_char).unwrap_or(false)
            && !after.map(is_token_char).unwrap_or(false);
        if standalone {
            result.push_str(&haystack[last..found.start()]);
            result.push_str(replacement);
            last = found.end();
        }
    }
    result.push_str(&haystack[last..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::evaluate;
    use crate::types::{key_chain, CreationType};
    use serde_json::json;

    fn graph() -> AttributeGraph<InMemoryAttributeStore> {
        AttributeGraph::new(InMemoryAttributeStore::new())
    }

    #[tokio::test]
    async fn test_add_mapping_records_both_directions() {
        let graph = graph();
        graph.add_mapping("a.x", "b.y", "a.x * 2").await.unwrap();

        let a = graph.get_node("a.x", false).await.unwrap().unwrap();
        let b = graph.get_node("b.y", false).await.unwrap().unwrap();
        assert_eq!(a.edges, vec![MappingEdge::new("a.x", "b.y", "a.x * 2")]);
        assert_eq!(b.edges, vec![MappingEdge::new("b.y", "a.x", "(b.y / 2)")]);
        assert_eq!(a.component, vec!["a.x".to_string(), "b.y".to_string()]);
        assert_eq!(b.component, vec!["b.y".to_string(), "a.x".to_string()]);
    }

    #[tokio::test]
    async fn test_non_invertible_mapping_is_ignored() {
        let graph = graph();
        graph.add_mapping("a.x", "b.y", "a.x & 'k'").await.unwrap();
        graph.add_mapping("a.x", "b.y", "c.z * 2").await.unwrap();
        graph.add_mapping("a.x", "b.y", "a.x +").await.unwrap();
        assert!(graph.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_components_are_shared_after_chaining() {
        let graph = graph();
        graph.add_mapping("a.x", "b.y", "a.x + 1").await.unwrap();
        graph.add_mapping("c.z", "d.w", "c.z").await.unwrap();
        graph.add_mapping("b.y", "c.z", "b.y * 3").await.unwrap();

        for id in ["a.x", "b.y", "c.z", "d.w"] {
            let mut component = graph.get_component(id).await.unwrap().unwrap();
            component.sort();
            assert_eq!(component, vec!["a.x", "b.y", "c.z", "d.w"], "component of {id}");
        }
    }

    #[tokio::test]
    async fn test_get_mapping_composes_path() {
        let graph = graph();
        graph.add_mapping("a.x", "b.y", "a.x * 2").await.unwrap();
        graph.add_mapping("b.y", "c.z", "b.y + 3").await.unwrap();

        let forward = graph.get_mapping("a.x", "c.z").await.unwrap();
        assert_eq!(forward, "((a.x * 2) + 3)");
        let value = evaluate(
            &parse_expression(&forward).unwrap(),
            &json!({"a": {"x": 5}}),
        )
        .unwrap();
        assert_eq!(value, Some(json!(13)));

        let backward = graph.get_mapping("c.z", "a.x").await.unwrap();
        let value = evaluate(
            &parse_expression(&backward).unwrap(),
            &json!({"c": {"z": 13}}),
        )
        .unwrap();
        assert_eq!(value, Some(json!(5)));
    }

    #[tokio::test]
    async fn test_get_mapping_without_path_is_empty() {
        let graph = graph();
        graph.add_mapping("a.x", "b.y", "a.x").await.unwrap();
        assert_eq!(graph.get_mapping("a.x", "zzz").await.unwrap(), "");
        assert_eq!(graph.get_mapping("a.x", "a.x").await.unwrap(), "");
        assert_eq!(graph.get_component("zzz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_shortest_path_prefers_fewest_edges() {
        let graph = graph();
        graph.add_mapping("a", "b", "a + 1").await.unwrap();
        graph.add_mapping("b", "c", "b + 1").await.unwrap();
        graph.add_mapping("c", "d", "c + 1").await.unwrap();
        graph.add_mapping("a", "d", "a + 3").await.unwrap();

        let path = graph.shortest_path("a", "d", None).await.unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].transformation, "a + 3");
    }

    #[tokio::test]
    async fn test_local_queries_bridge_persisted_components() {
        let graph = graph();
        graph.add_mapping("a.x", "b.y", "a.x * 2").await.unwrap();

        let pairs = vec![MappingPair::with_code(
            vec![key_chain(["b", "y"])],
            key_chain(["c", "z"]),
            "b.y - 1",
            CreationType::Manual,
        )];

        let mut component = graph.get_component_local("c.z", &pairs).await.unwrap();
        component.sort();
        assert_eq!(component, vec!["a.x", "b.y", "c.z"]);

        let mapping = graph.get_mapping_local("a.x", "c.z", &pairs).await.unwrap();
        assert_eq!(mapping, "((a.x * 2) - 1)");

        assert_eq!(graph.get_mapping("a.x", "c.z").await.unwrap(), "");
    }

    #[test]
    fn test_join_respects_token_boundaries() {
        let edges = vec![
            MappingEdge::new("a.x", "a.xy", "a.x + 1"),
            MappingEdge::new("a.xy", "t", "a.xy * a.xy.z * a.xy"),
        ];
        assert_eq!(
            join_transformations(&edges),
            "(((a.x + 1) * a.xy.z) * (a.x + 1))"
        );
        assert_eq!(join_transformations(&[]), "");
    }

    #[tokio::test]
    async fn test_join_through_quoted_attribute() {
        let graph = graph();
        graph.add_mapping("a.x", "m.k-1", "a.x * 2").await.unwrap();
        graph.add_mapping("m.k-1", "c.z", "m.`k-1` + 1").await.unwrap();

        let forward = graph.get_mapping("a.x", "c.z").await.unwrap();
        assert_eq!(forward, "((a.x * 2) + 1)");
        let value = evaluate(
            &parse_expression(&forward).unwrap(),
            &json!({"a": {"x": 5}}),
        )
        .unwrap();
        assert_eq!(value, Some(json!(11)));

        let backward = graph.get_mapping("c.z", "a.x").await.unwrap();
        let value = evaluate(
            &parse_expression(&backward).unwrap(),
            &json!({"c": {"z": 11}}),
        )
        .unwrap();
        assert_eq!(value, Some(json!(5)));
    }

    #[test]
    fn test_join_falls_back_to_text_for_unparsable_edges() {
        let edges = vec![
            MappingEdge::new("a.x", "m.k-1", "a.x * 2"),
            MappingEdge::new("m.k-1", "t", "m.`k-1` +"),
        ];
        assert_eq!(join_transformations(&edges), "(a.x * 2) +");
    }
}
