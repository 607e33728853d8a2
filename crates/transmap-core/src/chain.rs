//! Transitive mapping chains
//!
//! Persisted transformation mappings form a graph over interface ids: a
//! mapping from `A` to `B` can be followed by any mapping whose source is
//! `B`. When no direct mapping exists between two interfaces, the shortest
//! chain of mappings is composed into a single `AUTO` mapping whose pairs
//! seed the editor.

use crate::error::{Error, Result};
use crate::expression::{parse_expression, substitute_paths, Expr};
use crate::mapping::{decompile, Mapping, MappingBody, MappingLeaf, MappingStore, MappingTree};
use crate::types::{join_key_chain, KeyChain, MappingDirection, MappingPair, MappingType};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, instrument, warn};

/// Shortest chain of mappings leading from `source_id` to `target_id`
///
/// Only transformation mappings are followed. A path never contains the
/// same mapping twice; different paths may share mappings. Returns an
/// empty chain when the ids are equal or no chain exists.
pub fn find_chain(source_id: &str, target_id: &str, mappings: &[Mapping]) -> Vec<Mapping> {
    if source_id == target_id {
        return Vec::new();
    }

    let candidates: Vec<usize> = mappings
        .iter()
        .enumerate()
        .filter(|(_, mapping)| mapping.mapping_type == MappingType::Transformation)
        .map(|(index, _)| index)
        .collect();

    let mut queue: VecDeque<Vec<usize>> = candidates
        .iter()
        .filter(|&&index| mappings[index].source_id == source_id)
        .map(|&index| vec![index])
        .collect();

    while let Some(path) = queue.pop_front() {
        let last = match path.last() {
            Some(&index) => &mappings[index],
            None => continue,
        };
        if last.targets(target_id) {
            debug!(%source_id, %target_id, hops = path.len(), "found mapping chain");
            return path.into_iter().map(|index| mappings[index].clone()).collect();
        }

        for &next in &candidates {
            if path.contains(&next) || !last.targets(&mappings[next].source_id) {
                continue;
            }
            let mut extended = path.clone();
            extended.push(next);
            queue.push_back(extended);
        }
    }

    Vec::new()
}

/// Expression form of every leaf in `tree`, keyed by key chain
fn leaf_expressions(tree: &MappingTree) -> HashMap<KeyChain, Expr> {
    tree.flatten()
        .into_iter()
        .filter_map(|(chain, leaf)| match parse_expression(&leaf.to_expression_source()) {
            Ok(expr) => Some((chain, expr)),
            Err(err) => {
                warn!(leaf = %join_key_chain(&chain), error = %err, "leaf cannot be composed");
                None
            }
        })
        .collect()
}

/// Feed the leaves of `input` into the code of `next`
///
/// Each path in `next` naming a leaf of `input` is replaced by that leaf's
/// expression. Code without any resolvable path is kept as written.
fn compose_trees(input: &MappingTree, next: &MappingTree) -> Result<MappingTree> {
    let available = leaf_expressions(input);

    next.try_map_leaves(&mut |chain, leaf| {
        let code = match leaf {
            MappingLeaf::Code(code) => code,
            MappingLeaf::Literal(_) => return Ok(leaf.clone()),
        };
        let expr = match parse_expression(code) {
            Ok(expr) => expr,
            Err(err) => {
                warn!(leaf = %join_key_chain(chain), error = %err, "keeping unparsable code");
                return Ok(leaf.clone());
            }
        };

        let mut resolved = 0usize;
        let composed = substitute_paths(&expr, &mut |path: &KeyChain| {
            let replacement = available.get(path).cloned();
            if replacement.is_some() {
                resolved += 1;
            } else {
                warn!(
                    leaf = %join_key_chain(chain),
                    path = %join_key_chain(path),
                    "unresolved path in chain"
                );
            }
            replacement
        });

        if resolved == 0 {
            Ok(leaf.clone())
        } else {
            Ok(MappingLeaf::Code(composed.to_string()))
        }
    })
}

/// Compose a chain of OpenAPI mappings into one `AUTO` mapping
///
/// Requests flow front to back starting from the first mapping's request
/// tree; responses flow back to front starting from the last mapping's
/// response tree.
pub fn compose_chain(chain: &[Mapping]) -> Result<Mapping> {
    let (first, rest) = chain
        .split_first()
        .ok_or_else(|| Error::validation("chain", "cannot compose an empty chain"))?;
    let (last, init) = chain
        .split_last()
        .ok_or_else(|| Error::validation("chain", "cannot compose an empty chain"))?;

    let mut request = first.openapi_trees()?.0.clone();
    for mapping in rest {
        request = compose_trees(&request, mapping.openapi_trees()?.0)?;
    }

    let mut response = last.openapi_trees()?.1.clone();
    for mapping in init.iter().rev() {
        response = compose_trees(&response, mapping.openapi_trees()?.1)?;
    }

    Ok(Mapping {
        id: None,
        created_by: None,
        mapping_type: MappingType::Auto,
        source_id: first.source_id.clone(),
        target_ids: last.target_ids.clone(),
        body: MappingBody::OpenApi {
            request_mapping: request,
            response_mapping: response,
        },
    })
}

/// Resolves transitive mappings from a [`MappingStore`]
#[derive(Debug, Clone)]
pub struct TransitiveChainResolver<M> {
    store: M,
}

impl<M: MappingStore> TransitiveChainResolver<M> {
    pub fn new(store: M) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &M {
        &self.store
    }

    /// Shortest chain between two interfaces over persisted transformations
    pub async fn find(&self, source_id: &str, target_id: &str) -> Result<Vec<Mapping>> {
        let mappings = self.store.list(Some(MappingType::Transformation)).await?;
        Ok(find_chain(source_id, target_id, &mappings))
    }

    /// Composed mapping between two interfaces, if a chain exists
    #[instrument(skip(self))]
    pub async fn resolve(&self, source_id: &str, target_id: &str) -> Result<Option<Mapping>> {
        let chain = self.find(source_id, target_id).await?;
        if chain.is_empty() {
            debug!("no mapping chain");
            return Ok(None);
        }
        let composed = compose_chain(&chain)?;
        info!(hops = chain.len(), "composed mapping chain");
        Ok(Some(composed))
    }

    /// Request and response pairs suggested by chains to each target
    ///
    /// Targets without a chain contribute nothing.
    pub async fn suggest_openapi_pairs(
        &self,
        source_id: &str,
        target_ids: &[String],
    ) -> Result<(Vec<MappingPair>, Vec<MappingPair>)> {
        let mut request = Vec::new();
        let mut response = Vec::new();

        for target_id in target_ids {
            if let Some(mapping) = self.resolve(source_id, target_id).await? {
                let (request_tree, response_tree) = mapping.openapi_trees()?;
                request.extend(
                    decompile(request_tree, MappingDirection::Input)
                        .into_iter()
                        .filter(|pair| pair.required.first() == Some(target_id)),
                );
                response.extend(decompile(response_tree, MappingDirection::Output));
            }
        }

        Ok((request, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{DefaultEngine, ExpressionEngine};
    use crate::mapping::{build_openapi_mapping, InMemoryMappingStore};
    use crate::types::{key_chain, CreationType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pair(provided: &str, required: &str, code: &str) -> MappingPair {
        MappingPair::with_code(
            vec![key_chain(provided.split('.'))],
            key_chain(required.split('.')),
            code,
            CreationType::Manual,
        )
    }

    fn mapping(source: &str, target: &str, kind: MappingType) -> Mapping {
        let mut mapping = build_openapi_mapping(
            source,
            &[target.to_string()],
            &[pair(
                &format!("{}.body.v", source),
                &format!("{}.body.v", target),
                &format!("{}.body.v * 2", source),
            )],
            &[pair(
                &format!("{}.body.r", target),
                &format!("{}.body.r", source),
                &format!("{}.body.r + 1", target),
            )],
            kind,
            None,
        )
        .unwrap();
        mapping.id = Some(format!("{}->{}", source, target));
        mapping
    }

    fn ids(chain: &[Mapping]) -> Vec<String> {
        chain.iter().filter_map(|m| m.id.clone()).collect()
    }

    #[test]
    fn test_find_chain_shortest_path() {
        let mappings = vec![
            mapping("a", "b", MappingType::Transformation),
            mapping("b", "c", MappingType::Transformation),
            mapping("c", "d", MappingType::Transformation),
            mapping("b", "d", MappingType::Transformation),
        ];
        assert_eq!(ids(&find_chain("a", "c", &mappings)), vec!["a->b", "b->c"]);
        assert_eq!(ids(&find_chain("a", "d", &mappings)), vec!["a->b", "b->d"]);
        assert!(find_chain("a", "a", &mappings).is_empty());
        assert!(find_chain("a", "z", &mappings).is_empty());
    }

    #[test]
    fn test_find_chain_ignores_other_types_and_cycles() {
        let mappings = vec![
            mapping("a", "b", MappingType::Transformation),
            mapping("b", "a", MappingType::Transformation),
            mapping("b", "c", MappingType::Auto),
        ];
        assert!(find_chain("a", "c", &mappings).is_empty());
    }

    #[test]
    fn test_compose_chain_substitutes_leaves() {
        let chain = vec![
            mapping("a", "b", MappingType::Transformation),
            mapping("b", "c", MappingType::Transformation),
        ];
        let composed = compose_chain(&chain).unwrap();
        assert_eq!(composed.mapping_type, MappingType::Auto);
        assert_eq!(composed.source_id, "a");
        assert_eq!(composed.target_ids, vec!["c".to_string()]);

        let (request, response) = composed.openapi_trees().unwrap();
        assert_eq!(request.to_json(), json!({"c": {"body": {"v": "((a.body.v * 2) * 2)"}}}));
        assert_eq!(response.to_json(), json!({"a": {"body": {"r": "((c.body.r + 1) + 1)"}}}));

        let value = DefaultEngine
            .evaluate_source("((a.body.v * 2) * 2)", &json!({"a": {"body": {"v": 3}}}))
            .unwrap();
        assert_eq!(value, Some(json!(12)));
    }

    #[test]
    fn test_compose_chain_keeps_unresolved_code() {
        let first = mapping("a", "b", MappingType::Transformation);
        let second = build_openapi_mapping(
            "b",
            &["c".to_string()],
            &[
                pair("b.body.v", "c.body.v", "b.body.v"),
                pair("b.body.w", "c.body.w", "$uppercase(b.body.w)"),
            ],
            &[],
            MappingType::Transformation,
            None,
        )
        .unwrap();

        let composed = compose_chain(&[first, second]).unwrap();
        let (request, _) = composed.openapi_trees().unwrap();
        assert_eq!(
            request.leaf(&key_chain(["c", "body", "v"])),
            Some(&MappingLeaf::Code("(a.body.v * 2)".to_string()))
        );
        assert_eq!(
            request.leaf(&key_chain(["c", "body", "w"])),
            Some(&MappingLeaf::Code("$uppercase(b.body.w)".to_string()))
        );
        assert!(compose_chain(&[]).is_err());
    }

    #[tokio::test]
    async fn test_resolver_suggests_pairs_from_store() {
        let store = InMemoryMappingStore::new();
        store.create(mapping("a", "b", MappingType::Transformation)).await.unwrap();
        store.create(mapping("b", "c", MappingType::Transformation)).await.unwrap();
        let resolver = TransitiveChainResolver::new(store);

        assert!(resolver.resolve("a", "z").await.unwrap().is_none());

        let (request, response) = resolver
            .suggest_openapi_pairs("a", &["c".to_string()])
            .await
            .unwrap();
        assert_eq!(request.len(), 1);
        assert_eq!(request[0].provided, vec![key_chain(["a", "body", "v"])]);
        assert_eq!(request[0].required, key_chain(["c", "body", "v"]));
        assert_eq!(response[0].provided, vec![key_chain(["c", "body", "r"])]);
    }
}
