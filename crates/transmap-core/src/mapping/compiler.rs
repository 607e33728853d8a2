//! Folding mapping pairs into compiled trees and back
//!
//! Pairs are keyed by their required leaf in both directions: for an input
//! mapping that is a leaf of the target request, for an output mapping a
//! leaf of the source response. The direction therefore never changes the
//! shape of the tree; it is carried for logging and validation.

use super::tree::{MappingLeaf, MappingTree};
use crate::error::Result;
use crate::expression::{key_reference, parse_expression, referenced_paths};
use crate::types::{join_key_chain, CreationType, MappingDirection, MappingPair};
use tracing::{debug, warn};

/// Compile mapping pairs into a nested mapping tree
///
/// A pair whose code is exactly the reference to its single provided leaf
/// compiles to that reference; any other code is kept verbatim. Two pairs
/// with the same required leaf resolve last-write-wins.
pub fn compile(pairs: &[MappingPair], direction: MappingDirection) -> Result<MappingTree> {
    let mut tree = MappingTree::new();

    for pair in pairs {
        let code = match pair.single_provided() {
            Some(provided)
                if pair.mapping_code == key_reference(provided)
                    || pair.mapping_code == join_key_chain(provided) =>
            {
                key_reference(provided)
            }
            _ => pair.mapping_code.clone(),
        };
        tree.insert(&pair.required, MappingLeaf::Code(code))?;
    }

    debug!(%direction, pairs = pairs.len(), leaves = tree.leaf_count(), "compiled mapping");
    Ok(tree)
}

/// Expand a compiled mapping tree back into mapping pairs
///
/// The provided leaves of each pair are the paths its code references.
/// Literal leaves and code that does not parse yield pairs without
/// provided leaves.
pub fn decompile(tree: &MappingTree, direction: MappingDirection) -> Vec<MappingPair> {
    let pairs: Vec<MappingPair> = tree
        .flatten()
        .into_iter()
        .map(|(required, leaf)| {
            let mapping_code = leaf.to_expression_source();
            let provided = match leaf {
                MappingLeaf::Literal(_) => Vec::new(),
                MappingLeaf::Code(code) => match parse_expression(code) {
                    Ok(expr) => referenced_paths(&expr),
                    Err(err) => {
                        if !code.trim().is_empty() {
                            warn!(required = %join_key_chain(&required), error = %err, "mapping code does not parse");
                        }
                        Vec::new()
                    }
                },
            };
            MappingPair::with_code(provided, required, mapping_code, CreationType::Manual)
        })
        .collect();

    debug!(%direction, pairs = pairs.len(), "decompiled mapping");
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::key_chain;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn pair(provided: &[&str], required: &str, code: &str) -> MappingPair {
        MappingPair::with_code(
            provided
                .iter()
                .map(|p| key_chain(p.split('.')))
                .collect(),
            key_chain(required.split('.')),
            code,
            CreationType::Manual,
        )
    }

    #[test]
    fn test_compile_nests_by_required_leaf() {
        let pairs = vec![
            pair(&["src_op_200.id"], "tgt_op.parameters.petId", "src_op_200.id"),
            pair(
                &["src_op_200.first", "src_op_200.last"],
                "tgt_op.body.name",
                "src_op_200.first & ' ' & src_op_200.last",
            ),
        ];
        let tree = compile(&pairs, MappingDirection::Input).unwrap();
        assert_eq!(
            tree.to_json(),
            json!({
                "tgt_op": {
                    "body": {"name": "src_op_200.first & ' ' & src_op_200.last"},
                    "parameters": {"petId": "src_op_200.id"}
                }
            })
        );
    }

    #[test]
    fn test_decompile_recovers_provided_leaves() {
        let tree = MappingTree::from_json(&json!({
            "t": {"total": "s.qty * s.price", "unit": "\"EUR\"", "count": 2}
        }));
        let pairs = decompile(&tree, MappingDirection::Input);

        let total = pairs.iter().find(|p| p.required == key_chain(["t", "total"])).unwrap();
        assert_eq!(total.provided, vec![key_chain(["s", "qty"]), key_chain(["s", "price"])]);

        let unit = pairs.iter().find(|p| p.required == key_chain(["t", "unit"])).unwrap();
        assert!(unit.provided.is_empty());
        assert_eq!(unit.mapping_code, "\"EUR\"");

        let count = pairs.iter().find(|p| p.required == key_chain(["t", "count"])).unwrap();
        assert_eq!(count.mapping_code, "2");
    }

    #[test]
    fn test_compile_rejects_prefix_collisions() {
        let pairs = vec![pair(&["s.a"], "t.a", "s.a"), pair(&["s.b"], "t.a.b", "s.b")];
        assert!(compile(&pairs, MappingDirection::Output).is_err());
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,5}".prop_filter("reserved", |s| {
            !crate::expression::ast::is_reserved_word(s)
        })
    }

    fn pairs_strategy() -> impl Strategy<Value = Vec<MappingPair>> {
        prop::collection::btree_map(
            (segment(), segment()),
            (prop::collection::vec(segment(), 1..3), 0u8..3),
            1..8,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|((outer, inner), (sources, shape))| {
                    let required = key_chain(["target", outer.as_str(), "leaf", inner.as_str()]);
                    let provided: Vec<_> = sources
                        .iter()
                        .map(|s| key_chain(["source", s.as_str()]))
                        .collect::<BTreeSet<_>>()
                        .into_iter()
                        .collect();
                    let refs: Vec<String> = provided.iter().map(|p| key_reference(p)).collect();
                    let code = match shape {
                        0 => refs.join(" & "),
                        1 => refs.join(" + "),
                        _ => format!("$string({})", refs.join(" & ")),
                    };
                    MappingPair::with_code(provided, required, code, CreationType::Manual)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_compile_decompile_round_trip(pairs in pairs_strategy()) {
            let tree = compile(&pairs, MappingDirection::Input).unwrap();
            let restored = decompile(&tree, MappingDirection::Input);

            let canonical = |pairs: &[MappingPair]| {
                pairs
                    .iter()
                    .map(|p| (p.required.clone(), p.provided.clone(), p.mapping_code.clone()))
                    .collect::<BTreeSet<_>>()
            };
            prop_assert_eq!(canonical(&pairs), canonical(&restored));
        }
    }
}
