//! Typed compiled mapping trees
//!
//! A compiled mapping mirrors the shape of the document it produces. Inner
//! nodes are objects; leaves are either expression source evaluated against
//! the input, or a literal JSON value copied as is. Keeping the distinction
//! in the type means nothing has to guess later whether a string was code.

use crate::error::{Error, Result};
use crate::types::{join_key_chain, KeyChain};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Value stored at a compiled mapping leaf
#[derive(Debug, Clone, PartialEq)]
pub enum MappingLeaf {
    /// Expression source evaluated against the input document
    Code(String),
    /// Constant JSON value
    Literal(Value),
}

impl MappingLeaf {
    /// Expression source equivalent to this leaf
    pub fn to_expression_source(&self) -> String {
        match self {
            MappingLeaf::Code(code) => code.clone(),
            MappingLeaf::Literal(value) => value.to_string(),
        }
    }
}

/// Nested object of mapping leaves
#[derive(Debug, Clone, PartialEq)]
pub enum MappingTree {
    Branch(BTreeMap<String, MappingTree>),
    Leaf(MappingLeaf),
}

impl Default for MappingTree {
    fn default() -> Self {
        MappingTree::Branch(BTreeMap::new())
    }
}

impl MappingTree {
    /// An empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// True for an object without entries
    pub fn is_empty(&self) -> bool {
        matches!(self, MappingTree::Branch(children) if children.is_empty())
    }

    /// Place a leaf at `chain`, creating intermediate objects
    ///
    /// An existing leaf at the same chain is replaced. A chain passing
    /// through an existing leaf is rejected.
    pub fn insert(&mut self, chain: &[String], leaf: MappingLeaf) -> Result<()> {
        let (last, parents) = chain
            .split_last()
            .ok_or_else(|| Error::validation("required", "key chain must not be empty"))?;

        let mut node = self;
        for (depth, segment) in parents.iter().enumerate() {
            let children = match node {
                MappingTree::Branch(children) => children,
                MappingTree::Leaf(_) => {
                    return Err(Error::validation(
                        join_key_chain(&chain[..depth]),
                        "a leaf cannot also hold nested mappings",
                    ))
                }
            };
            node = children
                .entry(segment.clone())
                .or_insert_with(MappingTree::new);
        }

        match node {
            MappingTree::Branch(children) => {
                if matches!(children.get(last), Some(MappingTree::Branch(inner)) if !inner.is_empty())
                {
                    return Err(Error::validation(
                        join_key_chain(chain),
                        "nested mappings already exist below this leaf",
                    ));
                }
                children.insert(last.clone(), MappingTree::Leaf(leaf));
                Ok(())
            }
            MappingTree::Leaf(_) => Err(Error::validation(
                join_key_chain(parents),
                "a leaf cannot also hold nested mappings",
            )),
        }
    }

    /// Subtree at `chain`
    pub fn get(&self, chain: &[String]) -> Option<&MappingTree> {
        let mut node = self;
        for segment in chain {
            node = match node {
                MappingTree::Branch(children) => children.get(segment)?,
                MappingTree::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    /// Leaf at `chain`
    pub fn leaf(&self, chain: &[String]) -> Option<&MappingLeaf> {
        match self.get(chain)? {
            MappingTree::Leaf(leaf) => Some(leaf),
            MappingTree::Branch(_) => None,
        }
    }

    /// Every leaf with its key chain, in key order
    pub fn flatten(&self) -> Vec<(KeyChain, &MappingLeaf)> {
        let mut leaves = Vec::new();
        self.collect(&mut Vec::new(), &mut leaves);
        leaves
    }

    fn collect<'a>(&'a self, prefix: &mut KeyChain, out: &mut Vec<(KeyChain, &'a MappingLeaf)>) {
        match self {
            MappingTree::Leaf(leaf) => out.push((prefix.clone(), leaf)),
            MappingTree::Branch(children) => {
                for (key, child) in children {
                    prefix.push(key.clone());
                    child.collect(prefix, out);
                    prefix.pop();
                }
            }
        }
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        match self {
            MappingTree::Leaf(_) => 1,
            MappingTree::Branch(children) => children.values().map(MappingTree::leaf_count).sum(),
        }
    }

    /// Rebuild the tree with every leaf transformed by `f`
    pub fn try_map_leaves<F>(&self, f: &mut F) -> Result<MappingTree>
    where
        F: FnMut(&[String], &MappingLeaf) -> Result<MappingLeaf>,
    {
        self.map_inner(&mut Vec::new(), f)
    }

    fn map_inner<F>(&self, prefix: &mut KeyChain, f: &mut F) -> Result<MappingTree>
    where
        F: FnMut(&[String], &MappingLeaf) -> Result<MappingLeaf>,
    {
        match self {
            MappingTree::Leaf(leaf) => Ok(MappingTree::Leaf(f(prefix, leaf)?)),
            MappingTree::Branch(children) => {
                let mut mapped = BTreeMap::new();
                for (key, child) in children {
                    prefix.push(key.clone());
                    mapped.insert(key.clone(), child.map_inner(prefix, f)?);
                    prefix.pop();
                }
                Ok(MappingTree::Branch(mapped))
            }
        }
    }

    /// JSON form: code leaves become strings, literal leaves stay values
    ///
    /// String literals are written as quoted expression source so the two
    /// leaf kinds stay distinguishable.
    pub fn to_json(&self) -> Value {
        match self {
            MappingTree::Leaf(MappingLeaf::Code(code)) => Value::String(code.clone()),
            MappingTree::Leaf(MappingLeaf::Literal(Value::String(s))) => {
                Value::String(crate::expression::Expr::String(s.clone()).to_string())
            }
            MappingTree::Leaf(MappingLeaf::Literal(value)) => value.clone(),
            MappingTree::Branch(children) => Value::Object(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Inverse of [`to_json`](Self::to_json)
    pub fn from_json(value: &Value) -> MappingTree {
        match value {
            Value::Object(map) => MappingTree::Branch(
                map.iter()
                    .map(|(key, child)| (key.clone(), MappingTree::from_json(child)))
                    .collect(),
            ),
            Value::String(code) => MappingTree::Leaf(MappingLeaf::Code(code.clone())),
            other => MappingTree::Leaf(MappingLeaf::Literal(other.clone())),
        }
    }

    /// Render as a single object-constructor expression
    pub fn to_expression_source(&self) -> String {
        match self {
            MappingTree::Leaf(leaf) => leaf.to_expression_source(),
            MappingTree::Branch(children) => {
                let entries = children
                    .iter()
                    .map(|(key, child)| {
                        format!(
                            "{}: {}",
                            Value::String(key.clone()),
                            child.to_expression_source()
                        )
                    })
                    .collect::<Vec<_>>();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }
}

impl Serialize for MappingTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MappingTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(MappingTree::from_json(&value))
    }
}

/// Serde adapter storing a tree as a JSON-encoded string field
pub mod json_string {
    use super::MappingTree;
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tree: &MappingTree, serializer: S) -> Result<S::Ok, S::Error> {
        let text = serde_json::to_string(&tree.to_json()).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MappingTree, D::Error> {
        let text = String::deserialize(deserializer)?;
        let value: serde_json::Value = serde_json::from_str(&text).map_err(D::Error::custom)?;
        Ok(MappingTree::from_json(&value))
    }
}

/// Serde adapter storing a map of trees as JSON-encoded string values
pub mod json_string_map {
    use super::MappingTree;
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        trees: &BTreeMap<String, MappingTree>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut encoded = BTreeMap::new();
        for (key, tree) in trees {
            let text = serde_json::to_string(&tree.to_json()).map_err(S::Error::custom)?;
            encoded.insert(key.as_str(), text);
        }
        serializer.collect_map(encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, MappingTree>, D::Error> {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(key, text)| {
                let value: serde_json::Value =
                    serde_json::from_str(&text).map_err(D::Error::custom)?;
                Ok::<_, D::Error>((key, MappingTree::from_json(&value)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::key_chain;
    use serde_json::json;

    fn code(source: &str) -> MappingLeaf {
        MappingLeaf::Code(source.to_string())
    }

    #[test]
    fn test_insert_builds_nested_objects() {
        let mut tree = MappingTree::new();
        tree.insert(&key_chain(["t", "body", "name"]), code("s.first & ' ' & s.last"))
            .unwrap();
        tree.insert(&key_chain(["t", "body", "age"]), code("s.age"))
            .unwrap();
        tree.insert(&key_chain(["t", "kind"]), MappingLeaf::Literal(json!(3)))
            .unwrap();

        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(
            tree.to_json(),
            json!({"t": {"body": {"age": "s.age", "name": "s.first & ' ' & s.last"}, "kind": 3}})
        );
        assert_eq!(
            tree.to_expression_source(),
            r#"{"t": {"body": {"age": s.age, "name": s.first & ' ' & s.last}, "kind": 3}}"#
        );
    }

    #[test]
    fn test_insert_conflicts_are_rejected() {
        let mut tree = MappingTree::new();
        tree.insert(&key_chain(["t", "a"]), code("x")).unwrap();
        assert!(tree.insert(&key_chain(["t", "a", "b"]), code("y")).is_err());
        assert!(tree.insert(&key_chain(["t"]), code("y")).is_err());
        assert!(tree.insert(&[], code("y")).is_err());

        // same leaf: last write wins
        tree.insert(&key_chain(["t", "a"]), code("z")).unwrap();
        assert_eq!(tree.leaf(&key_chain(["t", "a"])), Some(&code("z")));
    }

    #[test]
    fn test_string_literals_survive_json() {
        let mut tree = MappingTree::new();
        tree.insert(&key_chain(["t", "unit"]), MappingLeaf::Literal(json!("celsius")))
            .unwrap();
        let restored = MappingTree::from_json(&tree.to_json());
        assert_eq!(
            restored.leaf(&key_chain(["t", "unit"])),
            Some(&code("\"celsius\""))
        );
    }

    #[test]
    fn test_flatten_lists_leaves_in_key_order() {
        let tree = MappingTree::from_json(&json!({"b": {"y": "2"}, "a": "1"}));
        let leaves: Vec<_> = tree.flatten().into_iter().map(|(chain, _)| chain).collect();
        assert_eq!(leaves, vec![key_chain(["a"]), key_chain(["b", "y"])]);
    }

    #[test]
    fn test_json_string_adapter() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            #[serde(with = "json_string")]
            tree: MappingTree,
        }

        let holder = Holder {
            tree: MappingTree::from_json(&json!({"t": {"x": "s.x"}})),
        };
        let encoded = serde_json::to_value(&holder).unwrap();
        assert_eq!(encoded, json!({"tree": "{\"t\":{\"x\":\"s.x\"}}"}));

        let decoded: Holder = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded.tree, holder.tree);
    }
}
