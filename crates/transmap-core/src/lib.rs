//! Transmap Core - Mapping engine for API interface transformations
//!
//! This crate provides the engine behind interface mapping: describing how
//! the request, response or message of one API operation is built from
//! those of others, learning reusable attribute transformations from past
//! mappings, and composing stored mappings into new ones.
//!
//! # Main Components
//!
//! - **Path trees**: enumerate the leaves of request, response and message shapes
//! - **Expression language**: parse, evaluate, classify and invert mapping code
//! - **Attribute graph**: knowledge graph of invertible attribute transformations
//! - **Mapping compiler**: fold mapping pairs into typed mapping trees and back
//! - **Chain resolver**: compose persisted mappings transitively
//! - **Validation**: check compiled mappings cover every required leaf
//!
//! # Example
//!
//! ```
//! use transmap_core::{AttributeGraph, InMemoryAttributeStore, Result};
//!
//! async fn example() -> Result<()> {
//!     let graph = AttributeGraph::new(InMemoryAttributeStore::new());
//!     graph.add_mapping("shop.price", "erp.cents", "shop.price * 100").await?;
//!     assert_eq!(graph.get_mapping("erp.cents", "shop.price").await?, "(erp.cents / 100)");
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod error;
pub mod execute;
pub mod expression;
pub mod graph;
pub mod mapping;
pub mod schema;
pub mod tree;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use types::{
    // Key chains and interface ids
    asyncapi_interface_id, join_key_chain, key_chain, openapi_interface_id, split_key_chain,
    KeyChain,

    // Mapping enums and pairs
    CreationType, MappingDirection, MappingPair, MappingType,
};

pub use tree::{leaf_key_chains, to_tree, PathTreeNode};

pub use expression::{
    classify, invert, parse_expression, stringify, DefaultEngine, Expr, ExpressionEngine,
    ExpressionError,
};

pub use graph::{
    AttributeGraph, AttributeNode, AttributeStore, InMemoryAttributeStore,
    JsonFileAttributeStore, LocalOverlay, MappingEdge,
};

pub use mapping::{
    attribute_suggestions, build_asyncapi_mapping, build_openapi_mapping, commit_pairs, compile,
    decompile, merge_pairs, same_name_pairs, AsyncApiOperation, Endpoints, InMemoryMappingStore,
    JsonFileMappingStore, Mapping, MappingBody, MappingLeaf, MappingStore, MappingTree, MergeKey,
};

pub use chain::{compose_chain, find_chain, TransitiveChainResolver};
pub use execute::{execute_mapping, resolve_topic};
pub use schema::{schema_to_type_tree, SchemaProvider, StaticSchemaProvider};
pub use validation::{
    ensure_all_mapped, find_missing, first_unmapped, ValidationEngine, ValidationFailure,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
