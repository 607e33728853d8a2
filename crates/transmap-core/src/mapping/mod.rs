//! Mapping pairs, compiled mappings and their persistence

pub mod compiler;
pub mod model;
pub mod store;
pub mod suggest;
pub mod tree;

pub use compiler::{compile, decompile};
pub use model::{
    build_asyncapi_mapping, build_openapi_mapping, AsyncApiOperation, Endpoints, Mapping,
    MappingBody,
};
pub use store::{InMemoryMappingStore, JsonFileMappingStore, MappingStore};
pub use suggest::{
    attribute_suggestions, commit_pairs, merge_pairs, same_name_pairs, MergeKey,
};
pub use tree::{MappingLeaf, MappingTree};
