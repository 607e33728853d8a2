//! Shared utilities for command handlers

use crate::cli::StoreArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;
use transmap_core::{
    AttributeGraph, JsonFileAttributeStore, JsonFileMappingStore, MappingPair,
    StaticSchemaProvider,
};

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s == "yaml" || s == "yml")
        .unwrap_or(false)
}

/// Read a JSON or YAML document, picking the format by extension
pub fn read_document(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = content.len(), "read document");

    if is_yaml(path) {
        serde_yaml::from_str(&content).map_err(|e| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: format!("YAML ({})", e),
        })
    } else {
        serde_json::from_str(&content).map_err(|e| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: format!("JSON ({})", e),
        })
    }
}

/// Read a document and deserialize it as `what`
pub fn read_as<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let document = read_document(path)?;
    serde_json::from_value(document).map_err(|e| Error::InvalidFormat {
        path: path.to_path_buf(),
        expected: format!("{} ({})", what, e),
    })
}

/// Read in-flight mapping pairs, none when no file is given
pub fn read_pairs(path: Option<&Path>) -> Result<Vec<MappingPair>> {
    match path {
        Some(path) => read_as(path, "a list of mapping pairs"),
        None => Ok(Vec::new()),
    }
}

/// Read type trees by interface id
pub fn load_schemas(path: &Path) -> Result<StaticSchemaProvider> {
    read_as(path, "type trees by interface id")
}

/// Open the attribute graph, honoring a command-line override
pub async fn open_graph(
    config: &Config,
    stores: &StoreArgs,
) -> Result<AttributeGraph<JsonFileAttributeStore>> {
    let path = stores.graph.as_ref().unwrap_or(&config.stores.graph);
    debug!(path = %path.display(), "opening attribute graph");
    let store = JsonFileAttributeStore::open(path).await?;
    Ok(AttributeGraph::new(store))
}

/// Open the mapping store, honoring a command-line override
pub async fn open_mappings(config: &Config, stores: &StoreArgs) -> Result<JsonFileMappingStore> {
    let path = stores.mappings.as_ref().unwrap_or(&config.stores.mappings);
    debug!(path = %path.display(), "opening mapping store");
    Ok(JsonFileMappingStore::open(path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_read_document_by_extension() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("doc.json");
        let yaml = dir.path().join("doc.yaml");
        fs::write(&json, r#"{"a": {"b": 1}}"#).unwrap();
        fs::write(&yaml, "a:\n  b: 1\n").unwrap();

        assert_eq!(read_document(&json).unwrap(), read_document(&yaml).unwrap());
    }

    #[test]
    fn test_read_document_errors() {
        let missing = PathBuf::from("/nonexistent/doc.json");
        assert!(matches!(
            read_document(&missing),
            Err(Error::FileNotFound { .. })
        ));

        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert!(matches!(
            read_document(&broken),
            Err(Error::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_read_pairs_and_schemas() {
        let dir = TempDir::new().unwrap();
        let pairs = dir.path().join("pairs.json");
        fs::write(
            &pairs,
            r#"[{"provided": [["a", "x"]], "required": ["b", "y"], "mappingCode": "a.x", "creationType": "MANUAL"}]"#,
        )
        .unwrap();
        assert_eq!(read_pairs(Some(pairs.as_path())).unwrap().len(), 1);
        assert!(read_pairs(None).unwrap().is_empty());

        let schemas = dir.path().join("schemas.yaml");
        fs::write(&schemas, "response:\n  a_op_200:\n    body:\n      id: integer\n").unwrap();
        let provider = load_schemas(&schemas).unwrap();
        assert!(provider.response.contains_key("a_op_200"));
        assert!(provider.request.is_empty());

        assert!(matches!(
            read_pairs(Some(schemas.as_path())),
            Err(Error::InvalidFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_overrides_take_precedence() {
        let dir = TempDir::new().unwrap();
        let stores = StoreArgs {
            graph: Some(dir.path().join("graph.json")),
            mappings: Some(dir.path().join("maps.json")),
        };
        let graph = open_graph(&Config::default(), &stores).await.unwrap();
        assert_eq!(graph.store().path(), dir.path().join("graph.json"));
        let mappings = open_mappings(&Config::default(), &stores).await.unwrap();
        assert_eq!(mappings.path(), dir.path().join("maps.json"));
    }
}
