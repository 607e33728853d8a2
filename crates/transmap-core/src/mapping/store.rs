//! Persistence for compiled mappings

use super::model::Mapping;
use crate::error::{Error, Result};
use crate::types::MappingType;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Storage backend for mappings
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Persist a new mapping and return its assigned id
    async fn create(&self, mapping: Mapping) -> Result<String>;

    /// Replace an existing mapping; the mapping must carry its id
    async fn update(&self, mapping: Mapping) -> Result<()>;

    /// Fetch a mapping by id
    async fn get(&self, id: &str) -> Result<Option<Mapping>>;

    /// List mappings, optionally restricted to one mapping type
    async fn list(&self, filter: Option<MappingType>) -> Result<Vec<Mapping>>;
}

fn assign_id(mut mapping: Mapping) -> (String, Mapping) {
    let id = mapping
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    mapping.id = Some(id.clone());
    (id, mapping)
}

fn require_id(mapping: &Mapping) -> Result<String> {
    mapping
        .id
        .clone()
        .ok_or_else(|| Error::validation("id", "cannot update a mapping without an id"))
}

fn filtered(mappings: &BTreeMap<String, Mapping>, filter: Option<MappingType>) -> Vec<Mapping> {
    mappings
        .values()
        .filter(|mapping| filter.map_or(true, |kind| mapping.mapping_type == kind))
        .cloned()
        .collect()
}

/// Mapping store held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingStore {
    mappings: Arc<RwLock<BTreeMap<String, Mapping>>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn create(&self, mapping: Mapping) -> Result<String> {
        let (id, mapping) = assign_id(mapping);
        self.mappings.write().await.insert(id.clone(), mapping);
        Ok(id)
    }

    async fn update(&self, mapping: Mapping) -> Result<()> {
        let id = require_id(&mapping)?;
        let mut mappings = self.mappings.write().await;
        if !mappings.contains_key(&id) {
            return Err(Error::store(format!("mapping {} does not exist", id)));
        }
        mappings.insert(id, mapping);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Mapping>> {
        Ok(self.mappings.read().await.get(id).cloned())
    }

    async fn list(&self, filter: Option<MappingType>) -> Result<Vec<Mapping>> {
        Ok(filtered(&*self.mappings.read().await, filter))
    }
}

/// Mapping store persisted as a JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonFileMappingStore {
    path: PathBuf,
    mappings: Arc<RwLock<BTreeMap<String, Mapping>>>,
}

impl JsonFileMappingStore {
    /// Open the store at `path`, starting empty when the file is missing
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let documents: Vec<Mapping> = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let mut mappings = BTreeMap::new();
        for (index, mapping) in documents.into_iter().enumerate() {
            let id = mapping.id.clone().ok_or_else(|| Error::MalformedMapping {
                id: format!("#{}", index),
                message: "stored mapping has no id".to_string(),
            })?;
            mappings.insert(id, mapping);
        }
        debug!(path = %path.display(), mappings = mappings.len(), "opened mapping store");

        Ok(Self {
            path,
            mappings: Arc::new(RwLock::new(mappings)),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, mappings: &BTreeMap<String, Mapping>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let documents: Vec<&Mapping> = mappings.values().collect();
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&documents)?).await?;
        Ok(())
    }
}

#[async_trait]
impl MappingStore for JsonFileMappingStore {
    async fn create(&self, mapping: Mapping) -> Result<String> {
        let (id, mapping) = assign_id(mapping);
        let mut mappings = self.mappings.write().await;
        let mut updated = mappings.clone();
        updated.insert(id.clone(), mapping);
        self.flush(&updated).await?;
        *mappings = updated;
        info!(%id, path = %self.path.display(), "stored mapping");
        Ok(id)
    }

    async fn update(&self, mapping: Mapping) -> Result<()> {
        let id = require_id(&mapping)?;
        let mut mappings = self.mappings.write().await;
        if !mappings.contains_key(&id) {
            return Err(Error::store(format!("mapping {} does not exist", id)));
        }
        let mut updated = mappings.clone();
        updated.insert(id, mapping);
        self.flush(&updated).await?;
        *mappings = updated;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Mapping>> {
        Ok(self.mappings.read().await.get(id).cloned())
    }

    async fn list(&self, filter: Option<MappingType>) -> Result<Vec<Mapping>> {
        Ok(filtered(&*self.mappings.read().await, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::build_openapi_mapping;
    use tempfile::TempDir;

    fn mapping(source: &str, target: &str, kind: MappingType) -> Mapping {
        build_openapi_mapping(source, &[target.to_string()], &[], &[], kind, None).unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_filters_by_type() {
        let store = InMemoryMappingStore::new();
        let first = store
            .create(mapping("a_op_200", "b_op_200", MappingType::Transformation))
            .await
            .unwrap();
        store
            .create(mapping("b_op_200", "c_op_200", MappingType::Auto))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&first).is_ok());
        let transformations = store.list(Some(MappingType::Transformation)).await.unwrap();
        assert_eq!(transformations.len(), 1);
        assert_eq!(transformations[0].id.as_deref(), Some(first.as_str()));
        assert_eq!(store.list(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_requires_existing_id() {
        let store = InMemoryMappingStore::new();
        let unsaved = mapping("a_op_200", "b_op_200", MappingType::Manual);
        assert!(store.update(unsaved.clone()).await.is_err());

        let id = store.create(unsaved).await.unwrap();
        let mut saved = store.get(&id).await.unwrap().unwrap();
        saved.created_by = Some("reviewer".to_string());
        store.update(saved).await.unwrap();
        assert_eq!(
            store.get(&id).await.unwrap().unwrap().created_by.as_deref(),
            Some("reviewer")
        );
    }

    #[tokio::test]
    async fn test_json_file_store_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mappings.json");

        let store = JsonFileMappingStore::open(&path).await.unwrap();
        let id = store
            .create(mapping("a_op_200", "b_op_200", MappingType::Transformation))
            .await
            .unwrap();

        let reopened = JsonFileMappingStore::open(&path).await.unwrap();
        let loaded = reopened.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.source_id, "a_op_200");
        assert_eq!(loaded.target_ids, vec!["b_op_200".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_previous_mappings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mappings.json");
        let store = JsonFileMappingStore::open(&path).await.unwrap();
        let id = store
            .create(mapping("a_op_200", "b_op_200", MappingType::Manual))
            .await
            .unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let mut edited = store.get(&id).await.unwrap().unwrap();
        edited.created_by = Some("reviewer".to_string());
        assert!(store.update(edited).await.is_err());
        assert_eq!(store.get(&id).await.unwrap().unwrap().created_by, None);

        let second = mapping("b_op_200", "c_op_200", MappingType::Manual);
        assert!(store.create(second).await.is_err());
        assert_eq!(store.list(None).await.unwrap().len(), 1);
    }
}
