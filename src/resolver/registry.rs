//! Per-collection field configuration
//!
//! Collections name their asset fields however they like. A
//! [`CollectionFieldConfig`] lists, per resource kind, which fields to look at
//! and in what order. The registry always holds a default config used when no
//! collection-specific entry matches.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::ResourceInfo;

/// Collection id of the fallback config
pub const DEFAULT_COLLECTION_ID: &str = "default";

/// Kind of displayable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "3d-model")]
    Model3d,
    #[serde(rename = "2d-image")]
    Image2d,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model3d => "3d-model",
            Self::Image2d => "2d-image",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered field names for each resource kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsByKind {
    #[serde(rename = "3d-model", default)]
    pub model: Vec<String>,
    #[serde(rename = "2d-image", default)]
    pub image: Vec<String>,
}

impl FieldsByKind {
    pub fn for_kind(&self, kind: ResourceKind) -> &[String] {
        match kind {
            ResourceKind::Model3d => &self.model,
            ResourceKind::Image2d => &self.image,
        }
    }
}

/// Collection-specific extraction hook, tried before the field lists
pub type CustomExtractor = Arc<dyn Fn(&Value) -> Option<ResourceInfo> + Send + Sync>;

/// Field-name mapping for one collection
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFieldConfig {
    pub collection_id: String,
    #[serde(default)]
    pub blob_id_fields: FieldsByKind,
    #[serde(default)]
    pub url_fields: FieldsByKind,
    #[serde(default = "default_priority")]
    pub resource_priority: Vec<ResourceKind>,
    #[serde(skip)]
    pub custom_extractor: Option<CustomExtractor>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_priority() -> Vec<ResourceKind> {
    vec![ResourceKind::Model3d, ResourceKind::Image2d]
}

fn default_enabled() -> bool {
    true
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl fmt::Debug for CollectionFieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionFieldConfig")
            .field("collection_id", &self.collection_id)
            .field("blob_id_fields", &self.blob_id_fields)
            .field("url_fields", &self.url_fields)
            .field("resource_priority", &self.resource_priority)
            .field("custom_extractor", &self.custom_extractor.is_some())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Default for CollectionFieldConfig {
    /// The fallback config, covering the commonly used field names
    fn default() -> Self {
        Self {
            collection_id: DEFAULT_COLLECTION_ID.to_string(),
            blob_id_fields: FieldsByKind {
                model: strings(&["blob_id", "model_blob_id", "glb_blob_id", "walrus_blob_id"]),
                image: strings(&["image_blob_id", "thumbnail_blob_id"]),
            },
            url_fields: FieldsByKind {
                model: strings(&["model_url", "glb_url", "animation_url", "glb_file"]),
                image: strings(&["image_url", "img_url", "url", "thumbnail_url"]),
            },
            resource_priority: default_priority(),
            custom_extractor: None,
            enabled: true,
        }
    }
}

impl CollectionFieldConfig {
    /// Empty config for a collection; fields are added with the builders
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            blob_id_fields: FieldsByKind::default(),
            url_fields: FieldsByKind::default(),
            resource_priority: default_priority(),
            custom_extractor: None,
            enabled: true,
        }
    }

    pub fn with_blob_fields(mut self, kind: ResourceKind, fields: &[&str]) -> Self {
        match kind {
            ResourceKind::Model3d => self.blob_id_fields.model = strings(fields),
            ResourceKind::Image2d => self.blob_id_fields.image = strings(fields),
        }
        self
    }

    pub fn with_url_fields(mut self, kind: ResourceKind, fields: &[&str]) -> Self {
        match kind {
            ResourceKind::Model3d => self.url_fields.model = strings(fields),
            ResourceKind::Image2d => self.url_fields.image = strings(fields),
        }
        self
    }

    pub fn with_priority(mut self, priority: Vec<ResourceKind>) -> Self {
        self.resource_priority = priority;
        self
    }

    pub fn with_extractor(
        mut self,
        extractor: impl Fn(&Value) -> Option<ResourceInfo> + Send + Sync + 'static,
    ) -> Self {
        self.custom_extractor = Some(Arc::new(extractor));
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_default(&self) -> bool {
        self.collection_id == DEFAULT_COLLECTION_ID
    }
}

/// A collection's field config could not be loaded
#[derive(Error, Debug)]
#[error("failed to load field config for collection `{collection_id}`: {source}")]
pub struct CollectionConfigLoadError {
    pub collection_id: String,
    #[source]
    pub source: anyhow::Error,
}

/// External provider of collection field configs
#[async_trait]
pub trait CollectionConfigSource: Send + Sync {
    /// Fetch the config for one collection; `Ok(None)` means none published
    async fn load(&self, collection_id: &str) -> anyhow::Result<Option<CollectionFieldConfig>>;
}

/// Registry of collection configs with a guaranteed default
#[derive(Debug)]
pub struct CollectionConfigRegistry {
    /// Registration order is preserved for deterministic substring matching
    configs: RwLock<Vec<Arc<CollectionFieldConfig>>>,
    default: RwLock<Arc<CollectionFieldConfig>>,
}

impl Default for CollectionConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionConfigRegistry {
    /// Registry holding only the built-in default config
    pub fn new() -> Self {
        Self {
            configs: RwLock::new(Vec::new()),
            default: RwLock::new(Arc::new(CollectionFieldConfig::default())),
        }
    }

    /// The fallback config
    pub fn default_config(&self) -> Arc<CollectionFieldConfig> {
        Arc::clone(&self.default.read())
    }

    /// Register or replace a config; registering the default id replaces the fallback
    pub fn register(&self, config: CollectionFieldConfig) {
        let config = Arc::new(config);
        if config.is_default() {
            *self.default.write() = config;
            return;
        }

        let mut configs = self.configs.write();
        match configs
            .iter_mut()
            .find(|c| c.collection_id == config.collection_id)
        {
            Some(slot) => *slot = config,
            None => configs.push(config),
        }
    }

    pub fn unregister(&self, collection_id: &str) -> bool {
        let mut configs = self.configs.write();
        let before = configs.len();
        configs.retain(|c| c.collection_id != collection_id);
        configs.len() != before
    }

    pub fn get(&self, collection_id: &str) -> Option<Arc<CollectionFieldConfig>> {
        self.configs
            .read()
            .iter()
            .find(|c| c.collection_id == collection_id)
            .cloned()
    }

    pub fn collection_ids(&self) -> Vec<String> {
        self.configs
            .read()
            .iter()
            .map(|c| c.collection_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.configs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.read().is_empty()
    }

    /// Pick the config for a collection
    ///
    /// Exact id match first, then a substring match in either direction,
    /// then the default. Disabled configs are skipped.
    pub fn select(&self, collection_id: &str) -> Arc<CollectionFieldConfig> {
        let configs = self.configs.read();
        let enabled = || configs.iter().filter(|c| c.enabled);

        if let Some(config) = enabled().find(|c| c.collection_id == collection_id) {
            return Arc::clone(config);
        }

        if !collection_id.is_empty() && collection_id != DEFAULT_COLLECTION_ID {
            if let Some(config) = enabled().find(|c| {
                collection_id.contains(c.collection_id.as_str())
                    || c.collection_id.contains(collection_id)
            }) {
                return Arc::clone(config);
            }
        }

        self.default_config()
    }

    /// Register every config in a JSON array, returning how many were added
    pub fn load_json(&self, json: &str) -> Result<usize, CollectionConfigLoadError> {
        let configs: Vec<CollectionFieldConfig> =
            serde_json::from_str(json).map_err(|e| CollectionConfigLoadError {
                collection_id: DEFAULT_COLLECTION_ID.to_string(),
                source: e.into(),
            })?;
        let count = configs.len();
        for config in configs {
            self.register(config);
        }
        Ok(count)
    }

    /// Load configs for the given collections from an external source
    ///
    /// Failures are logged and returned; the affected collections keep
    /// resolving through the default config.
    pub async fn load_from_source(
        &self,
        source: &dyn CollectionConfigSource,
        collection_ids: &[String],
    ) -> Vec<CollectionConfigLoadError> {
        let mut errors = Vec::new();
        for collection_id in collection_ids {
            if self.get(collection_id).is_some() {
                continue;
            }
            match source.load(collection_id).await {
                Ok(Some(mut config)) => {
                    config.collection_id = collection_id.clone();
                    log::debug!("Loaded field config for collection {collection_id}");
                    self.register(config);
                }
                Ok(None) => {
                    log::debug!("No field config published for {collection_id}, using default");
                }
                Err(err) => {
                    let error = CollectionConfigLoadError {
                        collection_id: collection_id.clone(),
                        source: err,
                    };
                    log::warn!("{error}; falling back to default config");
                    errors.push(error);
                }
            }
        }
        errors
    }
}
