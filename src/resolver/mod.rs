//! Resource resolution for raw collectible records
//!
//! Collectible records arrive as loosely structured JSON. The resolver picks
//! the field config for the record's collection and walks its ordered field
//! lists to find a model or image reference. Finding nothing is normal and
//! yields `None`.

pub mod registry;

pub use registry::{
    CollectionConfigLoadError, CollectionConfigRegistry, CollectionConfigSource,
    CollectionFieldConfig, CustomExtractor, FieldsByKind, ResourceKind, DEFAULT_COLLECTION_ID,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::NodeId;
use crate::scene::{ResourceLocation, ResourceRef, SceneObject, SceneObjectType, DEFAULT_MODEL_FORMAT};

/// Keys that carry an explicit collection id
const COLLECTION_KEYS: &[&str] = &["collection_id", "collectionId", "collection"];

/// Keys that carry a module-style type tag
const TYPE_KEYS: &[&str] = &["type", "objectType", "object_type", "type_tag"];

/// Keys that carry the item's ledger id
const ID_KEYS: &[&str] = &["id", "objectId", "object_id"];

/// Nested containers searched after the record root, in order
const CONTAINER_PATHS: &[&[&str]] = &[
    &["display"],
    &["display", "data"],
    &["fields"],
    &["content", "fields"],
];

/// Values that mean "no value"
const SENTINELS: &[&str] = &["none", "null", "undefined"];

/// Resolver output: what to show and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub kind: ResourceKind,
    pub location: ResourceLocation,
    /// Field the value was read from
    pub field_name: String,
    /// Collection id of the config that produced this match
    pub config_id: String,
}

impl ResourceInfo {
    pub fn blob_id(&self) -> Option<&str> {
        match &self.location {
            ResourceLocation::Blob(id) => Some(id),
            ResourceLocation::Url(_) => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.location {
            ResourceLocation::Url(url) => Some(url),
            ResourceLocation::Blob(_) => None,
        }
    }

    /// Format tag, inferred from the URL extension when there is one
    pub fn format(&self) -> String {
        let extension = self
            .url()
            .and_then(|url| url.split(['?', '#']).next())
            .and_then(|path| path.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.contains('/'));

        match (self.kind, extension.as_deref()) {
            (ResourceKind::Model3d, Some(ext @ ("glb" | "gltf"))) => ext.to_string(),
            (ResourceKind::Model3d, _) => DEFAULT_MODEL_FORMAT.to_string(),
            (ResourceKind::Image2d, Some(ext @ ("png" | "jpg" | "jpeg" | "webp" | "gif"))) => {
                ext.to_string()
            }
            (ResourceKind::Image2d, _) => "image".to_string(),
        }
    }

    pub fn to_resource_ref(&self) -> ResourceRef {
        ResourceRef {
            location: self.location.clone(),
            format: self.format(),
        }
    }
}

/// A raw record after resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedItem {
    pub id: String,
    pub name: String,
    /// Collection the record was identified as
    pub collection_id: String,
    pub resource_info: ResourceInfo,
    pub scene_object: SceneObject,
    /// Live scene node once materialized
    pub node: Option<NodeId>,
}

/// Converts raw collectible records into resource references
#[derive(Debug, Clone, Default)]
pub struct ResourceResolver {
    registry: Arc<CollectionConfigRegistry>,
}

impl ResourceResolver {
    pub fn new(registry: Arc<CollectionConfigRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<CollectionConfigRegistry> {
        &self.registry
    }

    /// Resolve a record to a resource, or `None` if it has nothing to show
    pub fn extract_resource_info(
        &self,
        item: &Value,
        collection_id: Option<&str>,
    ) -> Option<ResourceInfo> {
        let collection_id = collection_id
            .map(str::to_string)
            .unwrap_or_else(|| collection_id_of(item));
        let config = self.registry.select(&collection_id);

        if let Some(extractor) = &config.custom_extractor {
            if let Some(info) = extractor(item) {
                return Some(info);
            }
        }

        for &kind in &config.resource_priority {
            for field in config.blob_id_fields.for_kind(kind) {
                if let Some(value) = field_str(item, field) {
                    return Some(ResourceInfo {
                        kind,
                        location: ResourceLocation::Blob(value.to_string()),
                        field_name: field.clone(),
                        config_id: config.collection_id.clone(),
                    });
                }
            }
            for field in config.url_fields.for_kind(kind) {
                if let Some(value) = field_str(item, field) {
                    return Some(ResourceInfo {
                        kind,
                        location: ResourceLocation::Url(value.to_string()),
                        field_name: field.clone(),
                        config_id: config.collection_id.clone(),
                    });
                }
            }
        }

        log::trace!("No displayable resource for item in collection {collection_id}");
        None
    }

    /// Resolve a batch of records, skipping those without an id or resource
    pub fn process_items(&self, items: &[Value]) -> Vec<ProcessedItem> {
        items
            .iter()
            .filter_map(|item| {
                let Some(id) = item_id(item) else {
                    log::debug!("Skipping collectible record without an id");
                    return None;
                };
                let collection_id = collection_id_of(item);
                let resource_info = self.extract_resource_info(item, Some(&collection_id))?;
                let name = item_name(item);
                let scene_object = SceneObject::new(&id, &name, SceneObjectType::LedgerItem)
                    .with_resource(resource_info.to_resource_ref());

                Some(ProcessedItem {
                    id,
                    name,
                    collection_id,
                    resource_info,
                    scene_object,
                    node: None,
                })
            })
            .collect()
    }

    /// Scene objects for every record with an id
    ///
    /// Records with nothing displayable become plain ledger items, so they
    /// stay in the scene for as long as the collectible is held.
    pub fn observe_items(&self, items: &[Value]) -> Vec<SceneObject> {
        items
            .iter()
            .filter_map(|item| {
                let id = item_id(item)?;
                let object = SceneObject::new(&id, item_name(item), SceneObjectType::LedgerItem);
                let collection_id = collection_id_of(item);
                Some(match self.extract_resource_info(item, Some(&collection_id)) {
                    Some(info) => object.with_resource(info.to_resource_ref()),
                    None => object,
                })
            })
            .collect()
    }
}

/// Identify the collection a record belongs to
///
/// An explicit collection field wins; otherwise the module-style type tag with
/// generic arguments stripped; otherwise [`DEFAULT_COLLECTION_ID`].
pub fn collection_id_of(item: &Value) -> String {
    if let Some(id) = COLLECTION_KEYS.iter().find_map(|key| field_str(item, key)) {
        return id.to_string();
    }

    TYPE_KEYS
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(|tag| tag.split('<').next().unwrap_or(tag).trim())
        .filter(|tag| tag.contains("::"))
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_COLLECTION_ID.to_string())
}

/// Ledger id of a record; accepts a plain string or a `{ "id": ... }` wrapper
pub fn item_id(item: &Value) -> Option<String> {
    ID_KEYS.iter().find_map(|key| match item.get(*key)? {
        Value::String(id) if present(id) => Some(id.clone()),
        Value::Object(uid) => uid
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| present(id))
            .map(str::to_string),
        _ => None,
    })
}

/// Display name of a record
pub fn item_name(item: &Value) -> String {
    field_str(item, "name")
        .unwrap_or("Untitled")
        .to_string()
}

/// Look up a string field on a record
///
/// Searches the record root, then the nested containers collectible records
/// commonly use. Dotted names walk nested objects. Empty and sentinel values
/// count as absent.
pub fn field_str<'a>(item: &'a Value, field: &str) -> Option<&'a str> {
    std::iter::once(Some(item))
        .chain(CONTAINER_PATHS.iter().map(|path| walk(item, path.iter().copied())))
        .flatten()
        .find_map(|container| {
            walk(container, field.split('.'))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| present(value))
        })
}

fn walk<'a, 'k>(value: &'a Value, path: impl IntoIterator<Item = &'k str>) -> Option<&'a Value> {
    path.into_iter()
        .try_fold(value, |current, key| current.as_object()?.get(key))
}

fn present(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !SENTINELS.iter().any(|s| s.eq_ignore_ascii_case(value))
}
