//! Scene data model
//!
//! A [`SceneConfig`] is the full in-memory description of a gallery: which
//! collectibles exist, which of them are displayed, and where they sit. It is
//! the value that [`crate::codec`] compresses for on-chain persistence.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Current descriptor version written by [`crate::codec::compress`]
pub const SCENE_CONFIG_VERSION: u32 = 1;

/// Model format assumed when a resource carries no explicit tag
pub const DEFAULT_MODEL_FORMAT: &str = "glb";

/// Reset position for ledger-linked collectibles
pub const COLLECTIBLE_DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 2.0, 0.0);

/// Reset position for procedural fixtures
pub const FIXTURE_DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Format tags treated as 2D images rather than 3D models
pub const IMAGE_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "image"];

/// Milliseconds since the unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Returns true if `format` names a 2D image format
pub fn is_image_format(format: &str) -> bool {
    IMAGE_FORMATS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(format))
}

/// What kind of thing a scene object is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneObjectType {
    /// Collectible tracked on the ledger with no external asset
    LedgerItem,
    /// Model hosted at an arbitrary URL
    ExternalModel,
    /// Procedurally built fixture (pedestal, frame, light)
    Fixture,
    /// Model stored as a content-addressed blob
    BlobModel,
    /// Flat 2D image
    Image,
}

impl SceneObjectType {
    /// Infer the type from the resource an object carries
    pub fn infer(resource: Option<&ResourceRef>) -> Self {
        match resource {
            None => Self::LedgerItem,
            Some(r) if is_image_format(&r.format) => Self::Image,
            Some(r) => match r.location {
                ResourceLocation::Blob(_) => Self::BlobModel,
                ResourceLocation::Url(_) => Self::ExternalModel,
            },
        }
    }

    /// Whether objects of this type must carry a resource
    pub fn requires_resource(&self) -> bool {
        matches!(self, Self::ExternalModel | Self::BlobModel | Self::Image)
    }

    pub fn is_fixture(&self) -> bool {
        matches!(self, Self::Fixture)
    }

    /// Position an object of this type resets to
    pub fn default_position(&self) -> Vec3 {
        if self.is_fixture() {
            FIXTURE_DEFAULT_POSITION
        } else {
            COLLECTIBLE_DEFAULT_POSITION
        }
    }
}

/// Where the bytes of an asset live
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceLocation {
    /// Content-addressed blob id
    Blob(String),
    /// Plain URL
    Url(String),
}

impl ResourceLocation {
    /// Identifier used in logs and error reports
    pub fn key(&self) -> &str {
        match self {
            Self::Blob(id) => id,
            Self::Url(url) => url,
        }
    }
}

/// Reference to an external asset with its format tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub location: ResourceLocation,
    pub format: String,
}

impl ResourceRef {
    /// Blob-backed resource in the default model format
    pub fn blob(blob_id: impl Into<String>) -> Self {
        Self {
            location: ResourceLocation::Blob(blob_id.into()),
            format: DEFAULT_MODEL_FORMAT.to_string(),
        }
    }

    /// URL-backed resource in the default model format
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            location: ResourceLocation::Url(url.into()),
            format: DEFAULT_MODEL_FORMAT.to_string(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn blob_id(&self) -> Option<&str> {
        match &self.location {
            ResourceLocation::Blob(id) => Some(id),
            ResourceLocation::Url(_) => None,
        }
    }

    pub fn url_str(&self) -> Option<&str> {
        match &self.location {
            ResourceLocation::Url(url) => Some(url),
            ResourceLocation::Blob(_) => None,
        }
    }

    pub fn has_default_format(&self) -> bool {
        self.format == DEFAULT_MODEL_FORMAT
    }
}

/// One item in the scene, visible or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: String,
    pub name: String,
    pub object_type: SceneObjectType,
    pub displayed: bool,
    pub position: Vec3,
    /// Euler angles in radians
    pub rotation: Vec3,
    pub scale: f32,
    pub resource: Option<ResourceRef>,
    /// Milliseconds since the unix epoch
    pub updated_at: u64,
}

impl SceneObject {
    /// Create a hidden object at the default position for its type
    pub fn new(id: impl Into<String>, name: impl Into<String>, object_type: SceneObjectType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            object_type,
            displayed: false,
            position: object_type.default_position(),
            rotation: Vec3::ZERO,
            scale: 1.0,
            resource: None,
            updated_at: now_millis(),
        }
    }

    /// Attach a resource and re-infer the type from it
    pub fn with_resource(mut self, resource: ResourceRef) -> Self {
        self.object_type = SceneObjectType::infer(Some(&resource));
        self.resource = Some(resource);
        self
    }

    pub fn with_displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }
}

/// Camera placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
            fov: 60.0,
        }
    }
}

/// Lighting and backdrop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub background_color: [f32; 3],
    pub ambient_intensity: f32,
    pub show_floor: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            background_color: [0.1, 0.1, 0.18],
            ambient_intensity: 0.6,
            show_floor: true,
        }
    }
}

/// Optional descriptive metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    /// Owning container on the ledger
    pub container_id: Option<String>,
    pub creator: Option<String>,
    pub tags: Vec<String>,
}

/// The full scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub version: u32,
    pub objects: Vec<SceneObject>,
    pub camera: CameraConfig,
    pub environment: EnvironmentConfig,
    pub metadata: Option<SceneMetadata>,
    /// Milliseconds since the unix epoch
    pub updated_at: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: SCENE_CONFIG_VERSION,
            objects: Vec::new(),
            camera: CameraConfig::default(),
            environment: EnvironmentConfig::default(),
            metadata: None,
            updated_at: 0,
        }
    }
}

impl SceneConfig {
    /// Scene holding `objects` as given, displayed flags included
    pub fn new(objects: impl IntoIterator<Item = SceneObject>) -> Self {
        Self {
            objects: objects.into_iter().collect(),
            updated_at: now_millis(),
            ..Default::default()
        }
    }

    /// Scene of freshly observed collectibles, none of them displayed
    pub fn default_for_items(items: impl IntoIterator<Item = SceneObject>) -> Self {
        Self::new(items.into_iter().map(|object| object.with_displayed(false)))
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(SceneMetadata::default)
            .container_id = Some(container_id.into());
        self
    }

    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Ids of every displayed object
    pub fn displayed_ids(&self) -> HashSet<String> {
        self.objects
            .iter()
            .filter(|o| o.displayed)
            .map(|o| o.id.clone())
            .collect()
    }

    /// Flip the displayed flag of an object, returning the new value
    pub fn toggle_displayed(&mut self, id: &str) -> Option<bool> {
        let object = self.object_mut(id)?;
        object.displayed = !object.displayed;
        object.touch();
        let displayed = object.displayed;
        self.updated_at = now_millis();
        Some(displayed)
    }

    /// Reconcile saved objects against the collectibles currently observed
    ///
    /// Saved objects whose id is still observed keep their transform and
    /// displayed flag, refreshing name and resource from the observation.
    /// Saved objects that vanished are dropped, unless they are fixtures.
    /// Newly observed ids are appended hidden.
    pub fn merge_observed(&mut self, observed: impl IntoIterator<Item = SceneObject>) {
        let observed: Vec<SceneObject> = observed.into_iter().collect();
        let observed_ids: HashSet<&str> = observed.iter().map(|o| o.id.as_str()).collect();

        let before = self.objects.len();
        self.objects
            .retain(|o| o.object_type.is_fixture() || observed_ids.contains(o.id.as_str()));
        let dropped = before - self.objects.len();
        if dropped > 0 {
            log::debug!("Dropped {dropped} scene objects no longer present");
        }

        for fresh in observed {
            match self.object_mut(&fresh.id) {
                Some(saved) => {
                    saved.name = fresh.name;
                    if fresh.resource.is_some() {
                        saved.object_type = fresh.object_type;
                        saved.resource = fresh.resource;
                    }
                }
                None => self.objects.push(fresh.with_displayed(false)),
            }
        }
        self.updated_at = now_millis();
    }
}
