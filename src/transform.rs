//! Authoritative per-object transforms
//!
//! [`TransformStore`] is the single source of truth for object placement.
//! Every edit updates the map and the live scene node together; the map is
//! what gets exported back into a [`SceneConfig`].
//!
//! Rotations come in from the UI as degrees and are stored in radians.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{NodeTransform, SceneError, SceneGraph};
use crate::scene::{SceneConfig, SceneObjectType, COLLECTIBLE_DEFAULT_POSITION, FIXTURE_DEFAULT_POSITION};

/// Error type for transform edits
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Unknown scene object {0}")]
    UnknownObject(String),

    #[error("Invalid scale {scale} for {id}: must be positive and finite")]
    InvalidScale { id: String, scale: f32 },

    #[error("Non-finite {field} for {id}")]
    NonFinite { id: String, field: &'static str },

    #[error("Could not update scene node: {0}")]
    Scene(#[from] SceneError),
}

/// Decides which defaults an object resets to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Collectible,
    Fixture,
}

impl ObjectKind {
    pub fn default_position(&self) -> Vec3 {
        match self {
            Self::Collectible => COLLECTIBLE_DEFAULT_POSITION,
            Self::Fixture => FIXTURE_DEFAULT_POSITION,
        }
    }
}

impl From<SceneObjectType> for ObjectKind {
    fn from(object_type: SceneObjectType) -> Self {
        if object_type.is_fixture() {
            Self::Fixture
        } else {
            Self::Collectible
        }
    }
}

/// Placement of one object; rotation in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl ObjectTransform {
    pub fn default_for(kind: ObjectKind) -> Self {
        Self {
            position: kind.default_position(),
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }

    /// Rotation in degrees, each axis wrapped to [0, 360)
    pub fn rotation_degrees(&self) -> Vec3 {
        Vec3::new(
            wrap_degrees(self.rotation.x.to_degrees()),
            wrap_degrees(self.rotation.y.to_degrees()),
            wrap_degrees(self.rotation.z.to_degrees()),
        )
    }

    pub fn to_node_transform(&self) -> NodeTransform {
        NodeTransform::at(self.position)
            .with_rotation(self.rotation)
            .with_uniform_scale(self.scale)
    }
}

/// Wrap an angle in degrees into [0, 360)
pub fn wrap_degrees(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    kind: ObjectKind,
    transform: ObjectTransform,
}

/// Owns object transforms and mirrors edits onto the live scene
#[derive(Default)]
pub struct TransformStore {
    scene: RwLock<Option<Arc<dyn SceneGraph>>>,
    entries: RwLock<HashMap<String, Entry>>,
}

impl TransformStore {
    /// Store bound to a live scene
    pub fn new(scene: Arc<dyn SceneGraph>) -> Self {
        Self {
            scene: RwLock::new(Some(scene)),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store with no scene; edits only touch the map
    pub fn detached() -> Self {
        Self::default()
    }

    /// Rebind to another scene and push every stored transform onto it
    ///
    /// Objects with no node in the new scene are skipped.
    pub fn bind_scene(&self, scene: Arc<dyn SceneGraph>) -> Result<(), TransformError> {
        let entries = self.entries.read();
        for (id, entry) in entries.iter() {
            push_to(&*scene, id, &entry.transform)?;
        }
        drop(entries);
        *self.scene.write() = Some(scene);
        Ok(())
    }

    /// Replace the contents with the transforms of a decoded scene
    pub fn seed_from(&self, config: &SceneConfig) {
        let seeded: HashMap<String, Entry> = config
            .objects
            .iter()
            .map(|object| {
                let entry = Entry {
                    kind: object.object_type.into(),
                    transform: ObjectTransform {
                        position: object.position,
                        rotation: object.rotation,
                        scale: object.scale,
                    },
                };
                (object.id.clone(), entry)
            })
            .collect();
        log::debug!("Seeded {} transforms", seeded.len());
        *self.entries.write() = seeded;
    }

    /// Start tracking an object, pushing its transform onto any live node
    pub fn insert(
        &self,
        id: impl Into<String>,
        kind: ObjectKind,
        transform: ObjectTransform,
    ) -> Result<(), TransformError> {
        let id = id.into();
        validate(&id, &transform)?;
        let mut entries = self.entries.write();
        self.push(&id, &transform)?;
        entries.insert(id, Entry { kind, transform });
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Option<ObjectTransform> {
        self.entries.write().remove(id).map(|e| e.transform)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<ObjectTransform> {
        self.entries.read().get(id).map(|e| e.transform)
    }

    pub fn kind(&self, id: &str) -> Option<ObjectKind> {
        self.entries.read().get(id).map(|e| e.kind)
    }

    /// Rotation in degrees for display, wrapped to [0, 360)
    pub fn rotation_degrees(&self, id: &str) -> Option<Vec3> {
        self.get(id).map(|t| t.rotation_degrees())
    }

    /// Copy of every stored transform
    pub fn snapshot(&self) -> HashMap<String, ObjectTransform> {
        self.entries
            .read()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.transform))
            .collect()
    }

    pub fn set_position(&self, id: &str, position: Vec3) -> Result<(), TransformError> {
        self.edit(id, |t, _| t.position = position)
    }

    /// Set rotation from degrees
    pub fn set_rotation_degrees(&self, id: &str, degrees: Vec3) -> Result<(), TransformError> {
        let radians = Vec3::new(
            degrees.x.to_radians(),
            degrees.y.to_radians(),
            degrees.z.to_radians(),
        );
        self.set_rotation(id, radians)
    }

    /// Set rotation from radians
    pub fn set_rotation(&self, id: &str, radians: Vec3) -> Result<(), TransformError> {
        self.edit(id, |t, _| t.rotation = radians)
    }

    pub fn set_scale(&self, id: &str, scale: f32) -> Result<(), TransformError> {
        self.edit(id, |t, _| t.scale = scale)
    }

    pub fn reset_position(&self, id: &str) -> Result<(), TransformError> {
        self.edit(id, |t, kind| t.position = kind.default_position())
    }

    pub fn reset_rotation(&self, id: &str) -> Result<(), TransformError> {
        self.edit(id, |t, _| t.rotation = Vec3::ZERO)
    }

    pub fn reset_scale(&self, id: &str) -> Result<(), TransformError> {
        self.edit(id, |t, _| t.scale = 1.0)
    }

    pub fn reset_all(&self, id: &str) -> Result<(), TransformError> {
        self.edit(id, |t, kind| *t = ObjectTransform::default_for(kind))
    }

    /// Write stored transforms onto matching objects of `config`
    ///
    /// Returns the number of objects whose transform changed.
    pub fn export_into(&self, config: &mut SceneConfig) -> usize {
        let entries = self.entries.read();
        let mut changed = 0;
        for object in &mut config.objects {
            let Some(entry) = entries.get(&object.id) else {
                continue;
            };
            let t = entry.transform;
            if object.position != t.position || object.rotation != t.rotation || object.scale != t.scale
            {
                object.position = t.position;
                object.rotation = t.rotation;
                object.scale = t.scale;
                object.touch();
                changed += 1;
            }
        }
        if changed > 0 {
            config.updated_at = crate::scene::now_millis();
        }
        changed
    }

    /// Apply an edit; the map changes only if the live node accepted it
    fn edit<F>(&self, id: &str, apply: F) -> Result<(), TransformError>
    where
        F: FnOnce(&mut ObjectTransform, ObjectKind),
    {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| TransformError::UnknownObject(id.to_string()))?;

        let mut next = entry.transform;
        apply(&mut next, entry.kind);
        validate(id, &next)?;
        self.push(id, &next)?;
        entry.transform = next;
        Ok(())
    }

    fn push(&self, id: &str, transform: &ObjectTransform) -> Result<(), TransformError> {
        match &*self.scene.read() {
            Some(scene) => push_to(&**scene, id, transform),
            None => Ok(()),
        }
    }
}

fn push_to(scene: &dyn SceneGraph, id: &str, transform: &ObjectTransform) -> Result<(), TransformError> {
    if let Some(node) = scene.find_by_object_id(id) {
        scene.set_transform(node, transform.to_node_transform())?;
    }
    Ok(())
}

fn validate(id: &str, transform: &ObjectTransform) -> Result<(), TransformError> {
    if !transform.position.is_finite() {
        return Err(TransformError::NonFinite {
            id: id.to_string(),
            field: "position",
        });
    }
    if !transform.rotation.is_finite() {
        return Err(TransformError::NonFinite {
            id: id.to_string(),
            field: "rotation",
        });
    }
    if !(transform.scale.is_finite() && transform.scale > 0.0) {
        return Err(TransformError::InvalidScale {
            id: id.to_string(),
            scale: transform.scale,
        });
    }
    Ok(())
}
