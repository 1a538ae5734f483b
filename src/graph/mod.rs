//! Scene-graph abstraction
//!
//! The materializer and transform store drive whatever engine renders the
//! gallery through the [`SceneGraph`] trait. [`MemoryScene`] is a headless
//! implementation used for off-screen preloading and tests.

pub mod memory;

pub use memory::{MemoryScene, MemorySceneFactory};

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use thiserror::Error;
use uuid::Uuid;

use crate::model::LoadedModel;
use crate::texture::Texture;

/// Error type for scene-graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Unknown scene node {0}")]
    UnknownNode(NodeId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("Scene could not be created: {0}")]
    Creation(String),
}

/// Handle to a node in a scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local transform of a node; rotation is XYZ euler radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl NodeTransform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }
}

/// Surface description of a plane or ring
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Flat unlit color (RGBA)
    Basic { color: [f32; 4] },
    /// Self-lit color, used for halos and glows
    Emissive { color: [f32; 4], intensity: f32 },
    /// Image texture, optionally self-lit
    Textured { texture: Arc<Texture>, emissive: f32 },
    /// Translucent dark plane faking a drop shadow
    Shadow { opacity: f32 },
}

/// What a node renders
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    /// Pure transform node
    Group,
    /// Decoded 3D model
    Model(Arc<LoadedModel>),
    /// Rectangle in the local XY plane
    Plane {
        width: f32,
        height: f32,
        material: Material,
    },
    /// Rectangular border of the given thickness
    Ring {
        width: f32,
        height: f32,
        thickness: f32,
        material: Material,
    },
}

impl NodeContent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Model(_) => "model",
            Self::Plane { .. } => "plane",
            Self::Ring { .. } => "ring",
        }
    }
}

/// Everything needed to create a node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDesc {
    pub name: String,
    /// Scene object this node renders, if any
    pub object_id: Option<String>,
    pub content: NodeContent,
    pub transform: NodeTransform,
    pub visible: bool,
}

impl NodeDesc {
    pub fn new(name: impl Into<String>, content: NodeContent) -> Self {
        Self {
            name: name.into(),
            object_id: None,
            content,
            transform: NodeTransform::default(),
            visible: true,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeContent::Group)
    }

    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }
}

/// Read-only view of a node handed to traversal callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub desc: NodeDesc,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Scene-graph engine driven by the materializer and transform store
///
/// Implementations use interior mutability so one scene can be shared
/// between components behind an `Arc`.
pub trait SceneGraph: Send + Sync {
    /// Create a detached node
    fn create_node(&self, desc: NodeDesc) -> NodeId;

    /// Attach `child` under `parent`, or at the scene root when `parent` is `None`
    fn add_child(&self, parent: Option<NodeId>, child: NodeId) -> Result<(), SceneError>;

    /// Detach `child` from `parent` (or the root) and dispose of its subtree
    fn remove_child(&self, parent: Option<NodeId>, child: NodeId) -> Result<(), SceneError>;

    /// Dispose of a detached node and its subtree; unknown ids are ignored
    fn dispose_node(&self, node: NodeId);

    fn set_transform(&self, node: NodeId, transform: NodeTransform) -> Result<(), SceneError>;

    fn transform(&self, node: NodeId) -> Option<NodeTransform>;

    /// Visit every node attached to the scene, depth first from the roots
    ///
    /// The visitor must not call back into the scene.
    fn traverse(&self, visit: &mut dyn FnMut(NodeId, &SceneNode));

    /// First attached node with the given name
    fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut found = None;
        self.traverse(&mut |id, node| {
            if found.is_none() && node.desc.name == name {
                found = Some(id);
            }
        });
        found
    }

    /// First attached node rendering the given scene object
    fn find_by_object_id(&self, object_id: &str) -> Option<NodeId> {
        let mut found = None;
        self.traverse(&mut |id, node| {
            if found.is_none() && node.desc.object_id.as_deref() == Some(object_id) {
                found = Some(id);
            }
        });
        found
    }

    /// Number of attached nodes
    fn node_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |_, _| count += 1);
        count
    }
}

/// Builds scene instances, e.g. a hidden one for preloading
pub trait SceneFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn SceneGraph>, SceneError>;
}
