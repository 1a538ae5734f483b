//! gallery_scene - Scene materialization engine for collectible galleries
//!
//! Turns a container's collectibles into a populated 3D scene:
//!
//! - [`codec`]: compact wire form of the saved scene descriptor
//! - [`resolver`]: finds the model or image behind a raw collectible record
//! - [`materializer`]: fetches assets one at a time and inserts scene nodes
//! - [`transform`]: authoritative object transforms, mirrored onto the scene
//! - [`preload`]: warms a hidden scene before the gallery is shown
//!
//! # Quick Start
//!
//! ```ignore
//! use gallery_scene::{MemorySceneFactory, MockFetcher, MemoryLedger, PreloadCoordinator, PreloadOptions};
//!
//! let coordinator = PreloadCoordinator::new(factory, fetcher, ledger);
//! let warmed = coordinator
//!     .run(PreloadOptions::new(container_id, items), |p| println!("{}%", p.percent), |e| eprintln!("{e}"))
//!     .await?;
//! println!("loaded {:?}", warmed.loaded_names);
//! ```

// Core modules
pub mod codec;
pub mod materializer;
pub mod preload;
pub mod resolver;
pub mod scene;
pub mod transform;

// Support modules
pub mod fetch;
pub mod graph;
pub mod model;
pub mod texture;

// Error types
mod error;
pub use error::{GalleryError, Result};

// Re-export data model
pub use scene::{
    CameraConfig, EnvironmentConfig, ResourceLocation, ResourceRef, SceneConfig, SceneMetadata,
    SceneObject, SceneObjectType, SCENE_CONFIG_VERSION,
};

// Re-export codec
pub use codec::{
    compress, decode_descriptor, decompress, encode_descriptor, validate, CompactSceneConfig,
    CompactSceneObject, ValidationError,
};

// Re-export resolver types
pub use resolver::{
    CollectionConfigLoadError, CollectionConfigRegistry, CollectionConfigSource,
    CollectionFieldConfig, ProcessedItem, ResourceInfo, ResourceKind, ResourceResolver,
};

// Re-export fetch and scene-graph ports
pub use fetch::{AssetFetcher, FetchError, GatewayConfig, MockFetcher, TransferProgress};
pub use graph::{
    MemoryScene, MemorySceneFactory, NodeDesc, NodeId, NodeTransform, SceneError, SceneFactory,
    SceneGraph,
};

// Re-export materializer types
pub use materializer::{
    AssetMaterializer, ImageStyle, LoadError, LoadErrorKind, LoadOptions, LoadReport, LoadRequest,
    LoadStage, MaterializerConfig, ProgressEvent, ProgressUpdate,
};

// Re-export transform types
pub use transform::{ObjectKind, ObjectTransform, TransformError, TransformStore};

// Re-export preload types
pub use preload::{
    LedgerClient, MemoryLedger, PreloadCoordinator, PreloadError, PreloadOptions, PreloadProgress,
    PreloadStage, WarmedScene,
};

// Re-export asset decoding types
pub use model::{LoadedModel, ModelError, ModelLoader};
pub use texture::{Texture, TextureError, TextureFormat, TextureLoader};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_memory_scene_available() {
        let scene = MemoryScene::new();
        assert_eq!(scene.node_count(), 0);
    }
}
