//! Error types for gallery_scene

use thiserror::Error;

/// Crate-level error aggregating every component's failures
#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Invalid scene descriptor: {0}")]
    Validation(#[from] crate::codec::ValidationError),

    #[error("Descriptor encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    CollectionConfig(#[from] crate::resolver::CollectionConfigLoadError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crate::fetch::FetchError),

    #[error(transparent)]
    Load(#[from] crate::materializer::LoadError),

    #[error("Model error: {0}")]
    Model(#[from] crate::model::ModelError),

    #[error("Texture error: {0}")]
    Texture(#[from] crate::texture::TextureError),

    #[error("Scene error: {0}")]
    Scene(#[from] crate::graph::SceneError),

    #[error("Transform error: {0}")]
    Transform(#[from] crate::transform::TransformError),

    #[error("Preload error: {0}")]
    Preload(#[from] crate::preload::PreloadError),

    #[error("Ledger error: {0:#}")]
    Ledger(#[from] anyhow::Error),
}

/// Result type alias for gallery operations
pub type Result<T> = std::result::Result<T, GalleryError>;
