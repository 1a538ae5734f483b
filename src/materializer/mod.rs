//! Asset materialization
//!
//! [`AssetMaterializer`] turns resource references into live scene nodes. It
//! owns the set of loaded node names and enforces three rules:
//!
//! - a load whose derived name is already tracked resolves immediately,
//! - at most one fetch is in flight per materializer, queued loads running in
//!   arrival order with a fixed pause between items,
//! - a failed item is recorded against that item only.

pub mod metrics;
pub mod naming;
pub mod progress;
pub mod style;

pub use metrics::{LoadMetrics, LoadMetricsHandle};
pub use progress::{LoadStage, ProgressCallback, ProgressEvent, ProgressUpdate};
pub use style::ImageStyle;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::fetch::{AssetFetcher, FetchError, TransferProgress};
use crate::graph::{NodeContent, NodeDesc, NodeId, NodeTransform, SceneError, SceneGraph};
use crate::model::ModelLoader;
use crate::resolver::{ProcessedItem, ResourceKind, DEFAULT_COLLECTION_ID};
use crate::scene::{ResourceLocation, SceneObject, DEFAULT_MODEL_FORMAT};
use crate::texture::TextureLoader;

/// What kind of node an asset becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Model,
    Image,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Image => "image",
        }
    }
}

/// Materializer settings
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializerConfig {
    /// Pause taken after each item while the fetch gate is still held
    pub inter_item_pause: Duration,
    /// Format assumed for models whose request names none
    pub default_model_format: String,
    /// Height of image planes in scene units; width follows the aspect ratio
    pub image_height: f32,
    /// Largest extent models are scaled to
    pub model_size: f32,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            inter_item_pause: Duration::from_millis(100),
            default_model_format: DEFAULT_MODEL_FORMAT.to_string(),
            image_height: 1.5,
            model_size: 1.5,
        }
    }
}

impl MaterializerConfig {
    pub fn with_inter_item_pause(mut self, pause: Duration) -> Self {
        self.inter_item_pause = pause;
        self
    }

    pub fn with_default_model_format(mut self, format: impl Into<String>) -> Self {
        self.default_model_format = format.into();
        self
    }

    pub fn with_image_height(mut self, height: f32) -> Self {
        self.image_height = height;
        self
    }

    pub fn with_model_size(mut self, size: f32) -> Self {
        self.model_size = size;
        self
    }
}

/// Per-load options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    /// Scene object the node renders; also feeds the node name
    pub object_id: Option<String>,
    pub display_name: String,
    /// Collection label used as the name prefix
    pub group: Option<String>,
    /// Model format tag; the configured default when absent
    pub format: Option<String>,
    /// Transform of the outer node
    pub transform: NodeTransform,
}

impl LoadOptions {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    /// Options for rendering a scene object at its saved transform
    pub fn for_object(object: &SceneObject) -> Self {
        Self {
            object_id: Some(object.id.clone()),
            display_name: object.name.clone(),
            group: None,
            format: object.resource.as_ref().map(|r| r.format.clone()),
            transform: NodeTransform::at(object.position)
                .with_rotation(object.rotation)
                .with_uniform_scale(object.scale),
        }
    }

    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }
}

/// Asset-specific part of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRequest {
    Model,
    Image(ImageStyle),
}

/// One queued materialization
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub location: ResourceLocation,
    pub asset: AssetRequest,
    pub options: LoadOptions,
}

impl LoadRequest {
    pub fn model(location: ResourceLocation, options: LoadOptions) -> Self {
        Self {
            location,
            asset: AssetRequest::Model,
            options,
        }
    }

    pub fn image(location: ResourceLocation, style: ImageStyle, options: LoadOptions) -> Self {
        Self {
            location,
            asset: AssetRequest::Image(style),
            options,
        }
    }

    /// Request for a resolved collectible; images use `style`
    pub fn from_processed(item: &ProcessedItem, style: ImageStyle) -> Self {
        let mut options = LoadOptions::for_object(&item.scene_object);
        if item.collection_id != DEFAULT_COLLECTION_ID {
            options.group = Some(naming::group_label(&item.collection_id).to_string());
        }
        let location = item.resource_info.location.clone();
        match item.resource_info.kind {
            ResourceKind::Model3d => Self::model(location, options),
            ResourceKind::Image2d => Self::image(location, style, options),
        }
    }

    pub fn kind(&self) -> AssetKind {
        match self.asset {
            AssetRequest::Model => AssetKind::Model,
            AssetRequest::Image(_) => AssetKind::Image,
        }
    }

    /// Stable name used for dedup
    pub fn node_name(&self) -> String {
        naming::node_name(
            self.options.group.as_deref(),
            self.kind(),
            &self.options.display_name,
            self.options.object_id.as_deref(),
            self.location.key(),
        )
    }
}

/// Why one item failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadErrorKind {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("model decode failed: {0}")]
    Model(String),

    #[error("image decode failed: {0}")]
    Image(String),

    #[error("scene update failed: {0}")]
    Scene(#[from] SceneError),
}

/// Failure of one item, recorded against that item
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to load {name} from {source_key}: {kind}")]
pub struct LoadError {
    /// Derived node name
    pub name: String,
    pub object_id: Option<String>,
    /// Blob id or URL that was requested
    pub source_key: String,
    pub kind: LoadErrorKind,
}

/// Outcome of [`AssetMaterializer::load_queue`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Names of nodes present after the queue ran, in request order
    pub loaded: Vec<String>,
    pub failed: Vec<LoadError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
struct Tracked {
    order: Vec<String>,
    nodes: HashMap<String, NodeId>,
}

/// Loads assets into a scene graph, one fetch at a time
pub struct AssetMaterializer {
    scene: Arc<dyn SceneGraph>,
    fetcher: Arc<dyn AssetFetcher>,
    config: MaterializerConfig,
    model_loader: ModelLoader,
    texture_loader: TextureLoader,
    /// FIFO gate serializing fetches
    gate: Mutex<()>,
    tracked: RwLock<Tracked>,
    failures: RwLock<Vec<LoadError>>,
    on_progress: Option<ProgressCallback>,
    metrics: LoadMetricsHandle,
}

impl AssetMaterializer {
    pub fn new(scene: Arc<dyn SceneGraph>, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self::with_config(scene, fetcher, MaterializerConfig::default())
    }

    pub fn with_config(
        scene: Arc<dyn SceneGraph>,
        fetcher: Arc<dyn AssetFetcher>,
        config: MaterializerConfig,
    ) -> Self {
        Self {
            scene,
            fetcher,
            config,
            model_loader: ModelLoader::new(),
            texture_loader: TextureLoader::new(),
            gate: Mutex::new(()),
            tracked: RwLock::new(Tracked::default()),
            failures: RwLock::new(Vec::new()),
            on_progress: None,
            metrics: LoadMetricsHandle::new(),
        }
    }

    /// Receive progress events for every load
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn scene(&self) -> &Arc<dyn SceneGraph> {
        &self.scene
    }

    pub fn config(&self) -> &MaterializerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &LoadMetricsHandle {
        &self.metrics
    }

    /// Load a 3D model and attach it at the scene root
    pub async fn load_model(
        &self,
        location: ResourceLocation,
        options: LoadOptions,
    ) -> Result<NodeId, LoadError> {
        self.load(LoadRequest::model(location, options)).await
    }

    /// Load a 2D image as a styled plane stack
    pub async fn load_image(
        &self,
        location: ResourceLocation,
        style: ImageStyle,
        options: LoadOptions,
    ) -> Result<NodeId, LoadError> {
        self.load(LoadRequest::image(location, style, options)).await
    }

    /// Load one request, waiting for any fetch already in flight
    pub async fn load(&self, request: LoadRequest) -> Result<NodeId, LoadError> {
        let name = request.node_name();
        if let Some(node) = self.dedup_hit(&name) {
            return Ok(node);
        }

        let _turn = self.gate.lock().await;
        // Loaded by a caller queued ahead of us
        if let Some(node) = self.dedup_hit(&name) {
            return Ok(node);
        }

        let key = request.location.key();
        let started = Instant::now();
        let result = match self.materialize(&name, &request).await {
            Ok(node) => {
                self.track(&name, node);
                self.metrics
                    .record_load_time(name.clone(), started.elapsed());
                self.emit(&name, ProgressUpdate::Stage(LoadStage::Done), key);
                log::info!("Materialized {name} from {key}");
                Ok(node)
            }
            Err(kind) => {
                let error = LoadError {
                    name: name.clone(),
                    object_id: request.options.object_id.clone(),
                    source_key: key.to_string(),
                    kind,
                };
                log::warn!("{error}");
                self.metrics.record_failure();
                self.emit(
                    &name,
                    ProgressUpdate::Stage(LoadStage::Failed),
                    error.kind.to_string(),
                );
                self.failures.write().push(error.clone());
                Err(error)
            }
        };

        if !self.config.inter_item_pause.is_zero() {
            tokio::time::sleep(self.config.inter_item_pause).await;
        }
        result
    }

    /// Load requests in order; a failure is reported and the queue moves on
    pub async fn load_queue<F>(&self, requests: Vec<LoadRequest>, mut on_error: F) -> LoadReport
    where
        F: FnMut(&LoadError),
    {
        let mut report = LoadReport::default();
        log::debug!("Processing load queue of {} items", requests.len());
        for request in requests {
            if let Err(error) = self.load(request).await {
                on_error(&error);
                report.failed.push(error);
            }
        }
        report.loaded = self.loaded_names();
        report
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.tracked.read().nodes.contains_key(name)
    }

    pub fn node_for(&self, name: &str) -> Option<NodeId> {
        self.tracked.read().nodes.get(name).copied()
    }

    /// Names of loaded nodes in load order
    pub fn loaded_names(&self) -> Vec<String> {
        self.tracked.read().order.clone()
    }

    /// Failures recorded since the last successful load of each item
    pub fn failures(&self) -> Vec<LoadError> {
        self.failures.read().clone()
    }

    /// Detach a loaded node and forget it; `false` if the name is not tracked
    pub fn remove(&self, name: &str) -> Result<bool, SceneError> {
        let node = self.node_for(name);
        let Some(node) = node else {
            return Ok(false);
        };

        match self.scene.remove_child(None, node) {
            Ok(()) | Err(SceneError::UnknownNode(_)) => {}
            Err(err) => return Err(err),
        }

        let mut tracked = self.tracked.write();
        tracked.nodes.remove(name);
        tracked.order.retain(|n| n != name);
        log::debug!("Removed {name}");
        Ok(true)
    }

    /// Detach every loaded node and drop all recorded state
    pub fn clear(&self) {
        let tracked = std::mem::take(&mut *self.tracked.write());
        for name in &tracked.order {
            if let Some(&node) = tracked.nodes.get(name) {
                if let Err(err) = self.scene.remove_child(None, node) {
                    log::debug!("Could not detach {name}: {err}");
                }
            }
        }
        self.failures.write().clear();
    }

    fn dedup_hit(&self, name: &str) -> Option<NodeId> {
        let node = self.node_for(name)?;
        self.metrics.record_dedup_hit();
        log::debug!("{name} already loaded");
        Some(node)
    }

    fn track(&self, name: &str, node: NodeId) {
        let mut tracked = self.tracked.write();
        if tracked.nodes.insert(name.to_string(), node).is_none() {
            tracked.order.push(name.to_string());
        }
        drop(tracked);
        self.failures.write().retain(|e| e.name != name);
    }

    fn emit(&self, name: &str, update: ProgressUpdate, detail: impl Into<String>) {
        if let Some(callback) = &self.on_progress {
            callback(&ProgressEvent {
                name: name.to_string(),
                update,
                detail: detail.into(),
            });
        }
    }

    async fn materialize(&self, name: &str, request: &LoadRequest) -> Result<NodeId, LoadErrorKind> {
        let key = request.location.key();
        self.emit(name, ProgressUpdate::Stage(LoadStage::Start), key);

        let report = |progress: TransferProgress| {
            if let Some(percent) = progress.percent() {
                self.emit(name, ProgressUpdate::Percent(percent), key);
            }
        };
        let bytes = self.fetcher.fetch(&request.location, &report).await?;
        self.metrics.record_fetch(bytes.len());

        self.emit(
            name,
            ProgressUpdate::Stage(LoadStage::Parsing),
            format!("{} bytes", bytes.len()),
        );
        let root = match request.asset {
            AssetRequest::Model => self.build_model(name, request, &bytes)?,
            AssetRequest::Image(style) => self.build_image(name, request, style, &bytes)?,
        };
        self.attach(None, root)?;
        Ok(root)
    }

    /// Attach a freshly built node, disposing of it if the scene refuses
    fn attach(&self, parent: Option<NodeId>, child: NodeId) -> Result<(), SceneError> {
        self.scene.add_child(parent, child).map_err(|err| {
            self.scene.dispose_node(child);
            err
        })
    }

    /// Attach a part under a root that is not in the scene yet
    fn attach_part(&self, root: NodeId, part: NodeId) -> Result<(), SceneError> {
        self.attach(Some(root), part).map_err(|err| {
            self.scene.dispose_node(root);
            err
        })
    }

    fn create_root(&self, name: &str, request: &LoadRequest) -> NodeId {
        let mut desc = NodeDesc::group(name).with_transform(request.options.transform);
        if let Some(object_id) = &request.options.object_id {
            desc = desc.with_object_id(object_id.clone());
        }
        self.scene.create_node(desc)
    }

    fn build_model(
        &self,
        name: &str,
        request: &LoadRequest,
        bytes: &[u8],
    ) -> Result<NodeId, LoadErrorKind> {
        let format = request
            .options
            .format
            .as_deref()
            .unwrap_or(&self.config.default_model_format);
        let model = self
            .model_loader
            .load(bytes, format)
            .map_err(|e| LoadErrorKind::Model(e.to_string()))?;

        // Center on the origin and fit the largest extent to the display size
        let scale = model.normalization_scale(self.config.model_size);
        let offset = -model.bounds.center() * scale;
        log::debug!(
            "{name}: {} meshes, {} vertices, scale {scale}",
            model.meshes.len(),
            model.vertex_count()
        );

        let root = self.create_root(name, request);
        let content = self.scene.create_node(
            NodeDesc::new(format!("{name}/model"), NodeContent::Model(Arc::new(model)))
                .with_transform(NodeTransform::at(offset).with_uniform_scale(scale)),
        );
        self.attach_part(root, content)?;
        Ok(root)
    }

    fn build_image(
        &self,
        name: &str,
        request: &LoadRequest,
        style: ImageStyle,
        bytes: &[u8],
    ) -> Result<NodeId, LoadErrorKind> {
        let texture = self
            .texture_loader
            .load(bytes)
            .map_err(|e| LoadErrorKind::Image(e.to_string()))?;
        let height = self.config.image_height;
        let width = height * texture.aspect();

        let root = self.create_root(name, request);
        for part in style::recipe(style, Arc::new(texture), width, height) {
            let child = self.scene.create_node(
                NodeDesc::new(format!("{name}/{}", part.role), part.content)
                    .with_transform(NodeTransform::at(part.offset)),
            );
            self.attach_part(root, child)?;
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetcher;
    use crate::graph::{MemoryScene, SceneNode};
    use crate::model::fixtures::triangle_glb;
    use crate::texture::fixtures::png;
    use parking_lot::Mutex as SyncMutex;

    fn setup() -> (Arc<MemoryScene>, Arc<MockFetcher>, AssetMaterializer) {
        let scene = Arc::new(MemoryScene::new());
        let fetcher = Arc::new(MockFetcher::new());
        let materializer = AssetMaterializer::new(scene.clone(), fetcher.clone());
        (scene, fetcher, materializer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_node_is_normalized() {
        let (scene, fetcher, materializer) = setup();
        fetcher.insert_blob("b1", triangle_glb(3.0));

        let options = LoadOptions::new("Tri")
            .with_object_id("0x00000000deadbeef")
            .with_group("Sculpture");
        let root = materializer
            .load_model(ResourceLocation::Blob("b1".into()), options)
            .await
            .unwrap();

        let node = scene.node(root).unwrap();
        assert_eq!(node.desc.name, "Sculpture_Tri_deadbeef");
        assert_eq!(node.desc.object_id.as_deref(), Some("0x00000000deadbeef"));
        assert_eq!(node.children.len(), 1);

        let content = scene.node(node.children[0]).unwrap();
        assert_eq!(content.desc.content.kind(), "model");
        assert!((content.desc.transform.scale.x - 0.5).abs() < 1e-5);
        assert_eq!(materializer.loaded_names(), vec!["Sculpture_Tri_deadbeef"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_node_follows_aspect_and_style() {
        let (scene, fetcher, materializer) = setup();
        fetcher.insert_url("http://x/y.png", png(4, 2));

        let root = materializer
            .load_image(
                ResourceLocation::Url("http://x/y.png".into()),
                ImageStyle::Canvas,
                LoadOptions::new("Poster").with_object_id("0x01"),
            )
            .await
            .unwrap();

        let node = scene.node(root).unwrap();
        let names: Vec<String> = node
            .children
            .iter()
            .map(|c| scene.node(*c).unwrap().desc.name)
            .collect();
        assert_eq!(
            names,
            vec!["image_Poster_0x01/backing", "image_Poster_0x01/image", "image_Poster_0x01/border"]
        );

        let image = scene.node(node.children[1]).unwrap();
        assert!(matches!(
            image.desc.content,
            NodeContent::Plane { width, height, .. } if width == 3.0 && height == 1.5
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_load_is_noop() {
        let (scene, fetcher, materializer) = setup();
        fetcher.insert_blob("b1", triangle_glb(1.0));

        let options = LoadOptions::new("A").with_object_id("id-1");
        let first = materializer
            .load_model(ResourceLocation::Blob("b1".into()), options.clone())
            .await
            .unwrap();
        let second = materializer
            .load_model(ResourceLocation::Blob("b1".into()), options)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.fetches_of("b1"), 1);
        assert_eq!(scene.roots().len(), 1);
        assert_eq!(materializer.metrics().dedup_hits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_recorded_and_cleared_on_success() {
        let (_scene, fetcher, materializer) = setup();
        fetcher.insert_blob("bad", b"not a model".to_vec());

        let options = LoadOptions::new("Broken").with_object_id("id-2");
        let err = materializer
            .load_model(ResourceLocation::Blob("bad".into()), options.clone())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::Model(_)));
        assert_eq!(err.object_id.as_deref(), Some("id-2"));
        assert_eq!(materializer.failures().len(), 1);

        fetcher.insert_blob("bad", triangle_glb(1.0));
        materializer
            .load_model(ResourceLocation::Blob("bad".into()), options)
            .await
            .unwrap();
        assert!(materializer.failures().is_empty());
    }

    /// Scene that refuses attachments below the root, or at the root
    struct RefusingScene {
        inner: MemoryScene,
        refuse_roots: bool,
    }

    impl SceneGraph for RefusingScene {
        fn create_node(&self, desc: NodeDesc) -> NodeId {
            self.inner.create_node(desc)
        }

        fn add_child(&self, parent: Option<NodeId>, child: NodeId) -> Result<(), SceneError> {
            if parent.is_some() != self.refuse_roots {
                return Err(SceneError::AlreadyAttached(child));
            }
            self.inner.add_child(parent, child)
        }

        fn remove_child(&self, parent: Option<NodeId>, child: NodeId) -> Result<(), SceneError> {
            self.inner.remove_child(parent, child)
        }

        fn dispose_node(&self, node: NodeId) {
            self.inner.dispose_node(node)
        }

        fn set_transform(&self, node: NodeId, transform: NodeTransform) -> Result<(), SceneError> {
            self.inner.set_transform(node, transform)
        }

        fn transform(&self, node: NodeId) -> Option<NodeTransform> {
            self.inner.transform(node)
        }

        fn traverse(&self, visit: &mut dyn FnMut(NodeId, &SceneNode)) {
            self.inner.traverse(visit)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_attach_leaves_nothing_behind() {
        for refuse_roots in [false, true] {
            let scene = Arc::new(RefusingScene {
                inner: MemoryScene::new(),
                refuse_roots,
            });
            let fetcher = Arc::new(MockFetcher::new());
            fetcher.insert_blob("b1", triangle_glb(1.0));
            fetcher.insert_url("http://x/y.png", png(2, 2));
            let materializer = AssetMaterializer::new(scene.clone(), fetcher);

            let err = materializer
                .load_model(ResourceLocation::Blob("b1".into()), LoadOptions::new("M"))
                .await
                .unwrap_err();
            assert!(matches!(err.kind, LoadErrorKind::Scene(_)));

            let err = materializer
                .load_image(
                    ResourceLocation::Url("http://x/y.png".into()),
                    ImageStyle::Floating,
                    LoadOptions::new("I"),
                )
                .await
                .unwrap_err();
            assert!(matches!(err.kind, LoadErrorKind::Scene(_)));

            assert_eq!(scene.inner.allocated(), 0, "refuse_roots = {refuse_roots}");
            assert!(materializer.loaded_names().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_reports_percent_then_stages() {
        let scene = Arc::new(MemoryScene::new());
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.insert_blob("b1", triangle_glb(1.0));
        let events = Arc::new(SyncMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let materializer = AssetMaterializer::new(scene, fetcher)
            .with_progress(move |event| sink.lock().push(event.update));

        materializer
            .load_model(ResourceLocation::Blob("b1".into()), LoadOptions::new("A"))
            .await
            .unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                ProgressUpdate::Stage(LoadStage::Start),
                ProgressUpdate::Percent(25),
                ProgressUpdate::Percent(50),
                ProgressUpdate::Percent(75),
                ProgressUpdate::Percent(100),
                ProgressUpdate::Stage(LoadStage::Parsing),
                ProgressUpdate::Stage(LoadStage::Done),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stages_only_without_totals() {
        let scene = Arc::new(MemoryScene::new());
        let fetcher = Arc::new(MockFetcher::new().without_totals());
        fetcher.insert_blob("b1", triangle_glb(1.0));
        let events = Arc::new(SyncMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let materializer = AssetMaterializer::new(scene, fetcher)
            .with_progress(move |event| sink.lock().push(event.update));

        materializer
            .load_model(ResourceLocation::Blob("b1".into()), LoadOptions::new("A"))
            .await
            .unwrap();

        assert!(events
            .lock()
            .iter()
            .all(|u| matches!(u, ProgressUpdate::Stage(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_and_clear() {
        let (scene, fetcher, materializer) = setup();
        fetcher.insert_blob("b1", triangle_glb(1.0));
        fetcher.insert_blob("b2", triangle_glb(1.0));

        materializer
            .load_model(ResourceLocation::Blob("b1".into()), LoadOptions::new("A"))
            .await
            .unwrap();
        materializer
            .load_model(ResourceLocation::Blob("b2".into()), LoadOptions::new("B"))
            .await
            .unwrap();
        assert_eq!(materializer.loaded_names(), vec!["model_b1", "model_b2"]);

        assert!(materializer.remove("model_b1").unwrap());
        assert!(!materializer.remove("model_b1").unwrap());
        assert_eq!(materializer.loaded_names(), vec!["model_b2"]);
        assert_eq!(scene.roots().len(), 1);

        materializer.clear();
        assert!(materializer.loaded_names().is_empty());
        assert!(scene.roots().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_between_items() {
        let (_scene, fetcher, materializer) = setup();
        fetcher.insert_blob("b1", triangle_glb(1.0));
        fetcher.insert_blob("b2", triangle_glb(1.0));

        let requests = vec![
            LoadRequest::model(ResourceLocation::Blob("b1".into()), LoadOptions::new("A")),
            LoadRequest::model(ResourceLocation::Blob("b2".into()), LoadOptions::new("B")),
        ];
        let report = materializer.load_queue(requests, |_| {}).await;
        assert!(report.is_complete());

        let windows = fetcher.windows();
        let gap = windows[1].started - windows[0].finished;
        assert!(gap >= Duration::from_millis(100));
    }
}
