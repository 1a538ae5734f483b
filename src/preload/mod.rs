//! Off-screen gallery warm-up
//!
//! [`PreloadCoordinator`] builds a hidden scene for a container before it is
//! shown: it reads the saved descriptor, seeds a [`TransformStore`], resolves
//! the container's collectibles and materializes the displayed ones. The
//! warmed result is cached until [`PreloadCoordinator::clear`] is called, and
//! only one run may be in flight at a time.

pub mod ledger;

pub use ledger::{read_descriptor, LedgerClient, MemoryLedger, SCENE_CONFIG_FIELD};

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

use crate::codec::decode_descriptor;
use crate::fetch::AssetFetcher;
use crate::graph::{SceneError, SceneFactory, SceneGraph};
use crate::materializer::{
    AssetMaterializer, ImageStyle, LoadError, LoadRequest, MaterializerConfig,
};
use crate::resolver::ResourceResolver;
use crate::scene::SceneConfig;
use crate::transform::TransformStore;

/// Error type for preload runs
///
/// Per-item failures never surface here; they go to the error callback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreloadError {
    #[error("A preload is already running")]
    AlreadyRunning,

    #[error("Cached gallery belongs to {cached}, not {requested}; clear it first")]
    OtherContainer { cached: String, requested: String },

    #[error("Could not create the hidden scene: {0}")]
    Scene(#[from] SceneError),
}

/// Coarse phase of a preload run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadStage {
    Starting,
    ReadingDescriptor,
    Resolving,
    Loading,
    Finished,
}

impl PreloadStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::ReadingDescriptor => "reading saved scene",
            Self::Resolving => "resolving items",
            Self::Loading => "loading assets",
            Self::Finished => "finished",
        }
    }
}

/// Milestone reported to the progress callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadProgress {
    pub percent: u8,
    pub stage: PreloadStage,
    pub detail: String,
}

/// Inputs of one run
#[derive(Debug, Clone)]
pub struct PreloadOptions {
    pub container_id: String,
    /// Raw collectible records held by the container
    pub items: Vec<Value>,
    pub image_style: ImageStyle,
    pub materializer: MaterializerConfig,
}

impl PreloadOptions {
    pub fn new(container_id: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            container_id: container_id.into(),
            items,
            image_style: ImageStyle::default(),
            materializer: MaterializerConfig::default(),
        }
    }

    pub fn with_image_style(mut self, style: ImageStyle) -> Self {
        self.image_style = style;
        self
    }

    pub fn with_materializer_config(mut self, config: MaterializerConfig) -> Self {
        self.materializer = config;
        self
    }
}

/// Hidden scene and state handed over after a run
pub struct WarmedScene {
    pub container_id: String,
    pub scene: Arc<dyn SceneGraph>,
    pub transforms: Arc<TransformStore>,
    /// Materializer bound to `scene`, for loads after hand-over
    pub materializer: Arc<AssetMaterializer>,
    /// Saved descriptor reconciled with the observed items, or fresh defaults
    pub config: SceneConfig,
    /// Whether a saved descriptor was found and decoded
    pub restored: bool,
    pub loaded_names: Vec<String>,
    pub failures: Vec<LoadError>,
}

enum RunState {
    Idle,
    Running,
    Done(Arc<WarmedScene>),
}

/// Resets the state to idle if a run is dropped before finishing
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
    armed: bool,
}

impl RunGuard<'_> {
    fn finish(mut self, warmed: Arc<WarmedScene>) {
        *self.state.lock() = RunState::Done(warmed);
        self.armed = false;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.state.lock() = RunState::Idle;
        }
    }
}

/// Single-flight gallery preloader
pub struct PreloadCoordinator {
    factory: Arc<dyn SceneFactory>,
    fetcher: Arc<dyn AssetFetcher>,
    ledger: Arc<dyn LedgerClient>,
    resolver: ResourceResolver,
    state: Mutex<RunState>,
}

impl PreloadCoordinator {
    pub fn new(
        factory: Arc<dyn SceneFactory>,
        fetcher: Arc<dyn AssetFetcher>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            factory,
            fetcher,
            ledger,
            resolver: ResourceResolver::default(),
            state: Mutex::new(RunState::Idle),
        }
    }

    /// Use a resolver with registered collection configs
    pub fn with_resolver(mut self, resolver: ResourceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), RunState::Running)
    }

    /// Result of the last completed run
    pub fn cached(&self) -> Option<Arc<WarmedScene>> {
        match &*self.state.lock() {
            RunState::Done(warmed) => Some(Arc::clone(warmed)),
            _ => None,
        }
    }

    /// Forget the cached result; a running preload is left alone
    pub fn clear(&self) {
        let mut state = self.state.lock();
        if matches!(*state, RunState::Done(_)) {
            *state = RunState::Idle;
        }
    }

    /// Warm up the gallery of `options.container_id`
    ///
    /// Returns the cached result if a run for the same container already
    /// completed. Fails if a run is in flight, the cache holds another
    /// container, or the hidden scene cannot be created.
    pub async fn run<P, E>(
        &self,
        options: PreloadOptions,
        mut on_progress: P,
        mut on_error: E,
    ) -> Result<Arc<WarmedScene>, PreloadError>
    where
        P: FnMut(PreloadProgress),
        E: FnMut(&LoadError),
    {
        let guard = {
            let mut state = self.state.lock();
            match &*state {
                RunState::Running => return Err(PreloadError::AlreadyRunning),
                RunState::Done(warmed) if warmed.container_id == options.container_id => {
                    return Ok(Arc::clone(warmed))
                }
                RunState::Done(warmed) => {
                    log::warn!(
                        "Preload for {} refused, cache holds {}",
                        options.container_id,
                        warmed.container_id
                    );
                    return Err(PreloadError::OtherContainer {
                        cached: warmed.container_id.clone(),
                        requested: options.container_id.clone(),
                    });
                }
                RunState::Idle => *state = RunState::Running,
            }
            RunGuard {
                state: &self.state,
                armed: true,
            }
        };

        let container_id = options.container_id.as_str();
        let mut report = |percent: u8, stage: PreloadStage, detail: String| {
            log::debug!("Preload {container_id}: {percent}% {}", stage.label());
            on_progress(PreloadProgress {
                percent,
                stage,
                detail,
            });
        };

        report(0, PreloadStage::Starting, container_id.to_string());
        let scene = self.factory.create()?;
        let materializer = Arc::new(AssetMaterializer::with_config(
            Arc::clone(&scene),
            Arc::clone(&self.fetcher),
            options.materializer.clone(),
        ));

        report(10, PreloadStage::ReadingDescriptor, container_id.to_string());
        let saved = self.read_saved_scene(container_id).await;
        let restored = saved.is_some();

        report(20, PreloadStage::Resolving, format!("{} items", options.items.len()));
        let processed = self.resolver.process_items(&options.items);
        let observed = self.resolver.observe_items(&options.items);
        let config = match saved {
            Some(mut config) => {
                if !options.items.is_empty() {
                    config.merge_observed(observed);
                }
                config
            }
            None => SceneConfig::default_for_items(observed).with_container(container_id),
        };

        let transforms = Arc::new(TransformStore::new(Arc::clone(&scene)));
        transforms.seed_from(&config);
        let displayed = config.displayed_ids();

        let requests: Vec<LoadRequest> = processed
            .iter()
            .filter(|item| displayed.contains(&item.id))
            .map(|item| {
                let mut request = LoadRequest::from_processed(item, options.image_style);
                if let Some(saved) = transforms.get(&item.id) {
                    request.options.transform = saved.to_node_transform();
                }
                request
            })
            .collect();

        let total = requests.len();
        let mut failures = Vec::new();
        for (index, request) in requests.into_iter().enumerate() {
            let percent = 30 + (60 * index / total.max(1)) as u8;
            report(percent, PreloadStage::Loading, request.options.display_name.clone());
            if let Err(error) = materializer.load(request).await {
                on_error(&error);
                failures.push(error);
            }
        }

        let loaded_names = materializer.loaded_names();
        report(
            100,
            PreloadStage::Finished,
            format!("{} loaded, {} failed", loaded_names.len(), failures.len()),
        );
        log::info!(
            "Preloaded {container_id}: {} of {total} displayed items",
            loaded_names.len()
        );

        let warmed = Arc::new(WarmedScene {
            container_id: container_id.to_string(),
            scene,
            transforms,
            materializer,
            config,
            restored,
            loaded_names,
            failures,
        });
        guard.finish(Arc::clone(&warmed));
        Ok(warmed)
    }

    /// Saved scene of a container; read and decode failures count as none
    async fn read_saved_scene(&self, container_id: &str) -> Option<SceneConfig> {
        let text = match read_descriptor(&*self.ledger, container_id).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                log::debug!("No saved scene for {container_id}");
                return None;
            }
            Err(err) => {
                log::warn!("Could not read saved scene for {container_id}: {err:#}");
                return None;
            }
        };

        match decode_descriptor(&text, None) {
            Ok(config) => Some(config),
            Err(err) => {
                log::warn!("Ignoring invalid saved scene for {container_id}: {err}");
                None
            }
        }
    }
}
