//! Load progress reporting
//!
//! Transfers that expose byte counts report an integer percentage; every load
//! also reports its discrete lifecycle stages.

use std::sync::Arc;

/// Lifecycle stage of one load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Fetch is about to start
    Start,
    /// Bytes arrived, decoding
    Parsing,
    /// Node is in the scene
    Done,
    /// Load failed; see the recorded error
    Failed,
}

/// Either a byte-based percentage or a stage transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    Percent(u8),
    Stage(LoadStage),
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Derived node name of the asset
    pub name: String,
    pub update: ProgressUpdate,
    pub detail: String,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.update,
            ProgressUpdate::Stage(LoadStage::Done | LoadStage::Failed)
        )
    }

    /// Progress as a fraction (0.0 to 1.0), when one can be derived
    pub fn fraction(&self) -> Option<f32> {
        match self.update {
            ProgressUpdate::Percent(p) => Some(f32::from(p) / 100.0),
            ProgressUpdate::Stage(LoadStage::Start) => Some(0.0),
            ProgressUpdate::Stage(LoadStage::Done) => Some(1.0),
            ProgressUpdate::Stage(_) => None,
        }
    }
}

/// Callback receiving progress events
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
