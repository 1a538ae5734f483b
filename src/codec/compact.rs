//! Short-key wire types for the persisted scene descriptor
//!
//! The field names are part of the on-chain format and must not change:
//!
//! ```text
//! { v, o: [ { i, n, d, p, r, s, b?, u?, f? } ], t, k? }
//! ```

use serde::{Deserialize, Serialize};

/// One scene object in compact form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactSceneObject {
    #[serde(rename = "i")]
    pub id: String,
    #[serde(rename = "n")]
    pub name: String,
    /// 0 or 1
    #[serde(rename = "d")]
    pub displayed: u8,
    #[serde(rename = "p")]
    pub position: [f32; 3],
    /// Radians
    #[serde(rename = "r")]
    pub rotation: [f32; 3],
    #[serde(rename = "s")]
    pub scale: f32,
    #[serde(rename = "b", default, skip_serializing_if = "Option::is_none")]
    pub blob_id: Option<String>,
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Omitted when equal to the default model format
    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// The whole descriptor in compact form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactSceneConfig {
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(rename = "o")]
    pub objects: Vec<CompactSceneObject>,
    /// Milliseconds since the unix epoch
    #[serde(rename = "t")]
    pub updated_at: u64,
    #[serde(rename = "k", default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}
