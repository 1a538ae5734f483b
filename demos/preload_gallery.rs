//! Preload a small gallery into a hidden scene
//!
//! Run with `RUST_LOG=debug` to see the materializer at work.

use std::sync::Arc;
use std::time::Duration;

use gallery_scene::{
    encode_descriptor, MaterializerConfig, MemoryLedger, MemorySceneFactory, MockFetcher,
    PreloadCoordinator, PreloadOptions, ResourceRef, SceneConfig, SceneGraph, SceneObject,
    SceneObjectType,
};
use serde_json::json;

const CONTAINER: &str = "0xgallery";

/// One-triangle GLB so the demo needs no asset files
fn triangle_glb() -> Vec<u8> {
    let bin: Vec<u8> = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        .iter()
        .flat_map(|f| f.to_le_bytes())
        .collect();
    let mut json = br#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":36}],"bufferViews":[{"buffer":0,"byteLength":36}],"accessors":[{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}],"meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],"nodes":[{"mesh":0}],"scenes":[{"nodes":[0]}],"scene":0}"#.to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Two collectibles, one of which was saved as displayed
    let items = vec![
        json!({"id": "0xa1", "name": "Statue", "blob_id": "blob-statue"}),
        json!({"id": "0xb2", "name": "Vase", "glb_url": "https://cdn.example/vase.glb"}),
    ];
    let saved = SceneConfig::new(vec![
        SceneObject::new("0xa1", "Statue", SceneObjectType::BlobModel)
            .with_resource(ResourceRef::blob("blob-statue"))
            .with_displayed(true),
        SceneObject::new("0xb2", "Vase", SceneObjectType::ExternalModel)
            .with_resource(ResourceRef::url("https://cdn.example/vase.glb")),
    ])
    .with_container(CONTAINER);

    let ledger = Arc::new(MemoryLedger::new());
    ledger.insert_dynamic_field(CONTAINER, "scene_config", json!(encode_descriptor(&saved)?));

    let fetcher = Arc::new(MockFetcher::new().with_latency(Duration::from_millis(50)));
    fetcher.insert_blob("blob-statue", triangle_glb());
    fetcher.insert_url("https://cdn.example/vase.glb", triangle_glb());

    let coordinator = PreloadCoordinator::new(Arc::new(MemorySceneFactory), fetcher, ledger);
    let options = PreloadOptions::new(CONTAINER, items).with_materializer_config(
        MaterializerConfig::default().with_inter_item_pause(Duration::from_millis(20)),
    );

    println!("gallery_scene v{}", gallery_scene::VERSION);
    let warmed = coordinator
        .run(
            options,
            |p| println!("[{:>3}%] {} {}", p.percent, p.stage.label(), p.detail),
            |e| eprintln!("failed: {e}"),
        )
        .await?;

    println!("Restored saved scene: {}", warmed.restored);
    println!("Loaded nodes: {:?}", warmed.loaded_names);
    println!("Scene holds {} nodes", warmed.scene.node_count());
    Ok(())
}
