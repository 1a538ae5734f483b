//! Integration tests for the asset materializer queue

mod common;

use std::sync::Arc;
use std::time::Duration;

use gallery_scene::{
    AssetMaterializer, ImageStyle, LoadErrorKind, LoadOptions, LoadRequest, MaterializerConfig,
    MemoryScene, MockFetcher, ResourceLocation, SceneGraph,
};

use common::{png, triangle_glb};

fn blob(id: &str) -> ResourceLocation {
    ResourceLocation::Blob(id.to_string())
}

fn setup() -> (Arc<MemoryScene>, Arc<MockFetcher>, AssetMaterializer) {
    let scene = Arc::new(MemoryScene::new());
    let fetcher = Arc::new(MockFetcher::new().with_latency(Duration::from_millis(40)));
    for id in ["blob-a", "blob-b", "blob-c"] {
        fetcher.insert_blob(id, triangle_glb(2.0));
    }
    let materializer = AssetMaterializer::new(scene.clone(), fetcher.clone());
    (scene, fetcher, materializer)
}

#[tokio::test(start_paused = true)]
async fn test_same_name_fetches_once() {
    let (scene, fetcher, materializer) = setup();
    let options = LoadOptions::new("Statue").with_object_id("0xaaaa0001");

    let (first, second) = futures::join!(
        materializer.load_model(blob("blob-a"), options.clone()),
        materializer.load_model(blob("blob-a"), options),
    );

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(fetcher.fetches_of("blob-a"), 1);
    assert_eq!(scene.roots().len(), 1);
    assert_eq!(materializer.loaded_names(), vec!["model_Statue_aaaa0001"]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_loads_do_not_overlap() {
    let (_scene, fetcher, materializer) = setup();

    let (a, b, c) = futures::join!(
        materializer.load_model(blob("blob-a"), LoadOptions::new("A").with_object_id("1")),
        materializer.load_model(blob("blob-b"), LoadOptions::new("B").with_object_id("2")),
        materializer.load_model(blob("blob-c"), LoadOptions::new("C").with_object_id("3")),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    let windows = fetcher.windows();
    assert_eq!(windows.len(), 3);
    for (i, left) in windows.iter().enumerate() {
        for right in &windows[i + 1..] {
            assert!(!left.overlaps(right), "{} overlaps {}", left.key, right.key);
        }
    }
    assert_eq!(fetcher.max_concurrent(), 1);

    let order: Vec<&str> = windows.iter().map(|w| w.key.as_str()).collect();
    assert_eq!(order, vec!["blob-a", "blob-b", "blob-c"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_item_does_not_stop_queue() {
    let (_scene, fetcher, materializer) = setup();
    fetcher.fail("blob-b");

    let requests = vec![
        LoadRequest::model(blob("blob-a"), LoadOptions::new("A").with_object_id("id-a")),
        LoadRequest::model(blob("blob-b"), LoadOptions::new("B").with_object_id("id-b")),
        LoadRequest::model(blob("blob-c"), LoadOptions::new("C").with_object_id("id-c")),
    ];

    let mut reported = Vec::new();
    let report = materializer
        .load_queue(requests, |err| reported.push(err.name.clone()))
        .await;

    assert_eq!(report.loaded, vec!["model_A_id-a", "model_C_id-c"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].object_id.as_deref(), Some("id-b"));
    assert_eq!(report.failed[0].source_key, "blob-b");
    assert!(matches!(report.failed[0].kind, LoadErrorKind::Fetch(_)));
    assert_eq!(reported, vec!["model_B_id-b"]);
    assert_eq!(materializer.failures(), report.failed);
}

#[tokio::test(start_paused = true)]
async fn test_oversized_blob_is_isolated() {
    let scene = Arc::new(MemoryScene::new());
    let fetcher = Arc::new(MockFetcher::new().with_gateway(
        gallery_scene::GatewayConfig::default().with_max_blob_bytes(64),
    ));
    fetcher.insert_blob("huge", vec![0u8; 65]);
    fetcher.insert_blob("small", triangle_glb(1.0));
    let materializer = AssetMaterializer::with_config(
        scene,
        fetcher,
        MaterializerConfig::default().with_inter_item_pause(Duration::ZERO),
    );

    let report = materializer
        .load_queue(
            vec![
                LoadRequest::model(blob("huge"), LoadOptions::new("Huge")),
                LoadRequest::image(
                    ResourceLocation::Url("http://x/missing.png".into()),
                    ImageStyle::Flat,
                    LoadOptions::new("Missing"),
                ),
            ],
            |_| {},
        )
        .await;

    assert!(report.loaded.is_empty());
    assert_eq!(report.failed.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_mixed_models_and_images() {
    let (scene, fetcher, materializer) = setup();
    fetcher.insert_url("https://cdn.example/art.png", png(3, 2));

    let requests = vec![
        LoadRequest::model(blob("blob-a"), LoadOptions::new("A").with_object_id("id-a")),
        LoadRequest::image(
            ResourceLocation::Url("https://cdn.example/art.png".into()),
            ImageStyle::Floating,
            LoadOptions::new("Art").with_object_id("id-art").with_group("Prints"),
        ),
    ];
    let report = materializer.load_queue(requests, |_| {}).await;
    assert!(report.is_complete());

    let art = scene.find_by_object_id("id-art").unwrap();
    let node = scene.node(art).unwrap();
    assert_eq!(node.desc.name, "Prints_Art_id-art");
    assert_eq!(node.children.len(), 3);
    assert!(scene.find_by_name("Prints_Art_id-art/shadow").is_some());
}
