//! Benchmark: Resource resolution over raw collectible records

use std::sync::Arc;

use gallery_scene::{
    CollectionConfigRegistry, CollectionFieldConfig, ResourceKind, ResourceResolver,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

fn records(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| match i % 3 {
            0 => json!({"id": format!("0x{i}"), "name": "Model", "blob_id": format!("blob-{i}")}),
            1 => json!({
                "id": format!("0x{i}"),
                "type": "0x9::prints::Print<0x2::sui::SUI>",
                "display": {"data": {"name": "Print", "art": format!("https://cdn/{i}.png")}}
            }),
            _ => json!({"id": format!("0x{i}"), "name": "Bare"}),
        })
        .collect()
}

fn resolver_perf_benchmark(c: &mut Criterion) {
    let registry = Arc::new(CollectionConfigRegistry::new());
    for n in 0..20 {
        registry.register(
            CollectionFieldConfig::new(format!("0x{n}::filler::Thing"))
                .with_url_fields(ResourceKind::Model3d, &["filler_url"]),
        );
    }
    registry.register(
        CollectionFieldConfig::new("0x9::prints::Print")
            .with_url_fields(ResourceKind::Image2d, &["art"])
            .with_priority(vec![ResourceKind::Image2d]),
    );
    let resolver = ResourceResolver::new(registry);
    let items = records(300);

    c.bench_function("extract_resource_info", |b| {
        b.iter(|| black_box(resolver.extract_resource_info(&items[1], None)))
    });

    c.bench_function("process_items_300", |b| {
        b.iter(|| black_box(resolver.process_items(&items)))
    });
}

criterion_group!(benches, resolver_perf_benchmark);
criterion_main!(benches);
