// this_file: benches/chunker_benchmarks.rs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use prolly_json::{
    reassemble, serialize_json_to_addr, splice_json, ChunkConfig, JsonCursor, JsonPath,
    MemoryNodeStore, SpliceMode,
};
use serde_json::json;

fn array_of_size(n: u32) -> serde_json::Value {
    json!((0..n).map(|i| json!({"id": i, "name": format!("item-{i}")})).collect::<Vec<_>>())
}

fn bench_serialize_json_to_addr(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize_json_to_addr");
    let config = ChunkConfig::default();

    for &size in &[10u32, 1_000, 100_000] {
        let value = array_of_size(size);
        group.bench_with_input(BenchmarkId::new("array", size), &value, |b, value| {
            b.iter(|| {
                let store = MemoryNodeStore::new();
                serialize_json_to_addr(&config, &store, black_box(value))
            })
        });
    }
    group.finish();
}

fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassemble");
    let config = ChunkConfig::default();

    for &size in &[10u32, 1_000, 100_000] {
        let value = array_of_size(size);
        let store = MemoryNodeStore::new();
        let root = serialize_json_to_addr(&config, &store, &value).unwrap();
        group.bench_with_input(BenchmarkId::new("array", size), &root, |b, &root| {
            b.iter(|| reassemble(&store, black_box(root)))
        });
    }
    group.finish();
}

fn bench_splice_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("splice_json replace");
    let config = ChunkConfig::default();

    for &size in &[1_000u32, 100_000] {
        let value = array_of_size(size);
        let store = MemoryNodeStore::new();
        let root = serialize_json_to_addr(&config, &store, &value).unwrap();

        group.bench_with_input(BenchmarkId::new("array", size), &root, |b, &root| {
            b.iter(|| {
                let mut target = JsonPath::root();
                target.push_index(size / 2);
                target.push_key_placeholder();
                target.set_last_key("id".to_string());
                let cursor = JsonCursor::seek_value_start(&store, root, &target).unwrap();
                let replacement = json!(999_999);
                splice_json(
                    &config,
                    &store,
                    cursor,
                    SpliceMode::Replace,
                    None,
                    Some(black_box(&replacement)),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_serialize_json_to_addr,
    bench_reassemble,
    bench_splice_replace
);
criterion_main!(benches);
