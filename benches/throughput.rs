//! Throughput Benchmark for SpaceKV
//!
//! Measures space operations over the in-memory backend, so the numbers
//! reflect the expiry and search layer rather than disk I/O.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use spacekv::{MemoryBackend, Space};
use std::sync::Arc;
use tokio_test::block_on;

fn new_space() -> Space {
    Space::new(Arc::new(MemoryBackend::new()), "bench")
}

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let space = new_space();

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_plain", |b| {
        let mut i = 0u64;
        b.iter(|| {
            block_on(space.set(&format!("key:{}", i), "small_value", None)).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_with_expiry", |b| {
        let mut i = 0u64;
        b.iter(|| {
            block_on(space.set(&format!("ttl:{}", i), "small_value", Some(1.0))).unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark plain and strict reads
fn bench_get(c: &mut Criterion) {
    let space = new_space();

    // Pre-populate, half of the keys with an expiry
    block_on(async {
        for i in 0..10_000 {
            let expire = if i % 2 == 0 { Some(1.0) } else { None };
            space.set(&format!("key:{}", i), format!("value:{}", i), expire).await.unwrap();
        }
    });

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(block_on(space.get(&format!("key:{}", i % 10_000))).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_by_strict", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(block_on(space.get_by_strict(&format!("key:{}", i % 10_000))).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(block_on(space.get(&format!("missing:{}", i))).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark whole-namespace scans
fn bench_scan(c: &mut Criterion) {
    let space = new_space();

    block_on(async {
        for i in 0..1_000 {
            space.set(&format!("user:{}", i), i, Some(1.0)).await.unwrap();
            space.set(&format!("item:{}", i), i, None).await.unwrap();
        }
    });

    let mut group = c.benchmark_group("scan");

    group.bench_function("find_keys_prefix", |b| {
        let pattern = regex::Regex::new("^user:").unwrap();
        b.iter(|| {
            black_box(block_on(space.find_keys(&pattern)).unwrap());
        });
    });

    // Nothing is due, so this measures the marker scan alone
    group.bench_function("clean_nothing_due", |b| {
        b.iter(|| {
            black_box(block_on(space.clean_all_expire_data()).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_scan);
criterion_main!(benches);
