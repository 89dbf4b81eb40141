//! Benchmarks for per-call bridge overhead

use asyncr::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_direct_block_on(c: &mut Criterion) {
    let scheduler = get_scheduler().unwrap();

    c.bench_function("direct_block_on", |b| {
        b.iter(|| {
            scheduler
                .run_until_complete(async { black_box(21u64) * 2 })
                .unwrap()
        });
    });
}

fn bench_as_sync(c: &mut Criterion) {
    let double = as_sync(|x: u64| async move { x * 2 });

    c.bench_function("as_sync", |b| {
        b.iter(|| double.call((black_box(21u64),)).unwrap());
    });
}

fn bench_as_sync_nested(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let double = as_sync(|x: u64| async move { x * 2 });

    c.bench_function("as_sync_nested", |b| {
        b.iter(|| runtime.block_on(async { double.call((black_box(21u64),)).unwrap() }));
    });
}

fn bench_as_async_scheduler(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let double = as_async(|x: u64| x * 2);

    c.bench_function("as_async_scheduler", |b| {
        b.iter(|| runtime.block_on(double.call((black_box(21u64),))).unwrap());
    });
}

fn bench_as_async_pool(c: &mut Criterion) {
    let bridge = Bridge::new(Config::builder().offload(Offload::Pool).build().unwrap()).unwrap();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let double = bridge.as_async(|x: u64| x * 2);

    c.bench_function("as_async_pool", |b| {
        b.iter(|| runtime.block_on(double.call((black_box(21u64),))).unwrap());
    });
}

criterion_group!(
    benches,
    bench_direct_block_on,
    bench_as_sync,
    bench_as_sync_nested,
    bench_as_async_pool,
    bench_as_async_scheduler
);
criterion_main!(benches);
