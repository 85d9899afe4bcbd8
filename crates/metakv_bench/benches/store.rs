//! Revisioned store benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use metakv_bench::{generate_pairs, random_data};
use metakv_core::{Config, LogIndex, Mutation, RevisionedStore};
use tempfile::TempDir;

fn populated(count: usize) -> RevisionedStore {
    let store = RevisionedStore::open_in_memory().unwrap();
    for (key, value) in generate_pairs(count, 64) {
        store.put(&key, &value).unwrap();
    }
    store
}

/// Benchmark single-key puts against the in-memory log.
fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");

    for size in [16, 256, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let store = RevisionedStore::open_in_memory().unwrap();
            let value = random_data(size);
            let mut i = 0u64;

            b.iter(|| {
                i += 1;
                let key = format!("key-{}", i % 1024);
                black_box(store.put(key.as_bytes(), black_box(&value)).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark puts that sync a file-backed log on every commit.
fn bench_put_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_file");
    group.sample_size(20);

    for sync in [true, false] {
        group.bench_with_input(BenchmarkId::new("sync_on_commit", sync), &sync, |b, &sync| {
            let temp_dir = TempDir::new().unwrap();
            let store = RevisionedStore::open_with_config(
                temp_dir.path(),
                Config::new().sync_on_commit(sync),
            )
            .unwrap();
            let value = random_data(128);

            b.iter(|| black_box(store.put(b"hot-key", &value).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark latest and snapshot point reads.
fn bench_get(c: &mut Criterion) {
    let store = populated(10_000);
    let middle = store.current_revision();
    for (key, value) in generate_pairs(10_000, 64) {
        store.put(&key, &value).unwrap();
    }

    c.bench_function("get_latest", |b| {
        b.iter(|| black_box(store.get(black_box(b"key-00005000")).unwrap()))
    });
    c.bench_function("get_at_revision", |b| {
        b.iter(|| black_box(store.get_at(black_box(b"key-00005000"), middle).unwrap()))
    });
}

/// Benchmark bounded range reads.
fn bench_list_bounded(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_bounded");
    let store = populated(10_000);
    let ceiling = store.current_revision();

    for limit in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*limit as u64));
        group.bench_with_input(BenchmarkId::from_parameter(limit), limit, |b, &limit| {
            b.iter(|| {
                let page = store
                    .list_bounded(b"key-00001000", b"key-99999999", limit, ceiling)
                    .unwrap();
                black_box(page);
            });
        });
    }

    group.finish();
}

/// Benchmark the apply gate, fresh and duplicate.
fn bench_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_gate");

    group.bench_function("fresh_index", |b| {
        let store = RevisionedStore::open_in_memory().unwrap();
        let gate = store.gate();
        let mut index = 0u64;
        b.iter(|| {
            index += 1;
            black_box(gate.put(LogIndex::new(index), b"k", b"v").unwrap());
        });
    });

    group.bench_function("duplicate_index", |b| {
        let store = RevisionedStore::open_in_memory().unwrap();
        let gate = store.gate();
        gate.put(LogIndex::new(1_000_000), b"k", b"v").unwrap();
        b.iter(|| black_box(gate.put(LogIndex::new(5), b"k", b"v").unwrap()));
    });

    group.finish();
}

/// Benchmark coordinated transactions by step count.
fn bench_coordinator(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinator");

    for steps in [2, 8, 32].iter() {
        group.throughput(Throughput::Elements(*steps as u64));
        group.bench_with_input(BenchmarkId::from_parameter(steps), steps, |b, &steps| {
            let store = RevisionedStore::open_in_memory().unwrap();
            let coordinator = store.coordinator();
            let mutations: Vec<Mutation> = (0..steps)
                .map(|i| Mutation::put(format!("k{i}"), "v"))
                .collect();
            let mut index = 0u64;
            b.iter(|| {
                index += 1;
                black_box(coordinator.commit(LogIndex::new(index), &mutations).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark opening a store, which replays its commit log.
fn bench_recovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery");
    group.sample_size(10);

    for records in [1_000, 10_000].iter() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = RevisionedStore::open_with_config(
                temp_dir.path(),
                Config::new().sync_on_commit(false),
            )
            .unwrap();
            for (key, value) in generate_pairs(*records, 64) {
                store.put(&key, &value).unwrap();
            }
        }

        group.bench_with_input(BenchmarkId::from_parameter(records), records, |b, _| {
            b.iter(|| black_box(RevisionedStore::open(temp_dir.path()).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_put,
    bench_put_file,
    bench_get,
    bench_list_bounded,
    bench_gate,
    bench_coordinator,
    bench_recovery,
);
criterion_main!(benches);
