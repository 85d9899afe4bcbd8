//! Dentry facade benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use metakv_core::{LogIndex, RevisionedStore};
use metakv_dentry::{Dentry, DentryFlags, DentryManager, DentryVec, FileType};
use std::sync::Arc;

fn manager_with_children(count: usize) -> DentryManager {
    let manager = DentryManager::new(Arc::new(RevisionedStore::open_in_memory().unwrap()));
    for i in 0..count {
        let dentry = Dentry::new(1, 1, format!("file-{i:06}"), i as u64 + 2, 0, FileType::File);
        manager.create_dentry(&dentry, LogIndex::new(i as u64 + 1));
    }
    manager
}

/// Benchmark the CBOR codec for dentry vectors.
fn bench_dentry_vec_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("dentry_vec_codec");

    for versions in [1, 8, 64].iter() {
        let vec: DentryVec = (0..*versions)
            .map(|tx| Dentry::new(1, 1, "name", 7, tx, FileType::File))
            .collect();
        let bytes = vec.encode().unwrap();

        group.bench_with_input(BenchmarkId::new("encode", versions), &vec, |b, vec| {
            b.iter(|| black_box(vec.encode().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", versions), &bytes, |b, bytes| {
            b.iter(|| black_box(DentryVec::decode(black_box(bytes)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark name lookups.
fn bench_get_dentry(c: &mut Criterion) {
    let manager = manager_with_children(5_000);
    let query = Dentry::new(1, 1, "file-002500", 0, 0, FileType::File);
    c.bench_function("get_dentry", |b| {
        b.iter(|| black_box(manager.get_dentry(black_box(&query)).unwrap()))
    });
}

/// Benchmark directory listings by page size.
fn bench_list_dentry(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_dentry");
    let manager = manager_with_children(5_000);
    let query = Dentry::new(1, 1, "", 0, 0, FileType::File);

    for limit in [10, 100, 0].iter() {
        let elements = if *limit == 0 { 5_000 } else { *limit as u64 };
        group.throughput(Throughput::Elements(elements));
        group.bench_with_input(BenchmarkId::from_parameter(limit), limit, |b, &limit| {
            b.iter(|| black_box(manager.list_dentry(&query, limit, false).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark rename transactions.
fn bench_rename(c: &mut Criterion) {
    c.bench_function("handle_rename_tx", |b| {
        let manager = manager_with_children(0);
        let mut index = 0u64;
        b.iter(|| {
            index += 2;
            let src = Dentry::new(1, 1, "src", 9, index, FileType::File);
            manager.create_dentry(&src, LogIndex::new(index));
            let moves = [
                src.with_flags(DentryFlags::DELETE_MARK),
                Dentry::new(1, 2, "dst", 9, index, FileType::File),
            ];
            black_box(manager.handle_rename_tx(&moves, LogIndex::new(index + 1)));
        });
    });
}

criterion_group!(
    benches,
    bench_dentry_vec_codec,
    bench_get_dentry,
    bench_list_dentry,
    bench_rename,
);
criterion_main!(benches);
