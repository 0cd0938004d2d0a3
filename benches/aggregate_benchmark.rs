use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rankstep::rankstep_core::{
    aggregate_parallel, aggregate_with, expand, group_by_key, AggregateOptions, CancellationFlag,
    DiagnosticLog, Expansion, RankEntry, TaggedRecord,
};

/// Ring-like graph where every page links to three others
fn build_records(pages: usize) -> Vec<TaggedRecord> {
    let mut records = Vec::with_capacity(pages * 4);
    for i in 0..pages {
        let line = format!("p{}\tp{},p{},p{}", i, (i + 1) % pages, (i * 7) % pages, (i * 31) % pages);
        if let Ok(Expansion::Edges(edges)) = expand(&line) {
            records.extend(edges.map(TaggedRecord::Edge));
        }
        records.push(TaggedRecord::Rank(RankEntry {
            page: format!("p{}", i),
            rank: 1.0,
        }));
    }
    records
}

/// Benchmark grouping throughput
fn bench_group_by_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_by_key");

    for size in [1_000, 10_000, 100_000].iter() {
        let records = build_records(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let groups = group_by_key(records.clone());
                criterion::black_box(groups.len());
            });
        });
    }
    group.finish();
}

/// Benchmark sequential vs parallel aggregation
fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let options = AggregateOptions::default();
    let cancel = CancellationFlag::new();

    for size in [1_000, 10_000, 100_000].iter() {
        let groups = group_by_key(build_records(*size));

        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, _| {
            b.iter(|| {
                let outputs = aggregate_with(&groups, &options, &DiagnosticLog::new()).unwrap();
                criterion::black_box(outputs.len());
            });
        });
        group.bench_with_input(BenchmarkId::new("parallel", size), size, |b, _| {
            b.iter(|| {
                let outputs =
                    aggregate_parallel(&groups, &options, &DiagnosticLog::new(), &cancel).unwrap();
                criterion::black_box(outputs.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_group_by_key, bench_aggregate);
criterion_main!(benches);
