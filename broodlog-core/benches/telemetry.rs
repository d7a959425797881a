use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use broodlog_core::constants::MAX_DATA_POINTS;
use broodlog_core::persist::{MemorySnapshot, NoYield, SnapshotStore};
use broodlog_core::reading::Reading;
use broodlog_core::summary::Summary;
use broodlog_core::HistoryBuffer;

fn full_history() -> HistoryBuffer<MAX_DATA_POINTS> {
    let mut history = HistoryBuffer::new();
    for i in 0..MAX_DATA_POINTS as u32 {
        history.push(Reading::new(
            1_700_000_000 + i * 3_600,
            99.0 + (i % 10) as f32 * 0.1,
            50.0 + (i % 7) as f32 * 0.5,
        ));
    }
    history
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("history");
    group.throughput(Throughput::Elements(1));
    group.bench_function("append_at_capacity", |b| {
        let mut history = full_history();
        let mut ts = 1_710_000_000u32;
        b.iter(|| {
            ts = ts.wrapping_add(3_600);
            history.push(black_box(Reading::new(ts, 99.5, 54.3)));
        })
    });
    group.finish();
}

fn bench_summaries(c: &mut Criterion) {
    let history = full_history();
    let now = 1_700_000_000 + MAX_DATA_POINTS as u32 * 3_600;

    let mut group = c.benchmark_group("summary");
    group.throughput(Throughput::Elements(MAX_DATA_POINTS as u64));
    group.bench_function("last_day", |b| {
        b.iter(|| black_box(Summary::last_day(history.iter(), black_box(now))))
    });
    group.bench_function("all_time", |b| {
        b.iter(|| black_box(Summary::over(history.iter())))
    });
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let history = full_history();

    let mut group = c.benchmark_group("snapshot");
    group.throughput(Throughput::Elements(MAX_DATA_POINTS as u64));
    group.bench_function("save_full", |b| {
        b.iter(|| {
            let mut store = MemorySnapshot::new();
            store
                .save(&mut history.iter().copied(), &mut NoYield)
                .unwrap();
            black_box(store)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_append, bench_summaries, bench_snapshot);
criterion_main!(benches);
