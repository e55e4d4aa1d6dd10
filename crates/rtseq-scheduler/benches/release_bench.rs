//! Benchmarks for the release path and per-execution bookkeeping.

use criterion::{Criterion, criterion_group, criterion_main};
use rtseq_scheduler::{ReleaseMode, StatisticsTracker, release_channel};
use std::hint::black_box;
use std::time::{Duration, Instant};

fn bench_release_accumulate(c: &mut Criterion) {
    let (signal, waiter) = release_channel(ReleaseMode::Accumulate);

    c.bench_function("release_then_acquire_accumulate", |b| {
        b.iter(|| {
            black_box(signal.release());
            black_box(waiter.try_acquire());
        });
    });
}

fn bench_release_coalesced(c: &mut Criterion) {
    let (signal, _waiter) = release_channel(ReleaseMode::Coalesce);
    signal.release();

    // Pending credit is already at one, so every call takes the drop path.
    c.bench_function("release_coalesced", |b| {
        b.iter(|| {
            black_box(signal.release());
        });
    });
}

fn bench_tracker_record(c: &mut Criterion) {
    let mut tracker = StatisticsTracker::new(Duration::from_millis(1));
    let mut start = Instant::now();

    c.bench_function("tracker_record_start_and_execution", |b| {
        b.iter(|| {
            start += Duration::from_millis(1);
            black_box(tracker.record_start(black_box(start)));
            black_box(tracker.record_execution(black_box(Duration::from_micros(120))));
        });
    });
}

fn bench_tracker_report(c: &mut Criterion) {
    let mut tracker = StatisticsTracker::new(Duration::from_millis(1));
    for i in 0..1_000u64 {
        tracker.record_execution(Duration::from_micros(i % 900));
    }

    c.bench_function("tracker_report", |b| {
        b.iter(|| {
            black_box(tracker.report(black_box("camera")));
        });
    });
}

criterion_group!(
    benches,
    bench_release_accumulate,
    bench_release_coalesced,
    bench_tracker_record,
    bench_tracker_report
);
criterion_main!(benches);
