//! Benchmarks for the per-sample processing path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sensorscope::clock::{Clock, ManualClock};
use sensorscope::config::{AngularConfig, ThermalConfig};
use sensorscope::pipeline::{angular_loop, thermal_loop, DisplaySink, Snapshot, TimerQueue};
use sensorscope::processing::history::{ChannelHistory, HistoryBuffer};
use sensorscope::processing::unwrap::TurnCounter;
use sensorscope::types::VariableType;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn publish(&mut self, snapshot: &Snapshot) {
        black_box(snapshot);
    }
}

fn bench_turn_counter(c: &mut Criterion) {
    let mut group = c.benchmark_group("turn_counter");
    group.throughput(Throughput::Elements(1));

    let angles: Vec<f64> = (0..1000)
        .map(|i| (i as f64 * 0.37).rem_euclid(TAU) - TAU / 2.0)
        .collect();
    group.bench_function("update", |b| {
        let mut counter = TurnCounter::new();
        let mut i = 0usize;
        b.iter(|| {
            black_box(counter.update(black_box(angles[i % angles.len()])));
            i = i.wrapping_add(1);
        });
    });

    group.finish();
}

fn bench_history_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_push");

    for size in [300, 1000, 10_000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("push", size), size, |b, &size| {
            let mut buffer = HistoryBuffer::new(size);
            let mut i = 1u64;
            b.iter(|| {
                let _ = buffer.push(Duration::from_micros(i), black_box(i as f64));
                i += 1;
            });
        });
        group.bench_with_input(BenchmarkId::new("push_row", size), size, |b, &size| {
            let mut history = ChannelHistory::new(&["sine", "cosine", "angle_over_pi"], size);
            let mut i = 1u64;
            b.iter(|| {
                let v = i as f64;
                let _ = history.push_row(Duration::from_micros(i), black_box(&[v, -v, v * 0.5]));
                i += 1;
            });
        });
    }

    group.finish();
}

fn bench_plot_points(c: &mut Criterion) {
    let mut group = c.benchmark_group("plot_points");

    for size in [1000, 10_000].iter() {
        let mut buffer = HistoryBuffer::new(*size);
        for i in 1..=*size as u64 {
            let _ = buffer.push(Duration::from_micros(i), i as f64);
        }
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(
            BenchmarkId::new("as_plot_points", size),
            &buffer,
            |b, buffer| {
                b.iter(|| black_box(buffer.as_plot_points()));
            },
        );
    }

    group.finish();
}

fn bench_value_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_parsing");

    let bytes_u8 = [62u8];
    let bytes_f32 = 0.7071f32.to_le_bytes();

    group.bench_function("parse_u8", |b| {
        b.iter(|| black_box(VariableType::U8.parse_to_f64(black_box(&bytes_u8))));
    });
    group.bench_function("parse_f32", |b| {
        b.iter(|| black_box(VariableType::F32.parse_to_f64(black_box(&bytes_f32))));
    });

    group.finish();
}

fn bench_poll_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_cycle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("angular_demo", |b| {
        let clock = Arc::new(ManualClock::new());
        let mut timers = TimerQueue::new(clock.clone());
        let mut pl = angular_loop(
            &AngularConfig::default(),
            None,
            Box::new(NullDisplay),
            clock.clone(),
        );
        let period = pl.settings().period;
        pl.start_demo(&mut timers);
        b.iter(|| {
            clock.advance(period);
            while let Some(id) = timers.pop_due(clock.now()) {
                pl.on_timer(id, &mut timers);
            }
        });
    });

    group.bench_function("thermal_demo", |b| {
        let clock = Arc::new(ManualClock::new());
        let mut timers = TimerQueue::new(clock.clone());
        let mut pl = thermal_loop(
            &ThermalConfig::default(),
            None,
            Box::new(NullDisplay),
            clock.clone(),
        );
        let period = pl.settings().period;
        pl.start_demo(&mut timers);
        b.iter(|| {
            clock.advance(period);
            while let Some(id) = timers.pop_due(clock.now()) {
                pl.on_timer(id, &mut timers);
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_turn_counter,
    bench_history_push,
    bench_plot_points,
    bench_value_parsing,
    bench_poll_cycle,
);
criterion_main!(benches);
