//! Criterion benchmarks for detector evaluation.
//!
//! Run with: `cargo bench -p sigscan-core`
//!
//! Measures one batch worth of work (every built-in detector over every
//! symbol) at a few universe sizes, plus the indicator helpers on their own.

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sigscan_core::indicators::{closes, macd, rsi};
use sigscan_core::store::synthetic::{generate_bars, generate_universe};
use sigscan_core::{SeriesWindow, SignalRegistry};

const DEPTH: usize = 81;

fn end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

fn bench_catalog_over_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_over_batch");
    let defs = SignalRegistry::with_builtin().enabled(None);

    for size in [50usize, 300] {
        let windows: Vec<SeriesWindow> = generate_universe(size, DEPTH, end())
            .into_iter()
            .map(|(symbol, bars)| SeriesWindow::new(symbol, bars, DEPTH))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &windows, |b, windows| {
            b.iter(|| {
                let mut hits = 0usize;
                for w in windows {
                    for def in &defs {
                        if let Ok(out) = def.detect(black_box(w.bars()), &w.symbol) {
                            hits += usize::from(out.triggered);
                        }
                    }
                }
                hits
            });
        });
    }

    group.finish();
}

fn bench_indicators(c: &mut Criterion) {
    let values = closes(&generate_bars("600000", end(), 250));
    c.bench_function("macd_12_26_9", |b| {
        b.iter(|| macd(black_box(&values), 12, 26, 9))
    });
    c.bench_function("rsi_14", |b| b.iter(|| rsi(black_box(&values), 14)));
}

criterion_group!(benches, bench_catalog_over_batch, bench_indicators);
criterion_main!(benches);
