//! Criterion benchmarks for range parsing and evaluation in `mp-range`.
//!
//! Plugins parse their thresholds once but may evaluate them against many
//! samples (one per disk, per interface, per process), so both paths matter.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mp_range::{Range, Thresholds};

const RANGE_TEXTS: [&str; 6] = ["80", "10:", "~:-95.99", "-30:20", "@0:657.8210567", "1:12%"];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("range/parse");

    for text in RANGE_TEXTS {
        group.bench_with_input(BenchmarkId::from_parameter(text), &text, |b, text| {
            b.iter(|| {
                let range = Range::parse(black_box(text));
                black_box(range.is_ok());
            })
        });
    }

    group.finish();
}

fn bench_status(c: &mut Criterion) {
    let mut group = c.benchmark_group("thresholds/status");
    let thresholds = Thresholds::parse(Some("-10:-2"), Some("-30:20")).expect("thresholds");

    for n in [100, 1_000, 10_000] {
        let samples: Vec<f64> = (0..n).map(|i| (i as f64) * 0.01 - 40.0).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &samples, |b, samples| {
            b.iter(|| {
                for v in samples {
                    black_box(thresholds.status(black_box(*v)));
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_status);
criterion_main!(benches);
