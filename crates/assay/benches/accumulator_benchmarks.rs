//! Accumulator performance benchmarks.
//!
//! Measures per-value update cost and merge cost for each streaming
//! statistic in isolation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use assay::stats::{
    CategoricalFrequencyAccumulator, DistinctCountEstimator, HistogramBuilder,
    NumericMomentsAccumulator, QuantileEstimator,
};

/// Deterministic pseudo-random values, the same across runs.
fn synthetic_values(n: usize) -> Vec<f64> {
    let mut rng = fastrand::Rng::with_seed(42);
    (0..n).map(|_| rng.f64() * 10_000.0 - 5_000.0).collect()
}

fn synthetic_strings(n: usize, cardinality: usize) -> Vec<String> {
    (0..n).map(|i| format!("value_{}", i % cardinality)).collect()
}

fn bench_moments(c: &mut Criterion) {
    let mut group = c.benchmark_group("moments");

    for n in [1_000, 100_000] {
        let values = synthetic_values(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("update", n), &values, |b, values| {
            b.iter(|| {
                let mut acc = NumericMomentsAccumulator::new();
                for &v in values {
                    acc.update(black_box(v));
                }
                black_box(acc.variance())
            });
        });
    }
    group.finish();
}

fn bench_quantile(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantile");

    for n in [1_000, 100_000] {
        let values = synthetic_values(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("update", n), &values, |b, values| {
            b.iter(|| {
                let mut sketch = QuantileEstimator::new();
                for &v in values {
                    sketch.update(black_box(v));
                }
                black_box(sketch.percentile(50.0))
            });
        });
    }
    group.finish();
}

fn bench_distinct(c: &mut Criterion) {
    let mut group = c.benchmark_group("distinct");

    for n in [1_000, 100_000] {
        let values = synthetic_strings(n, n / 2);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("update", n), &values, |b, values| {
            b.iter(|| {
                let mut sketch = DistinctCountEstimator::new();
                for v in values {
                    sketch.update(black_box(v));
                }
                black_box(sketch.estimate())
            });
        });
    }

    group.bench_function("merge", |b| {
        let values = synthetic_strings(50_000, 25_000);
        let mut left = DistinctCountEstimator::new();
        let mut right = DistinctCountEstimator::new();
        for (i, v) in values.iter().enumerate() {
            if i % 2 == 0 {
                left.update(v);
            } else {
                right.update(v);
            }
        }
        b.iter(|| {
            let mut merged = left.clone();
            merged.merge(black_box(&right)).unwrap();
            black_box(merged.estimate())
        });
    });
    group.finish();
}

fn bench_frequency(c: &mut Criterion) {
    let mut group = c.benchmark_group("frequency");

    for cardinality in [10, 1_000, 10_000] {
        let values = synthetic_strings(100_000, cardinality);
        group.throughput(Throughput::Elements(values.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("update", cardinality),
            &values,
            |b, values| {
                b.iter(|| {
                    let mut acc = CategoricalFrequencyAccumulator::new();
                    for v in values {
                        acc.update(black_box(v));
                    }
                    black_box(acc.top_k(10))
                });
            },
        );
    }
    group.finish();
}

fn bench_histogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("histogram");

    let values = synthetic_values(100_000);
    group.throughput(Throughput::Elements(values.len() as u64));
    group.bench_function("update_100k", |b| {
        b.iter(|| {
            let mut builder = HistogramBuilder::new();
            for &v in &values {
                builder.update(black_box(v));
            }
            black_box(builder.finalize())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_moments,
    bench_quantile,
    bench_distinct,
    bench_frequency,
    bench_histogram
);
criterion_main!(benches);
