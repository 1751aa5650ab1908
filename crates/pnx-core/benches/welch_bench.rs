//! Welch Estimator Benchmarks
//!
//! Measures PSD estimation cost against segment length for real and
//! analytic input. Compare against a run with the segment reduction
//! spread over threads:
//!
//! Run with: cargo bench -p pnx-core --bench welch_bench
//!           cargo bench -p pnx-core --features parallel --bench welch_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::time::Duration;

use pnx_core::prelude::*;

const SAMPLE_RATE: f64 = 100_000.0;
const CARRIER: f64 = 25_000.0;
const NUM_SAMPLES: usize = 1 << 18;

fn noisy_carrier() -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.01).unwrap();
    (0..NUM_SAMPLES)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE;
            (2.0 * PI * CARRIER * t).cos() + noise.sample(&mut rng)
        })
        .collect()
}

/// Real input, one-sided density at several segment lengths
fn bench_welch_real(c: &mut Criterion) {
    let mut group = c.benchmark_group("welch_real");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(NUM_SAMPLES as u64));

    let signal = noisy_carrier();
    for segment_len in [1usize << 10, 1 << 12, 1 << 14, 1 << 15].iter() {
        let mut estimator = WelchEstimator::new(WelchConfig::new(*segment_len)).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(segment_len),
            &signal,
            |b, signal| b.iter(|| estimator.estimate(black_box(signal.as_slice()), SAMPLE_RATE)),
        );
    }

    group.finish();
}

/// Analytic (complex) input, always two-sided
fn bench_welch_analytic(c: &mut Criterion) {
    let mut group = c.benchmark_group("welch_analytic");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(NUM_SAMPLES as u64));

    let waveform = Waveform::from_samples(noisy_carrier(), SAMPLE_RATE).unwrap();
    let analytic = AnalyticSignal::from_waveform(&waveform).unwrap();
    for segment_len in [1usize << 10, 1 << 14].iter() {
        let config = WelchConfig::new(*segment_len).with_sidedness(Sidedness::TwoSided);
        let mut estimator = WelchEstimator::new(config).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(segment_len),
            analytic.samples(),
            |b, samples| b.iter(|| estimator.estimate(black_box(samples), SAMPLE_RATE)),
        );
    }

    group.finish();
}

/// Front half of the phase pipeline: analytic signal and down-conversion
fn bench_phase_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase_extraction");
    group.throughput(Throughput::Elements(NUM_SAMPLES as u64));

    let waveform = Waveform::from_samples(noisy_carrier(), SAMPLE_RATE).unwrap();
    group.bench_function("analytic", |b| {
        b.iter(|| AnalyticSignal::from_waveform(black_box(&waveform)))
    });

    let analytic = AnalyticSignal::from_waveform(&waveform).unwrap();
    group.bench_function("downconvert_unwrap", |b| {
        b.iter(|| {
            downconvert(black_box(&analytic), CARRIER).and_then(|baseband| baseband.phase(true))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_welch_real,
    bench_welch_analytic,
    bench_phase_extraction
);
criterion_main!(benches);
