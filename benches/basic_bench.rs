use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pulse_rs::{
    components::{aggregator::StreamAggregator, detector::OfflineBeatDetector},
    core::constants::*,
    math::{
        filter::BandpassFilter,
        peaks::{find_peaks, PeakConstraints},
    },
    model::{config::DetectionConfig, sample::Sample},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;

/// Five minutes of a noisy 72 BPM waveform.
fn synthetic_series() -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..(300.0 * SAMPLING_RATE_HZ) as usize)
        .map(|i| {
            let t = i as f64 / SAMPLING_RATE_HZ;
            Sample {
                timestamp: t,
                amplitude: 500.0 + 200.0 * (2.0 * PI * 1.2 * t).sin() + rng.gen_range(-10.0..10.0),
                threshold: 520.0,
                beat: false,
            }
        })
        .collect()
}

fn benchmark_filtfilt(c: &mut Criterion) {
    let filter = BandpassFilter::butterworth(
        BANDPASS_ORDER,
        BANDPASS_LOW_HZ,
        BANDPASS_HIGH_HZ,
        SAMPLING_RATE_HZ,
    )
    .unwrap();
    let data: Vec<f64> = synthetic_series().iter().map(|s| s.amplitude).collect();

    c.bench_function("bandpass_filtfilt_5min", |b| {
        b.iter(|| filter.filtfilt(black_box(&data)).unwrap())
    });
}

fn benchmark_find_peaks(c: &mut Criterion) {
    let data: Vec<f64> = synthetic_series()
        .iter()
        .map(|s| s.amplitude - 500.0)
        .collect();
    let constraints = PeakConstraints {
        min_height: MIN_PEAK_HEIGHT,
        min_distance: MIN_PEAK_DISTANCE,
        min_prominence: MIN_PEAK_PROMINENCE,
    };

    c.bench_function("find_peaks_5min", |b| {
        b.iter(|| find_peaks(black_box(&data), &constraints))
    });
}

fn benchmark_detect(c: &mut Criterion) {
    let detector = OfflineBeatDetector::new(DetectionConfig::default(), SAMPLING_RATE_HZ);
    let series = synthetic_series();

    c.bench_function("offline_detect_5min", |b| {
        b.iter(|| detector.detect(black_box(&series)))
    });
}

fn benchmark_aggregate(c: &mut Criterion) {
    let series = synthetic_series();

    c.bench_function("aggregate_5min", |b| {
        b.iter(|| {
            let mut aggregator = StreamAggregator::new(BUFFER_SIZE, DOWNSAMPLE_RATE);
            for sample in &series {
                aggregator.offer(black_box(*sample));
            }
            aggregator.flush()
        })
    });
}

criterion_group!(
    benches,
    benchmark_filtfilt,
    benchmark_find_peaks,
    benchmark_detect,
    benchmark_aggregate
);
criterion_main!(benches);
