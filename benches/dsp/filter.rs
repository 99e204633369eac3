//! Benchmarks for the biquad sections used by lowcut and band analysis.

use std::hint::black_box;

use ambiverb::dsp::{BandPass, Biquad};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    let sample_rate = 48_000.0;

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        let mut highpass = Biquad::highpass(60.0, sample_rate);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("highpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                highpass.render(black_box(&mut buffer));
            })
        });

        let mut bandpass = BandPass::octave(1000.0, sample_rate);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("octave_1k", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                bandpass.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
