//! Benchmarks for the receiver: one audio fragment and one measurement.

use std::hint::black_box;

use ambiverb::dsp::foa::FoaBlock;
use ambiverb::reverb::SourceGains;
use ambiverb::{FdnReverb, ReverbConfig};
use criterion::{BenchmarkId, Criterion};
use nalgebra::Vector3;

use crate::BLOCK_SIZES;

fn room(forwardstages: usize, lowcut: f32) -> ReverbConfig {
    ReverbConfig {
        volumetric: [4.0, 5.0, 6.0],
        forwardstages,
        lowcut,
        gainmethod: "schroeder".to_string(),
        ..Default::default()
    }
}

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");

    let sample_rate = 48_000.0;

    for &size in BLOCK_SIZES {
        let chunk: Vec<f32> = (0..size)
            .map(|i| {
                if i < 10 {
                    1.0 - (i as f32 / 10.0)
                } else {
                    (i as f32 * 0.05).sin() * 0.1
                }
            })
            .collect();

        for (name, forwardstages, lowcut) in [("plain", 0, 0.0), ("diffuse_lowcut", 2, 60.0)] {
            let reverb = FdnReverb::new(room(forwardstages, lowcut)).expect("valid config");
            reverb.configure(sample_rate, size).expect("valid sample rate");
            let mut gains = SourceGains::new();
            let mut out = FoaBlock::new(size);
            let direction = Vector3::new(1.0, 1.0, 0.0);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    reverb.add_pointsource(direction, black_box(&chunk), &mut gains);
                    out.clear();
                    reverb.postproc(&mut out);
                    out.w()[0]
                })
            });
        }
    }

    group.finish();
}

pub fn bench_measurement(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/measurement");
    group.sample_size(10);

    let reverb = FdnReverb::new(room(0, 0.0)).expect("valid config");
    reverb.configure(16_000.0, 256).expect("valid sample rate");

    group.bench_function("get_t60_octaves", |b| {
        b.iter(|| reverb.get_t60(black_box(&[250.0, 500.0, 1000.0, 2000.0])))
    });
    group.bench_function("get_broadband_t60", |b| b.iter(|| reverb.get_broadband_t60()));

    group.finish();
}
