//! Benchmarks for a single feedback delay network.

use std::hint::black_box;

use ambiverb::fdn::NetworkDesign;
use ambiverb::{CirculantVariant, Fdn, FoaSample, GainMethod};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

fn network(order: usize, sample_rate: f32, feedback: bool) -> Fdn {
    let mut fdn = Fdn::new(order, sample_rate as usize, true, GainMethod::Schroeder, feedback)
        .expect("valid order");
    let t_min = 4.0 / 340.0;
    fdn.setpar_t60(&NetworkDesign {
        az: 0.0,
        daz: std::f32::consts::TAU * t_min * 60.0,
        t_min: sample_rate * t_min,
        t_max: sample_rate * 6.0 / 340.0,
        t60: sample_rate,
        damping: 0.3,
        variant: CirculantVariant::Legacy,
        truncate_forward: false,
    });
    fdn
}

pub fn bench_fdn(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/fdn");

    let sample_rate = 48_000.0;

    for &size in BLOCK_SIZES {
        let input: Vec<FoaSample> = (0..size)
            .map(|i| {
                let s = (i as f32 * 0.05).sin() * 0.1;
                FoaSample::new(s, 0.5 * s, 0.0, -0.5 * s)
            })
            .collect();

        for order in [5, 16] {
            let mut fdn = network(order, sample_rate, true);
            let mut src = vec![FoaSample::ZERO; order];
            group.bench_with_input(
                BenchmarkId::new(format!("feedback_order{}", order), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let mut sum = 0.0f32;
                        for &x in &input {
                            src.fill(black_box(x));
                            fdn.process(&src);
                            sum += fdn.take_output().w;
                        }
                        sum
                    })
                },
            );
        }

        let mut fdn = network(5, sample_rate, false);
        let mut src = vec![FoaSample::ZERO; 5];
        group.bench_with_input(BenchmarkId::new("forward_order5", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    src.fill(black_box(x));
                    fdn.process(&src);
                    sum += fdn.take_output().w;
                }
                sum
            })
        });
    }

    group.finish();
}
