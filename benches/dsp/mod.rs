//! Benchmarks for the DSP building blocks and the receiver.

mod fdn;
mod filter;
mod reverb;

pub use fdn::bench_fdn;
pub use filter::bench_filter;
pub use reverb::{bench_measurement, bench_reverb};
