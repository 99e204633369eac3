//! Low-level DSP primitives used by the delay networks.
//!
//! These components are allocation-free and realtime-safe once constructed,
//! making them safe to call from the audio callback. They stay focused on the
//! signal-processing math so the network and receiver layers can handle
//! orchestration and parameter design.

/// First-order ambisonic sample and block types.
pub mod foa;
/// Fixed-capacity FOA delay line with decrement-with-reset addressing.
pub mod delay;
/// Pole/zero biquads, band-pass and high-pass sections.
pub mod filter;
/// Per-path lowpass + allpass reflection filter.
pub mod reflection;

pub use delay::FoaDelayLine;
pub use filter::{BandPass, Biquad};
pub use reflection::ReflectionFilter;
