pub mod analysis; // Impulse-response decay analysis
pub mod dsp;
pub mod fdn; // Feedback delay networks
pub mod optim;
pub mod reverb; // Receiver-level engine, measurement and fitting

pub use dsp::foa::{FoaBlock, FoaSample};
pub use fdn::{CirculantVariant, Fdn, GainMethod};
pub use reverb::{FdnReverb, ReverbConfig};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const DENORMAL_THRESHOLD: f32 = 1.0e-30;

/// Replace values too small to matter with an exact zero.
#[inline]
pub(crate) fn flush_denormal(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        x
    }
}
