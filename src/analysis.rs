//! Reverberation time from impulse responses.
//!
//! The decay is estimated by Schroeder backward integration: the energy left
//! in the response after sample `i` is `E(i) = Σ_{k≥i} h[k]²`. The time
//! between `E` falling to -10.2 dB and -30.2 dB of the total energy covers a
//! 20 dB span, so three times that span extrapolates to 60 dB.

use crate::dsp::filter::BandPass;

/// Number of cascaded band-pass passes used to isolate an octave band.
pub const BAND_PASSES: usize = 4;

const UPPER_THRESHOLD_DB: f32 = -10.2;
const LOWER_THRESHOLD_DB: f32 = -30.2;

/// Estimate T60 in seconds from `ir`, or `-1.0` when the decay never
/// crosses both thresholds before the last sample (silent response, or
/// energy that does not die away inside the buffer).
///
/// Thresholds are relative to the energy captured in `ir`, so a tail cut
/// off by a short buffer biases the estimate low rather than failing.
pub fn schroeder_t60(ir: &[f32], sample_rate: f32) -> f32 {
    let total: f64 = ir.iter().map(|&v| (v as f64) * (v as f64)).sum();
    if total <= 0.0 || !total.is_finite() {
        return -1.0;
    }
    let upper = total * 10f64.powf(UPPER_THRESHOLD_DB as f64 / 10.0);
    let lower = total * 10f64.powf(LOWER_THRESHOLD_DB as f64 / 10.0);

    let mut remaining = total;
    let mut i_upper = None;
    let mut i_lower = None;
    for (i, &v) in ir.iter().enumerate() {
        if i_upper.is_none() && remaining <= upper {
            i_upper = Some(i);
        }
        if remaining <= lower {
            i_lower = Some(i);
            break;
        }
        remaining -= (v as f64) * (v as f64);
    }

    match (i_upper, i_lower) {
        (Some(a), Some(b)) => 3.0 * (b - a) as f32 / sample_rate,
        _ => -1.0,
    }
}

/// Band-limit `ir` to the octave around `center_hz` into `scratch` and
/// estimate its T60. `scratch` must be at least as long as `ir`.
pub fn band_t60(ir: &[f32], center_hz: f32, sample_rate: f32, scratch: &mut [f32]) -> f32 {
    let band = &mut scratch[..ir.len()];
    band.copy_from_slice(ir);
    let mut bp = BandPass::octave(center_hz as f64, sample_rate as f64);
    for _ in 0..BAND_PASSES {
        bp.reset();
        bp.render(band);
    }
    schroeder_t60(band, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential_decay(t60: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        // amplitude falls 60 dB in t60 seconds
        let k = (-3.0 * std::f32::consts::LN_10 / (t60 * sample_rate)).exp();
        let mut amp = 1.0f32;
        (0..len)
            .map(|n| {
                let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
                let v = sign * amp;
                amp *= k;
                v
            })
            .collect()
    }

    #[test]
    fn test_exponential_decay() {
        let sample_rate = 16_000.0;
        let ir = exponential_decay(0.5, sample_rate, 16_000);
        let t60 = schroeder_t60(&ir, sample_rate);
        assert!((t60 - 0.5).abs() < 0.01, "expected 0.5 s, got {}", t60);
    }

    #[test]
    fn test_silence_is_not_measurable() {
        assert_eq!(schroeder_t60(&[0.0; 128], 16_000.0), -1.0);
        assert_eq!(schroeder_t60(&[], 16_000.0), -1.0);
    }

    #[test]
    fn test_response_without_decay_is_not_measurable() {
        // energy is spread evenly up to the very end of the buffer
        assert_eq!(schroeder_t60(&[0.5; 100], 16_000.0), -1.0);
    }

    #[test]
    fn test_thresholds_are_relative_to_captured_energy() {
        // a cut-off tail still crosses both thresholds before the end
        let sample_rate = 16_000.0;
        let ir = exponential_decay(10.0, sample_rate, 16_000);
        let t60 = schroeder_t60(&ir, sample_rate);
        assert!(t60 > 0.0 && t60 < 1.0, "got {}", t60);
    }

    #[test]
    fn test_single_impulse_has_zero_decay() {
        let mut ir = vec![0.0; 64];
        ir[3] = 1.0;
        assert_eq!(schroeder_t60(&ir, 16_000.0), 0.0);
    }

    #[test]
    fn test_band_t60_of_noise_like_decay() {
        let sample_rate = 16_000.0;
        let mut state = 0x1234_5678u32;
        let k = (-3.0 * std::f32::consts::LN_10 / (0.4 * sample_rate)).exp();
        let mut amp = 1.0f32;
        let ir: Vec<f32> = (0..16_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let noise = (state as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let v = noise * amp;
                amp *= k;
                v
            })
            .collect();
        let mut scratch = vec![0.0; ir.len()];
        let t60 = band_t60(&ir, 1_000.0, sample_rate, &mut scratch);
        assert!((t60 - 0.4).abs() < 0.06, "expected about 0.4 s, got {}", t60);
    }
}
