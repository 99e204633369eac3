use std::f64::consts::{PI, TAU};

use rustfft::num_complex::Complex64;

/*
| type       | constructed by                 | passes            | rejects            |
| ---------- | ------------------------------ | ----------------- | ------------------ |
| high-pass  | zero at DC, pole at fc         | above fc          | DC                 |
| low-pass   | zero at Nyquist, pole at fc    | below fc          | Nyquist            |
| band-pass  | high-pass ∘ low-pass (series)  | between f1 and f2 | DC and Nyquist     |

All sections are second order biquads designed directly in the z-plane from a
pair of conjugate zeros and a pair of conjugate poles. The pole radius shrinks
with frequency (10^(-2 f/fs)) which keeps the resonance moderate across the
audio band. Gains are normalised at the frequency of interest.
*/

/// Second order IIR section, transposed direct form II, double precision
/// state.
#[derive(Debug, Clone)]
pub struct Biquad {
    a1: f64,
    a2: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    z1: f64,
    z2: f64,
}

impl Default for Biquad {
    fn default() -> Self {
        // identity
        Self {
            a1: 0.0,
            a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            z1: 0.0,
            z2: 0.0,
        }
    }
}

impl Biquad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set coefficients from gain, zero pair and pole pair in polar form.
    pub fn set_gzp(&mut self, gain: f64, zero_r: f64, zero_phi: f64, pole_r: f64, pole_phi: f64) {
        self.a1 = -2.0 * pole_r * pole_phi.cos();
        self.a2 = pole_r * pole_r;
        self.b0 = gain;
        self.b1 = -2.0 * gain * zero_r * zero_phi.cos();
        self.b2 = gain * zero_r * zero_r;
    }

    /// High-pass with unity gain at Nyquist.
    pub fn highpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        let mut bq = Self::new();
        let (r, phi) = pole(cutoff_hz, sample_rate);
        bq.set_gzp(1.0, 1.0, 0.0, r, phi);
        let g = bq.response(PI).norm();
        bq.set_gzp(1.0 / g, 1.0, 0.0, r, phi);
        bq
    }

    /// Low-pass with unity gain at DC.
    pub fn lowpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        let mut bq = Self::new();
        let (r, phi) = pole(cutoff_hz, sample_rate);
        bq.set_gzp(1.0, 1.0, PI, r, phi);
        let g = bq.response(0.0).norm();
        bq.set_gzp(1.0 / g, 1.0, PI, r, phi);
        bq
    }

    /// Complex frequency response at normalised angular frequency `phi`
    /// (radians per sample).
    pub fn response(&self, phi: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -phi);
        let z2 = z1 * z1;
        let num = self.b0 + self.b1 * z1 + self.b2 * z2;
        let den = 1.0 + self.a1 * z1 + self.a2 * z2;
        num / den
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let out = self.z1 + self.b0 * input;
        self.z1 = self.z2 + self.b1 * input - self.a1 * out;
        self.z2 = self.b2 * input - self.a2 * out;
        self.z1 = flush_denormal_f64(self.z1);
        self.z2 = flush_denormal_f64(self.z2);
        out
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample as f64) as f32;
        }
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Band-pass between `f1` and `f2`, unity gain at their geometric mean.
#[derive(Debug, Clone)]
pub struct BandPass {
    highpass: Biquad,
    lowpass: Biquad,
}

impl BandPass {
    pub fn new(f1: f64, f2: f64, sample_rate: f64) -> Self {
        let mut highpass = Biquad::new();
        let mut lowpass = Biquad::new();
        let (r1, phi1) = pole(f1, sample_rate);
        let (r2, phi2) = pole(f2, sample_rate);
        highpass.set_gzp(1.0, 1.0, 0.0, r1, phi1);
        lowpass.set_gzp(1.0, 1.0, PI, r2, phi2);

        let f0 = (f1 * f2).sqrt();
        let phi0 = TAU * f0 / sample_rate;
        let g = (highpass.response(phi0) * lowpass.response(phi0)).norm();
        highpass.set_gzp(1.0 / g, 1.0, 0.0, r1, phi1);

        Self { highpass, lowpass }
    }

    /// Band-pass one octave wide around `center_hz` (`fc/√2 .. fc·√2`). The
    /// upper edge is kept below Nyquist.
    pub fn octave(center_hz: f64, sample_rate: f64) -> Self {
        let f1 = center_hz * std::f64::consts::FRAC_1_SQRT_2;
        let f2 = (center_hz * std::f64::consts::SQRT_2).min(0.49 * sample_rate);
        Self::new(f1, f2.max(f1), sample_rate)
    }

    pub fn response(&self, phi: f64) -> Complex64 {
        self.highpass.response(phi) * self.lowpass.response(phi)
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.lowpass.process(self.highpass.process(input))
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample as f64) as f32;
        }
    }

    pub fn reset(&mut self) {
        self.highpass.reset();
        self.lowpass.reset();
    }
}

fn pole(freq_hz: f64, sample_rate: f64) -> (f64, f64) {
    (10f64.powf(-2.0 * freq_hz / sample_rate), TAU * freq_hz / sample_rate)
}

#[inline]
fn flush_denormal_f64(x: f64) -> f64 {
    if x.abs() < 1.0e-30 {
        0.0
    } else {
        x
    }
}
