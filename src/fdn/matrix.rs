//! Circulant feedback matrices.
//!
//! A circulant matrix is diagonalised by the DFT, so its eigenvalues are the
//! DFT of its first row. Choosing eigenvalues on the unit circle makes the
//! matrix orthogonal (lossless); choosing them as a quadratic-phase chirp
//! spreads energy evenly across the paths. The row is obtained by an inverse
//! FFT of the Hermitian-extended chirp spectrum.

use std::f32::consts::TAU;
use std::sync::Arc;

use rustfft::{num_complex::Complex32, Fft, FftPlanner};

/// Layout of the feedback matrix rows.
///
/// `Legacy` indexes the generating row with `(i + j) mod n`, which gives a
/// Hankel (anti-circulant) matrix. It is orthogonal as well but not what the
/// construction intended; it is kept so existing room presets sound the same.
/// `Fixed` uses `(j - i) mod n`, a true circulant.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CirculantVariant {
    #[default]
    Legacy,
    Fixed,
}

impl CirculantVariant {
    pub fn from_fixed(fixed: bool) -> Self {
        if fixed {
            CirculantVariant::Fixed
        } else {
            CirculantVariant::Legacy
        }
    }

    pub fn is_fixed(self) -> bool {
        self == CirculantVariant::Fixed
    }
}

/// Builder for the chirp circulant of a fixed order.
///
/// Holds the planned inverse FFT and its buffers so re-deriving the matrix
/// does not allocate.
pub struct CirculantDesigner {
    order: usize,
    ifft: Option<Arc<dyn Fft<f32>>>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    row: Vec<f32>,
}

impl CirculantDesigner {
    pub fn new(order: usize) -> Self {
        let ifft = (order > 1).then(|| FftPlanner::<f32>::new().plan_fft_inverse(order));
        let scratch_len = ifft.as_ref().map_or(0, |f| f.get_inplace_scratch_len());
        Self {
            order,
            ifft,
            spectrum: vec![Complex32::new(0.0, 0.0); order],
            scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
            row: vec![1.0; order],
        }
    }

    /// Generating row `w[0..order)` of the chirp circulant.
    ///
    /// `eigenv[k] = exp(j·2π·(k / (order/2))²)` for `k = 0..=order/2`,
    /// mirrored to a Hermitian spectrum and transformed back with 1/N
    /// scaling.
    pub fn row(&mut self) -> &[f32] {
        let order = self.order;
        let Some(ifft) = self.ifft.as_ref() else {
            return &self.row;
        };
        let half = 0.5 * order as f32;
        for k in 0..=order / 2 {
            let phase = TAU * (k as f32 / half).powi(2);
            let v = Complex32::from_polar(1.0, phase);
            self.spectrum[k] = v;
            if k > 0 && order - k != k {
                self.spectrum[order - k] = v.conj();
            }
        }
        if order % 2 == 0 {
            // complex-to-real transforms only see the real part of Nyquist
            self.spectrum[order / 2].im = 0.0;
        }
        self.spectrum[0].im = 0.0;

        ifft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let scale = 1.0 / order as f32;
        for (w, c) in self.row.iter_mut().zip(self.spectrum.iter()) {
            *w = c.re * scale;
        }
        &self.row
    }

    /// Fill `matrix` (row-major, `order × order`) with the feedback matrix.
    pub fn fill(&mut self, matrix: &mut [f32], variant: CirculantVariant) {
        let order = self.order;
        debug_assert_eq!(matrix.len(), order * order);
        if order == 1 {
            matrix[0] = 1.0;
            return;
        }
        let w = self.row();
        for i in 0..order {
            for j in 0..order {
                matrix[order * i + j] = match variant {
                    CirculantVariant::Fixed => w[(j + order - i) % order],
                    CirculantVariant::Legacy => w[(j + i) % order],
                };
            }
        }
    }
}
