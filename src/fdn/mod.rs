//! Feedback Delay Network for first-order ambisonic signals.
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            │                                              │
//! src ──(+)──┴─→ [ M ] ─┬─→ [delay 0] → [refl] → [rot] ─┬───┼─→ outval
//!                       ├─→ [delay 1] → [refl] → [rot] ─┤   │
//!                       └─→ [delay N] → [refl] → [rot] ─┴───┘
//! ```
//!
//! Every path models a family of wall reflections: a delay, a reflection
//! filter (lowpass for absorption, allpass for dispersion) and a small
//! rotation of the sound field. The orthogonal feedback matrix `M` mixes the
//! paths without adding or removing energy, so the decay is entirely set by
//! the reflection filter gain `g`.
//!
//! The same primitive also runs as a non-recursive feed-forward stage: paths
//! are fed only from `src` through `M`, which turns it into a diffusing
//! multi-tap delay used ahead of the feedback network.

mod matrix;
mod path;

use std::fmt;
use std::str::FromStr;

use nalgebra::{UnitQuaternion, Vector3};

use crate::dsp::foa::FoaSample;
use crate::dsp::reflection::ReflectionFilter;
use crate::reverb::config::ConfigError;

pub use matrix::{CirculantDesigner, CirculantVariant};
pub use path::FdnPath;

/// Largest allpass coefficient, used by the last path.
const MAX_ETA: f32 = 0.87;

/// How the reflection gain is derived from the target T60.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GainMethod {
    /// `exp(-4.2·t_min/t60)`, based on the shortest path.
    #[default]
    Original,
    /// `exp(-4.2·t_mean/t60)`, based on the mean path length.
    Mean,
    /// `10^(-3·t_mean/t60)`, -60 dB after `t60` on the mean path.
    Schroeder,
}

impl GainMethod {
    /// Reflection gain for the given shortest/mean delay and T60, all in
    /// samples.
    pub fn gain(self, t_min: f32, t_mean: f32, t60: f32) -> f32 {
        let g = match self {
            GainMethod::Original => (-4.2 * t_min / t60).exp(),
            GainMethod::Mean => (-4.2 * t_mean / t60).exp(),
            GainMethod::Schroeder => 10f32.powf(-3.0 * t_mean / t60),
        };
        if g.is_finite() {
            g.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GainMethod::Original => "original",
            GainMethod::Mean => "mean",
            GainMethod::Schroeder => "schroeder",
        }
    }
}

impl FromStr for GainMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(GainMethod::Original),
            "mean" => Ok(GainMethod::Mean),
            "schroeder" => Ok(GainMethod::Schroeder),
            other => Err(ConfigError::UnknownGainMethod(other.to_string())),
        }
    }
}

impl fmt::Display for GainMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of [`Fdn::setpar_t60`]. Times are in samples, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkDesign {
    /// Average rotation per reflection.
    pub az: f32,
    /// Spread of rotation per reflection.
    pub daz: f32,
    /// Shortest path delay.
    pub t_min: f32,
    /// Longest path delay.
    pub t_max: f32,
    /// Target reverberation time.
    pub t60: f32,
    /// Lowpass damping coefficient, 0..0.999.
    pub damping: f32,
    pub variant: CirculantVariant,
    /// Only used by feed-forward stages: shift all taps so the shortest one
    /// is two samples long.
    pub truncate_forward: bool,
}

pub struct Fdn {
    order: usize,
    maxdelay: usize,
    logdelays: bool,
    gainmethod: GainMethod,
    feedback: bool,
    /// Row-major `order × order`.
    feedbackmat: Vec<f32>,
    prefilt0: ReflectionFilter,
    prefilt1: ReflectionFilter,
    paths: Vec<FdnPath>,
    /// Per-path values to be written into the delay lines.
    feed: Vec<FoaSample>,
    designer: CirculantDesigner,
    gain: f32,
    /// Accumulated network output. Never cleared by `process`.
    pub outval: FoaSample,
}

impl Fdn {
    /// Create a network of `order` paths, each able to hold up to
    /// `maxdelay` samples. All buffers are allocated here.
    pub fn new(
        order: usize,
        maxdelay: usize,
        logdelays: bool,
        gainmethod: GainMethod,
        feedback: bool,
    ) -> Result<Self, ConfigError> {
        if order == 0 {
            return Err(ConfigError::ZeroOrder);
        }
        let maxdelay = maxdelay.max(3);
        // feed-forward stages may grow every delay by one sample
        let capacity = if feedback { maxdelay } else { maxdelay + 1 };

        let mut prefilt0 = ReflectionFilter::new();
        let mut prefilt1 = ReflectionFilter::new();
        prefilt0.set_eta(0.0);
        prefilt1.set_eta(MAX_ETA);

        Ok(Self {
            order,
            maxdelay,
            logdelays,
            gainmethod,
            feedback,
            feedbackmat: vec![0.0; order * order],
            prefilt0,
            prefilt1,
            paths: (0..order).map(|_| FdnPath::new(capacity)).collect(),
            feed: vec![FoaSample::ZERO; order],
            designer: CirculantDesigner::new(order),
            gain: 0.0,
            outval: FoaSample::ZERO,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn maxdelay(&self) -> usize {
        self.maxdelay
    }

    pub fn is_feedback(&self) -> bool {
        self.feedback
    }

    pub fn gain_method(&self) -> GainMethod {
        self.gainmethod
    }

    pub fn logdelays(&self) -> bool {
        self.logdelays
    }

    pub fn set_logdelays(&mut self, logdelays: bool) {
        self.logdelays = logdelays;
    }

    /// Reflection gain chosen by the last `setpar_t60`.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn matrix(&self) -> &[f32] {
        &self.feedbackmat
    }

    pub fn paths(&self) -> &[FdnPath] {
        &self.paths
    }

    pub fn delays(&self) -> impl Iterator<Item = usize> + '_ {
        self.paths.iter().map(FdnPath::delay)
    }

    /// Copy the last per-path outputs into `dst`, e.g. as `src` for the next
    /// stage.
    pub fn copy_outputs(&self, dst: &mut [FoaSample]) {
        for (d, path) in dst.iter_mut().zip(self.paths.iter()) {
            *d = path.dlout;
        }
    }

    /// Read and clear the accumulated output.
    #[inline]
    pub fn take_output(&mut self) -> FoaSample {
        std::mem::take(&mut self.outval)
    }

    /// Apply both input pre-filters in place.
    #[inline]
    pub fn prefilter(&mut self, x: &mut FoaSample) {
        self.prefilt0.filter(x);
        self.prefilt1.filter(x);
    }

    /// Clear all delay lines, path outputs and the accumulated output.
    pub fn set_zero(&mut self) {
        for path in &mut self.paths {
            path.set_zero();
        }
        self.outval.set_zero();
    }

    /// Clear delay lines and every filter state.
    pub fn reset(&mut self) {
        self.set_zero();
        self.prefilt0.reset();
        self.prefilt1.reset();
        for path in &mut self.paths {
            path.reflection.reset();
        }
    }

    /// Re-derive delays, reflection filters, rotations and the feedback
    /// matrix. Clears all signal state. Does not allocate.
    pub fn setpar_t60(&mut self, design: &NetworkDesign) {
        self.set_zero();
        let order = self.order;
        let span = order as f32 - 1.0;

        let mut t_mean = 0.0f32;
        for (tap, path) in self.paths.iter_mut().enumerate() {
            let frac = if order > 1 { tap as f32 / span } else { 0.0 };
            let t = if order == 1 {
                design.t_min
            } else if self.logdelays {
                design.t_min * (design.t_max / design.t_min).powf(frac)
            } else {
                design.t_min + (design.t_max - design.t_min) * frac.sqrt()
            };
            let delay = (t.max(0.0).round() as usize).clamp(2, self.maxdelay - 1);
            path.delayline.set_len(delay);
            path.reflection.set_eta(MAX_ETA * frac);
            t_mean += delay as f32;
        }
        t_mean /= order as f32;

        if !self.feedback {
            if design.truncate_forward {
                let d_min = self.paths.iter().map(FdnPath::delay).min().unwrap_or(2);
                let shift = d_min.saturating_sub(2);
                for path in &mut self.paths {
                    let len = path.delay() - shift;
                    path.delayline.set_len(len);
                }
            } else {
                for path in &mut self.paths {
                    let len = path.delay() + 1;
                    path.delayline.set_len(len);
                }
            }
        }

        self.gain = self.gainmethod.gain(design.t_min, t_mean, design.t60);
        self.prefilt0.set_lp(self.gain, design.damping);
        self.prefilt1.set_lp(self.gain, design.damping);

        for (tap, path) in self.paths.iter_mut().enumerate() {
            path.reflection.set_lp(self.gain, design.damping);
            path.rotation = path_rotation(design.az, design.daz, tap, order);
        }

        self.designer.fill(&mut self.feedbackmat, design.variant);
    }

    /// Process one sample. `src` holds one input value per path.
    ///
    /// In feedback mode the paths are tapped first and the new delay line
    /// input is `M · (dlout + src)`. In feed-forward mode the delay lines
    /// are written with `M · src` first and tapped afterwards.
    #[inline]
    pub fn process(&mut self, src: &[FoaSample]) {
        debug_assert_eq!(src.len(), self.order);
        let order = self.order;
        if self.feedback {
            for path in &mut self.paths {
                let out = path.tap();
                self.outval += out;
            }
            for (tap, feed) in self.feed.iter_mut().enumerate() {
                let row = &self.feedbackmat[order * tap..order * (tap + 1)];
                let mut acc = FoaSample::ZERO;
                for ((m, opath), input) in row.iter().zip(self.paths.iter()).zip(src.iter()) {
                    acc += (opath.dlout + *input) * *m;
                }
                *feed = acc;
            }
            for (path, feed) in self.paths.iter_mut().zip(self.feed.iter()) {
                path.delayline.write(*feed);
                path.delayline.advance();
            }
        } else {
            for (tap, path) in self.paths.iter_mut().enumerate() {
                let row = &self.feedbackmat[order * tap..order * (tap + 1)];
                let mut acc = FoaSample::ZERO;
                for (m, input) in row.iter().zip(src.iter()) {
                    acc += *input * *m;
                }
                path.delayline.write(acc);
                path.delayline.advance();
            }
            for path in &mut self.paths {
                let out = path.tap();
                self.outval += out;
            }
        }
    }
}

/// Rotation of path `tap`: z by `az - daz + 2·daz·tap/order` (just `az` for
/// a single path), then y by `±daz/2` alternating, then x by
/// `daz·(tap mod 3)/8 - daz/4`.
fn path_rotation(az: f32, daz: f32, tap: usize, order: usize) -> UnitQuaternion<f32> {
    let laz = if order > 1 {
        az - daz + 2.0 * daz * tap as f32 / order as f32
    } else {
        az
    };
    let tilt = if tap & 1 == 1 { 0.5 * daz } else { -0.5 * daz };
    let roll = 0.125 * daz * (tap % 3) as f32 - 0.25 * daz;
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), laz)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), tilt)
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), roll)
}
