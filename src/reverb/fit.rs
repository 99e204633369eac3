//! Fit absorption and damping to a target T60 curve.
//!
//! Two one-dimensional searches run one after the other on the live reverb:
//!
//! 1. absorption: match the longest measured band T60 to the longest target
//!    T60,
//! 2. damping: match the slope of T60 over log-frequency between the lowest
//!    and highest target band, with absorption held.
//!
//! Every trial publishes new parameters (T60 re-derived from the room) and
//! measures the impulse response again. Each stage repeats the simplex
//! search from its last result for up to `numiter` rounds and stops early
//! once the error is small or no longer improves.
//!
//! Absorption is kept above the value whose Sabine T60 is four times the
//! longest target, so trial decays stay measurable.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::optim::{nelmin, Status};

use super::params::RoomGeometry;
use super::{ConfigError, FdnReverb};

/// Error below which a stage is done.
const TARGET_ERROR: f64 = 5.0e-5;
/// Relative improvement below which a stage stops.
const MIN_IMPROVEMENT: f64 = 1.0e-9;
/// Error reported when the engine could not be measured.
const UNMEASURABLE: f64 = 1.0e6;
const MAX_DAMPING: f64 = 0.999;
/// Longest trial decay relative to the longest target.
const MAX_DECAY_RATIO: f32 = 4.0;
const MIN_ABSORPTION: f64 = 1.0e-4;
/// Measurement attempts while the audio thread holds the engine.
const MEASURE_ATTEMPTS: usize = 200;
const RETRY_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Rounds of simplex search per stage.
    pub numiter: usize,
    pub reqmin: f64,
    /// Initial simplex size for both parameters.
    pub step: f64,
    pub konvge: usize,
    /// Objective evaluations per round.
    pub kcount: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            numiter: 100,
            reqmin: 1.0e-6,
            step: 0.1,
            konvge: 5,
            kcount: 40,
        }
    }
}

impl FitOptions {
    /// Defaults with the round count taken from the reverb configuration.
    pub fn from_reverb(reverb: &FdnReverb) -> Self {
        Self {
            numiter: reverb.config().numiter,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub absorption: f32,
    pub damping: f32,
    /// Squared relative error of the longest band T60 after the first
    /// stage.
    pub absorption_error: f64,
    /// Squared relative error of the T60 slope, `None` with fewer than two
    /// bands.
    pub damping_error: Option<f64>,
    /// Band T60s measured with the fitted parameters.
    pub measured: Vec<f32>,
    /// Simplex rounds run over both stages.
    pub rounds: usize,
    /// Status of the last simplex search.
    pub status: Status,
}

/// Band T60 measurements for the fitter. Waits out short contention with
/// the audio thread and falls back to the last curve it measured.
struct Meter<'a> {
    reverb: &'a FdnReverb,
    vcf: &'a [f32],
    last: Option<Vec<f32>>,
    /// Attempts that found the engine busy.
    busy: usize,
}

impl<'a> Meter<'a> {
    fn new(reverb: &'a FdnReverb, vcf: &'a [f32]) -> Self {
        Self {
            reverb,
            vcf,
            last: None,
            busy: 0,
        }
    }

    fn curve(&mut self) -> Option<Vec<f32>> {
        for attempt in 0..MEASURE_ATTEMPTS {
            if let Some(measured) = self.reverb.get_t60(self.vcf) {
                self.last = Some(measured.clone());
                return Some(measured);
            }
            self.busy += 1;
            if attempt + 1 < MEASURE_ATTEMPTS {
                thread::sleep(RETRY_INTERVAL);
            }
        }
        debug!(busy = self.busy, "engine busy, reusing previous measurement");
        self.last.clone()
    }
}

/// Absorption range for a room and the longest target T60.
fn absorption_bounds(room: &RoomGeometry, target_max: f32) -> (f64, f64) {
    // Sabine T60 is inversely proportional to absorption
    let t60_at_one = room.sabine_t60(1.0);
    let lower = if target_max > 0.0 && t60_at_one > 0.0 {
        (t60_at_one / (MAX_DECAY_RATIO * target_max)) as f64
    } else {
        0.0
    };
    (lower.clamp(MIN_ABSORPTION, 1.0), 1.0)
}

/// Fit the reverb's absorption and damping to its configured `vcf`/`vt60`
/// curve. The fitted parameters stay published on the reverb.
pub fn fit_t60(reverb: &FdnReverb, options: &FitOptions) -> Result<FitReport, ConfigError> {
    if !reverb.is_configured() {
        return Err(ConfigError::NotConfigured);
    }
    let vcf = &reverb.config().vcf;
    if vcf.is_empty() {
        return Err(ConfigError::EmptyTargetCurve);
    }
    let mut meter = Meter::new(reverb, vcf);
    Ok(fit_with(reverb, options, || meter.curve()))
}

fn fit_with<M>(reverb: &FdnReverb, options: &FitOptions, mut measure: M) -> FitReport
where
    M: FnMut() -> Option<Vec<f32>>,
{
    let vcf = &reverb.config().vcf;
    let vt60 = &reverb.config().vt60;

    let target_max = max_t60(vt60);
    let (lo, hi) = band_extremes(vcf);
    let target_slope = slope(vcf, vt60, lo, hi);

    let start = reverb.params();
    let bounds = absorption_bounds(&start.room, target_max);
    let mut rounds = 0;
    let mut status = Status::Converged;

    let (absorption, absorption_err) = fit_stage(
        "absorption",
        start.absorption as f64,
        bounds,
        |absorption: f64| {
            let absorption = absorption.clamp(bounds.0, bounds.1) as f32;
            reverb.update_parameters(|p| {
                p.absorption = absorption;
                p.t60 = 0.0;
            });
            match measure() {
                Some(measured) => relative_error(max_t60(&measured), target_max),
                None => UNMEASURABLE,
            }
        },
        options,
        &mut rounds,
        &mut status,
    );

    let (damping, damping_err) = if vcf.len() >= 2 {
        let (damping, err) = fit_stage(
            "damping",
            start.damping as f64,
            (0.0, MAX_DAMPING),
            |damping: f64| {
                let damping = damping.clamp(0.0, MAX_DAMPING) as f32;
                reverb.update_parameters(|p| {
                    p.damping = damping;
                    p.t60 = 0.0;
                });
                match measure() {
                    Some(measured) => relative_error(slope(vcf, &measured, lo, hi), target_slope),
                    None => UNMEASURABLE,
                }
            },
            options,
            &mut rounds,
            &mut status,
        );
        (damping, Some(err))
    } else {
        debug!("single target band, damping left unchanged");
        (start.damping as f64, None)
    };

    reverb.update_parameters(|p| {
        p.absorption = absorption as f32;
        p.damping = damping as f32;
        p.t60 = 0.0;
    });
    let measured = measure().unwrap_or_else(|| vec![-1.0; vcf.len()]);

    info!(
        absorption,
        damping,
        absorption_error = absorption_err,
        damping_error = ?damping_err,
        rounds,
        "T60 fit finished"
    );

    FitReport {
        absorption: absorption as f32,
        damping: damping as f32,
        absorption_error: absorption_err,
        damping_error: damping_err,
        measured,
        rounds,
        status,
    }
}

/// Run rounds of simplex search on one parameter. Returns the best value
/// and its error.
fn fit_stage<F>(
    name: &str,
    start: f64,
    (lower, upper): (f64, f64),
    mut error: F,
    options: &FitOptions,
    rounds: &mut usize,
    status: &mut Status,
) -> (f64, f64)
where
    F: FnMut(f64) -> f64,
{
    let mut value = start.clamp(lower, upper);
    let mut err = error(value);

    for round in 0..options.numiter {
        if err < TARGET_ERROR {
            break;
        }
        let result = nelmin(
            |x| error(x[0]),
            &[value],
            options.reqmin,
            &[options.step],
            options.konvge,
            options.kcount,
        );
        *rounds += 1;
        *status = result.status;
        match result.status {
            Status::Converged => {}
            Status::NotConverged => warn!(stage = name, round, "simplex search did not converge"),
            Status::InvalidInput => {
                warn!(stage = name, "invalid simplex settings, stage skipped");
                break;
            }
        }

        let candidate = result.xmin[0].clamp(lower, upper);
        let candidate_err = error(candidate);
        let improvement = if err > 0.0 {
            (err - candidate_err) / err
        } else {
            0.0
        };
        if candidate_err < err {
            value = candidate;
            err = candidate_err;
        }
        debug!(stage = name, round, value, error = err, "fit round");
        if improvement < MIN_IMPROVEMENT {
            break;
        }
    }

    // leave the best value published for the next stage
    error(value);
    (value, err)
}

fn max_t60(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// Indices of the lowest and highest centre frequency.
fn band_extremes(vcf: &[f32]) -> (usize, usize) {
    let mut lo = 0;
    let mut hi = 0;
    for (i, &f) in vcf.iter().enumerate() {
        if f < vcf[lo] {
            lo = i;
        }
        if f > vcf[hi] {
            hi = i;
        }
    }
    (lo, hi)
}

/// Change of T60 per natural-log unit of frequency between bands `lo` and
/// `hi`.
fn slope(vcf: &[f32], t60: &[f32], lo: usize, hi: usize) -> f32 {
    let span = (vcf[hi] / vcf[lo]).ln();
    if span > 0.0 {
        (t60[hi] - t60[lo]) / span
    } else {
        0.0
    }
}

/// Squared relative error; absolute when the target is (near) zero.
fn relative_error(measured: f32, target: f32) -> f64 {
    let diff = (measured - target) as f64;
    let err = if target.abs() > 1.0e-6 {
        let r = diff / target as f64;
        r * r
    } else {
        diff * diff
    };
    if err.is_finite() {
        err
    } else {
        UNMEASURABLE
    }
}
