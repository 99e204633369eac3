//! Receiver-level reverb: input accumulation, the network chain, parameter
//! publishing and decay measurement.
//!
//! ```text
//!  add_pointsource ─┐
//!                   ├─→ input ─→ ×distcorr ─→ [lowcut] ─→ [prefilt] ─┐
//!  add_diffuse ─────┘                                                │
//!                       ┌────────────────────────────────────────────┘
//!                       └─→ forward stage 0 … N ─→ feedback FDN ─→ output
//! ```
//!
//! Two threads share one reverb. The audio thread calls [`FdnReverb::postproc`]
//! once per fragment and never waits: if the control side holds the engine
//! the fragment is skipped. The control thread publishes a new
//! [`FdnParameters`] snapshot and re-derives the networks under a blocking
//! lock. Measurements run on the control side but only try the lock, so they
//! give up instead of stalling a concurrent writer.

pub mod config;
pub mod fit;
pub mod message;
pub mod params;

use std::f32::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

use arc_swap::ArcSwap;
use nalgebra::Vector3;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::analysis::{band_t60, schroeder_t60};
use crate::dsp::filter::Biquad;
use crate::dsp::foa::{FoaBlock, FoaSample};
use crate::fdn::{CirculantVariant, Fdn, GainMethod};

pub use config::{ConfigError, ReverbConfig};
pub use fit::{fit_t60, FitOptions, FitReport};
pub use message::{ControlMessage, MessageReceiver};
pub use params::{FdnParameters, RoomGeometry};

/// Omnidirectional weight of an encoded point source (-3 dB).
const W_GAIN: f32 = FRAC_1_SQRT_2;

/// Encoder gains of one point source, carried between fragments so gain
/// changes are ramped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceGains {
    current: FoaSample,
}

impl SourceGains {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> FoaSample {
        self.current
    }
}

/// Everything derived at configuration time.
struct Engine {
    sample_rate: f32,
    prefilt: bool,
    forward: Vec<Fdn>,
    feedback: Fdn,
    /// One high-pass per channel (w, x, y, z).
    lowcut: Option<[Biquad; 4]>,
    distcorr: f32,
    /// Per-path input of the next stage.
    src: Vec<FoaSample>,
    /// Measurement buffers, sized at configuration for the longest of the
    /// configured and the target decays.
    ir: Vec<f32>,
    band: Vec<f32>,
}

impl Engine {
    fn new(
        config: &ReverbConfig,
        gainmethod: GainMethod,
        sample_rate: f32,
        params: &FdnParameters,
    ) -> Result<Self, ConfigError> {
        let maxdelay = sample_rate as usize;
        let forward = (0..config.forwardstages)
            .map(|_| Fdn::new(config.fdnorder, maxdelay, params.logdelays, gainmethod, false))
            .collect::<Result<Vec<_>, _>>()?;
        let feedback = Fdn::new(config.fdnorder, maxdelay, params.logdelays, gainmethod, true)?;
        let lowcut = (config.lowcut > 0.0).then(|| {
            let hp = Biquad::highpass(config.lowcut as f64, sample_rate as f64);
            [hp.clone(), hp.clone(), hp.clone(), hp]
        });

        let longest_target = config.vt60.iter().copied().fold(0.0, f32::max);
        let ir_len = params
            .ir_len(sample_rate)
            .max(params.ir_len_for(sample_rate, longest_target));

        let mut engine = Self {
            sample_rate,
            prefilt: config.prefilt,
            forward,
            feedback,
            lowcut,
            distcorr: 1.0,
            src: vec![FoaSample::ZERO; config.fdnorder],
            ir: vec![0.0; ir_len],
            band: vec![0.0; ir_len],
        };
        engine.update(params);
        Ok(engine)
    }

    fn update(&mut self, params: &FdnParameters) {
        self.distcorr = params.room.distance_correction();
        let design = params.design(self.sample_rate);
        for stage in self.forward.iter_mut().chain(std::iter::once(&mut self.feedback)) {
            stage.set_logdelays(params.logdelays);
            stage.setpar_t60(&design);
        }
        debug!(
            t_min = design.t_min,
            t_max = design.t_max,
            t60 = design.t60,
            gain = self.feedback.gain(),
            damping = design.damping,
            "networks re-derived"
        );
    }

    fn reset(&mut self) {
        for stage in self.forward.iter_mut().chain(std::iter::once(&mut self.feedback)) {
            stage.reset();
        }
        if let Some(filters) = self.lowcut.as_mut() {
            for hp in filters.iter_mut() {
                hp.reset();
            }
        }
    }

    #[inline]
    fn apply_lowcut(&mut self, x: &mut FoaSample) {
        if let Some([hw, hx, hy, hz]) = self.lowcut.as_mut() {
            x.w = hw.process(x.w as f64) as f32;
            x.x = hx.process(x.x as f64) as f32;
            x.y = hy.process(x.y as f64) as f32;
            x.z = hz.process(x.z as f64) as f32;
        }
    }

    /// Run one input sample through the stage chain.
    #[inline]
    fn tick(&mut self, mut x: FoaSample) -> FoaSample {
        if self.prefilt {
            self.feedback.prefilter(&mut x);
        }
        self.src.fill(x);
        for stage in &mut self.forward {
            stage.process(&self.src);
            stage.copy_outputs(&mut self.src);
            stage.outval.set_zero();
        }
        self.feedback.process(&self.src);
        let y = self.feedback.take_output();
        if y.is_finite() {
            y
        } else {
            FoaSample::ZERO
        }
    }

    /// W response to a unit W impulse, without distance correction and
    /// low-cut. Leaves the engine silent.
    fn impulse_response(&mut self, out: &mut [f32]) {
        self.reset();
        for (n, sample) in out.iter_mut().enumerate() {
            let x = if n == 0 {
                FoaSample::new(1.0, 0.0, 0.0, 0.0)
            } else {
                FoaSample::ZERO
            };
            *sample = self.tick(x).w;
        }
        self.reset();
    }
}

/// First-order ambisonic FDN reverb of one receiver.
pub struct FdnReverb {
    config: ReverbConfig,
    gainmethod: GainMethod,
    params: ArcSwap<FdnParameters>,
    engine: Mutex<Option<Engine>>,
    input: Mutex<FoaBlock>,
}

impl FdnReverb {
    /// Validate `config`. Nothing is allocated for audio until
    /// [`configure`](Self::configure).
    pub fn new(config: ReverbConfig) -> Result<Self, ConfigError> {
        let gainmethod = config.validate()?;
        let params = FdnParameters::from_config(&config);
        Ok(Self {
            config,
            gainmethod,
            params: ArcSwap::from_pointee(params),
            engine: Mutex::new(None),
            input: Mutex::new(FoaBlock::new(0)),
        })
    }

    /// Allocate the networks for `sample_rate` and fragments of
    /// `fragment_size` samples, then derive all parameters.
    pub fn configure(&self, sample_rate: f32, fragment_size: usize) -> Result<(), ConfigError> {
        if !(sample_rate.is_finite() && sample_rate >= 1.0) {
            return Err(ConfigError::InvalidSampleRate);
        }
        let params = self.params.load_full();
        let engine = Engine::new(&self.config, self.gainmethod, sample_rate, &params)?;
        info!(
            sample_rate,
            fragment_size,
            order = self.config.fdnorder,
            forward_stages = self.config.forwardstages,
            gainmethod = %self.gainmethod,
            "reverb configured"
        );
        *self.engine.lock() = Some(engine);
        *self.input.lock() = FoaBlock::new(fragment_size);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.engine.lock().is_some()
    }

    pub fn config(&self) -> &ReverbConfig {
        &self.config
    }

    pub fn gain_method(&self) -> GainMethod {
        self.gainmethod
    }

    /// Current parameter snapshot.
    pub fn params(&self) -> Arc<FdnParameters> {
        self.params.load_full()
    }

    /// Samples available for a measured impulse response, fixed at
    /// configuration.
    pub fn ir_capacity(&self) -> Option<usize> {
        self.engine.lock().as_ref().map(|e| e.ir.len())
    }

    pub fn sample_rate(&self) -> Option<f32> {
        self.engine.lock().as_ref().map(|e| e.sample_rate)
    }

    /// Re-derive the networks from the current snapshot.
    pub fn update_par(&self) {
        let mut engine = self.engine.lock();
        if let Some(engine) = engine.as_mut() {
            engine.update(&self.params.load());
        }
    }

    /// Publish a modified copy of the parameters and re-derive the
    /// networks. Writers are serialised by the engine lock.
    pub fn update_parameters<F>(&self, f: F)
    where
        F: FnOnce(&mut FdnParameters),
    {
        let mut engine = self.engine.lock();
        let mut next = FdnParameters::clone(&self.params.load());
        f(&mut next);
        let next = Arc::new(next);
        self.params.store(Arc::clone(&next));
        if let Some(engine) = engine.as_mut() {
            engine.update(&next);
        }
    }

    pub fn set_logdelays(&self, logdelays: bool) {
        self.update_parameters(|p| p.logdelays = logdelays);
    }

    pub fn set_fixcirculantmat(&self, fixed: bool) {
        self.update_parameters(|p| p.variant = CirculantVariant::from_fixed(fixed));
    }

    /// New room and wall properties; the T60 is re-derived from the room.
    pub fn set_dim_damp_absorption(&self, room: RoomGeometry, damping: f32, absorption: f32) {
        self.update_parameters(|p| {
            p.room = room;
            p.damping = damping;
            p.absorption = absorption;
            p.t60 = 0.0;
        });
    }

    pub fn apply_message(&self, message: ControlMessage) {
        debug!(?message, "control message");
        match message {
            ControlMessage::DimDampAbsorption {
                x,
                y,
                z,
                damping,
                absorption,
            } => self.set_dim_damp_absorption(RoomGeometry::new(x, y, z), damping, absorption),
            ControlMessage::FixCirculantMatrix(fixed) => self.set_fixcirculantmat(fixed),
            ControlMessage::LogDelays(logdelays) => self.set_logdelays(logdelays),
        }
    }

    /// Apply all pending messages. Returns how many were applied.
    pub fn poll_messages<R: MessageReceiver>(&self, receiver: &mut R) -> usize {
        let mut count = 0;
        while let Some(message) = receiver.pop() {
            self.apply_message(message);
            count += 1;
        }
        count
    }

    /// Encode a mono `chunk` arriving from `direction` into the input
    /// block. Encoder gains ramp linearly from their previous values over
    /// the chunk.
    pub fn add_pointsource(&self, direction: Vector3<f32>, chunk: &[f32], gains: &mut SourceGains) {
        let Some(mut input) = self.input.try_lock() else {
            return;
        };
        let norm = direction.norm();
        let dir = if norm > 0.0 {
            direction / norm
        } else {
            Vector3::zeros()
        };
        let target = FoaSample::new(W_GAIN, dir.x, dir.y, dir.z);
        let step = (target - gains.current) * (1.0 / chunk.len().max(1) as f32);
        let len = chunk.len().min(input.len());
        for (i, &v) in chunk.iter().enumerate() {
            gains.current += step;
            if i < len {
                input.add_at(i, gains.current * v);
            }
        }
    }

    /// Add an ambisonic chunk to the input block.
    pub fn add_diffuse_sound_field(&self, chunk: &FoaBlock) {
        if let Some(mut input) = self.input.try_lock() {
            input.mix_from(chunk);
        }
    }

    /// Run the accumulated input through the networks and add the result to
    /// `output`. Never blocks: the fragment is dropped while the control
    /// side holds the engine. The input block is cleared either way.
    pub fn postproc(&self, output: &mut FoaBlock) {
        let Some(mut input) = self.input.try_lock() else {
            return;
        };
        if let Some(mut guard) = self.engine.try_lock() {
            if let Some(engine) = guard.as_mut() {
                let n = input.len().min(output.len());
                for i in 0..n {
                    let mut x = input.get(i) * engine.distcorr;
                    engine.apply_lowcut(&mut x);
                    let y = engine.tick(x);
                    output.add_at(i, y);
                }
            }
        }
        input.clear();
    }

    /// Capture the W impulse response into `out`. Returns false, leaving
    /// `out` untouched, when the engine is busy or not configured.
    pub fn get_ir(&self, out: &mut [f32]) -> bool {
        let Some(mut guard) = self.engine.try_lock() else {
            debug!("impulse response skipped, engine busy");
            return false;
        };
        match guard.as_mut() {
            Some(engine) => {
                engine.impulse_response(out);
                true
            }
            None => false,
        }
    }

    /// Measured T60 in seconds per octave band around each of
    /// `center_freqs`, -1 where the decay could not be bracketed. `None`
    /// when the engine is busy or not configured.
    pub fn get_t60(&self, center_freqs: &[f32]) -> Option<Vec<f32>> {
        self.measure(|ir, sample_rate, band| {
            center_freqs
                .iter()
                .map(|&fc| band_t60(ir, fc, sample_rate, band))
                .collect()
        })
    }

    /// Measured broadband T60 in seconds, -1 if it could not be bracketed.
    pub fn get_broadband_t60(&self) -> Option<f32> {
        self.measure(|ir, sample_rate, _| schroeder_t60(ir, sample_rate))
    }

    fn measure<T, F>(&self, analyse: F) -> Option<T>
    where
        F: FnOnce(&[f32], f32, &mut [f32]) -> T,
    {
        let params = self.params.load_full();
        let Some(mut guard) = self.engine.try_lock() else {
            debug!("measurement skipped, engine busy");
            return None;
        };
        let engine = guard.as_mut()?;
        let len = params.ir_len(engine.sample_rate).min(engine.ir.len());

        let mut ir = std::mem::take(&mut engine.ir);
        let mut band = std::mem::take(&mut engine.band);
        engine.impulse_response(&mut ir[..len]);
        let result = analyse(&ir[..len], engine.sample_rate, &mut band[..len]);
        engine.ir = ir;
        engine.band = band;
        Some(result)
    }
}
