use std::fmt;

use crate::fdn::{CirculantVariant, GainMethod};

/// Errors raised while building or configuring a reverb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Target curve arrays differ in length.
    LengthMismatch { vcf: usize, vt60: usize },
    /// `gainmethod` is not one of "original", "mean" or "schroeder".
    UnknownGainMethod(String),
    /// A network needs at least one path.
    ZeroOrder,
    /// `volumetric` is not a positive, finite room size.
    InvalidRoom,
    InvalidSampleRate,
    /// An operation needs `configure()` to have run first.
    NotConfigured,
    /// Fitting needs at least one target band.
    EmptyTargetCurve,
    /// The configuration text could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LengthMismatch { vcf, vt60 } => {
                write!(f, "vcf and vt60 length mismatch ({} vs {})", vcf, vt60)
            }
            ConfigError::UnknownGainMethod(name) => write!(
                f,
                "invalid gainmethod \"{}\" (expected original, mean or schroeder)",
                name
            ),
            ConfigError::ZeroOrder => write!(f, "fdnorder must be at least 1"),
            ConfigError::InvalidRoom => {
                write!(f, "volumetric must be the room size in metres, all dimensions positive")
            }
            ConfigError::InvalidSampleRate => write!(f, "sample rate must be positive and finite"),
            ConfigError::NotConfigured => write!(f, "reverb is not configured"),
            ConfigError::EmptyTargetCurve => write!(f, "vcf and vt60 must not be empty for fitting"),
            ConfigError::Parse(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Receiver configuration. Field names follow the scene attribute names.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct ReverbConfig {
    /// Number of paths per network.
    pub fdnorder: usize,
    /// Average rotation, rounds per second.
    pub w: f32,
    /// Rotation spread, rounds per second.
    pub dw: f32,
    /// Reverberation time in seconds; 0 derives it from Sabine's equation.
    pub t60: f32,
    /// Lowpass damping coefficient, clamped to 0..0.999.
    pub damping: f32,
    /// Run the input through the feedback network's pre-filters.
    pub prefilt: bool,
    /// Number of feed-forward diffusion stages ahead of the feedback network.
    pub forwardstages: usize,
    /// Wall absorption coefficient, 0..1.
    pub absorption: f32,
    /// Speed of sound, m/s.
    pub c: f32,
    /// Room box dimensions in metres.
    pub volumetric: [f32; 3],
    pub fixcirculantmat: bool,
    /// Target curve: band centre frequencies in Hz.
    pub vcf: Vec<f32>,
    /// Target curve: T60 per band in seconds.
    pub vt60: Vec<f32>,
    /// Rounds of simplex search per fit stage.
    pub numiter: usize,
    pub gainmethod: String,
    /// Input high-pass edge in Hz, 0 disables it.
    pub lowcut: f32,
    pub truncate_forward: bool,
    /// Geometric instead of square-root delay spacing.
    pub logdelays: bool,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self {
            fdnorder: 5,
            w: 0.0,
            dw: 60.0,
            t60: 0.0,
            damping: 0.3,
            prefilt: true,
            forwardstages: 0,
            absorption: 0.6,
            c: 340.0,
            volumetric: [0.0; 3],
            fixcirculantmat: false,
            vcf: Vec::new(),
            vt60: Vec::new(),
            numiter: 100,
            gainmethod: GainMethod::Original.as_str().to_string(),
            lowcut: 0.0,
            truncate_forward: false,
            logdelays: true,
        }
    }
}

impl ReverbConfig {
    /// Check the configuration and return the parsed gain method.
    pub fn validate(&self) -> Result<GainMethod, ConfigError> {
        if self.fdnorder == 0 {
            return Err(ConfigError::ZeroOrder);
        }
        if self.vcf.len() != self.vt60.len() {
            return Err(ConfigError::LengthMismatch {
                vcf: self.vcf.len(),
                vt60: self.vt60.len(),
            });
        }
        let gainmethod = self.gainmethod.parse()?;
        if !self.volumetric.iter().all(|&d| d.is_finite() && d > 0.0) {
            return Err(ConfigError::InvalidRoom);
        }
        Ok(gainmethod)
    }

    pub fn circulant_variant(&self) -> CirculantVariant {
        CirculantVariant::from_fixed(self.fixcirculantmat)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ReverbConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
