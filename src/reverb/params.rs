use std::f32::consts::TAU;

use crate::fdn::{CirculantVariant, NetworkDesign};

use super::config::ReverbConfig;

/// Sabine constant, seconds per metre.
const SABINE: f32 = 0.161;
/// Absorption floor keeping Sabine's equation finite.
const MIN_ABSORPTION: f32 = 1.0e-4;
const MAX_DAMPING: f32 = 0.999;
/// Longest impulse response ever captured, seconds.
pub const MAX_IR_SECONDS: f32 = 20.0;

/// Shoebox room, dimensions in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoomGeometry {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RoomGeometry {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn volume(&self) -> f32 {
        self.x * self.y * self.z
    }

    /// Total wall, floor and ceiling area.
    pub fn area(&self) -> f32 {
        2.0 * (self.x * self.y + self.y * self.z + self.x * self.z)
    }

    pub fn min_dim(&self) -> f32 {
        self.x.min(self.y).min(self.z)
    }

    pub fn max_dim(&self) -> f32 {
        self.x.max(self.y).max(self.z)
    }

    /// Sabine reverberation time `0.161·V / (α·S)` in seconds. A room
    /// without surface has no reverberation.
    pub fn sabine_t60(&self, absorption: f32) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        SABINE * self.volume() / (absorption.max(MIN_ABSORPTION) * area)
    }

    /// Level correction `1 / (0.5·∛V)` applied to the reverb input.
    pub fn distance_correction(&self) -> f32 {
        let v = self.volume();
        if v > 0.0 {
            1.0 / (0.5 * v.cbrt())
        } else {
            1.0
        }
    }
}

/// Parameter snapshot the networks are derived from.
///
/// Published as a whole; a change never mutates a snapshot that is already
/// visible to other threads.
#[derive(Debug, Clone, PartialEq)]
pub struct FdnParameters {
    pub room: RoomGeometry,
    pub absorption: f32,
    pub damping: f32,
    /// Seconds; 0 or less derives the time from the room.
    pub t60: f32,
    /// Speed of sound, m/s.
    pub c: f32,
    /// Average rotation, rounds per second.
    pub w: f32,
    /// Rotation spread, rounds per second.
    pub dw: f32,
    pub variant: CirculantVariant,
    pub logdelays: bool,
    pub truncate_forward: bool,
}

impl FdnParameters {
    pub fn from_config(config: &ReverbConfig) -> Self {
        let [x, y, z] = config.volumetric;
        Self {
            room: RoomGeometry::new(x, y, z),
            absorption: config.absorption,
            damping: config.damping,
            t60: config.t60,
            c: config.c,
            w: config.w,
            dw: config.dw,
            variant: config.circulant_variant(),
            logdelays: config.logdelays,
            truncate_forward: config.truncate_forward,
        }
    }

    /// Travel time across the shortest dimension, seconds.
    pub fn t_min(&self) -> f32 {
        self.room.min_dim() / self.c
    }

    /// Travel time across the longest dimension, seconds.
    pub fn t_max(&self) -> f32 {
        self.room.max_dim() / self.c
    }

    /// Target reverberation time in seconds.
    pub fn effective_t60(&self) -> f32 {
        if self.t60 > 0.0 {
            self.t60
        } else {
            self.room.sabine_t60(self.absorption)
        }
    }

    pub fn clamped_damping(&self) -> f32 {
        if self.damping.is_nan() {
            return 0.0;
        }
        self.damping.clamp(0.0, MAX_DAMPING)
    }

    /// Network design for `sample_rate`. Rotation is scaled by one
    /// round-trip of the shortest dimension.
    pub fn design(&self, sample_rate: f32) -> NetworkDesign {
        let t_min = self.t_min();
        let wscale = TAU * t_min;
        NetworkDesign {
            az: wscale * self.w,
            daz: wscale * self.dw,
            t_min: sample_rate * t_min,
            t_max: sample_rate * self.t_max(),
            t60: sample_rate * self.effective_t60(),
            damping: self.clamped_damping(),
            variant: self.variant,
            truncate_forward: self.truncate_forward,
        }
    }

    /// Impulse response length in samples needed to capture the decay:
    /// at least one second, ten crossings of the longest dimension and
    /// twice the target T60, never more than [`MAX_IR_SECONDS`].
    pub fn ir_len(&self, sample_rate: f32) -> usize {
        self.ir_len_for(sample_rate, self.effective_t60())
    }

    /// Like [`ir_len`](Self::ir_len) for a decay of `t60` seconds.
    pub fn ir_len_for(&self, sample_rate: f32, t60: f32) -> usize {
        let seconds = 1.0f32
            .max(10.0 * self.t_max())
            .max(2.0 * t60)
            .min(MAX_IR_SECONDS);
        let len = (seconds * sample_rate).round();
        if len.is_finite() {
            len as usize
        } else {
            sample_rate as usize
        }
    }
}

impl Default for FdnParameters {
    fn default() -> Self {
        Self::from_config(&ReverbConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_geometry() {
        let room = RoomGeometry::new(4.0, 5.0, 6.0);
        assert_eq!(room.volume(), 120.0);
        assert_eq!(room.area(), 148.0);
        assert_eq!(room.min_dim(), 4.0);
        assert_eq!(room.max_dim(), 6.0);
    }

    #[test]
    fn test_sabine() {
        let room = RoomGeometry::new(4.0, 5.0, 6.0);
        let t60 = room.sabine_t60(0.2);
        assert!((t60 - 0.161 * 120.0 / (0.2 * 148.0)).abs() < 1e-6);
        assert!(room.sabine_t60(0.0).is_finite());
        assert_eq!(RoomGeometry::default().sabine_t60(0.5), 0.0);
    }

    #[test]
    fn test_distance_correction() {
        let room = RoomGeometry::new(2.0, 2.0, 2.0);
        assert!((room.distance_correction() - 1.0).abs() < 1e-6);
        assert_eq!(RoomGeometry::default().distance_correction(), 1.0);
    }

    #[test]
    fn test_explicit_t60_wins_over_sabine() {
        let mut params = FdnParameters {
            room: RoomGeometry::new(4.0, 5.0, 6.0),
            t60: 1.5,
            ..Default::default()
        };
        assert_eq!(params.effective_t60(), 1.5);
        params.t60 = 0.0;
        assert_eq!(params.effective_t60(), params.room.sabine_t60(params.absorption));
    }

    #[test]
    fn test_design_scales_to_samples() {
        let params = FdnParameters {
            room: RoomGeometry::new(3.4, 6.8, 5.1),
            t60: 0.5,
            damping: 2.0,
            w: 0.0,
            dw: 1.0,
            ..Default::default()
        };
        let d = params.design(1000.0);
        assert!((d.t_min - 10.0).abs() < 1e-4);
        assert!((d.t_max - 20.0).abs() < 1e-4);
        assert!((d.t60 - 500.0).abs() < 1e-3);
        assert_eq!(d.damping, 0.999);
        assert_eq!(d.az, 0.0);
        assert!((d.daz - TAU * 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_ir_len() {
        let params = FdnParameters {
            room: RoomGeometry::new(4.0, 5.0, 6.0),
            t60: 1.2,
            ..Default::default()
        };
        assert_eq!(params.ir_len(1000.0), 2400);

        let params = FdnParameters {
            room: RoomGeometry::new(4.0, 5.0, 6.0),
            t60: 0.1,
            ..Default::default()
        };
        assert_eq!(params.ir_len(1000.0), 1000);
    }

    #[test]
    fn test_ir_len_is_capped_for_vanishing_absorption() {
        let params = FdnParameters {
            room: RoomGeometry::new(4.0, 5.0, 6.0),
            absorption: 0.0,
            t60: 0.0,
            ..Default::default()
        };
        assert!(params.effective_t60() > 1000.0);
        assert_eq!(params.ir_len(44_100.0), 882_000);
        assert_eq!(params.ir_len_for(1000.0, 6.0), 12_000);
        assert_eq!(params.ir_len_for(1000.0, f32::NAN), 1000);
    }
}
