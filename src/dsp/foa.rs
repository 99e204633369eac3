use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use nalgebra::{UnitQuaternion, Vector3};

/*
First-Order Ambisonics
======================

A first-order ambisonic (FOA) signal carries a sound field in four channels:

  W   omnidirectional pressure
  X   front/back figure-of-eight
  Y   left/right figure-of-eight
  Z   up/down figure-of-eight

Rotating the sound field only touches X, Y and Z; W is invariant. The delay
networks exploit this: each path rotates its output a little, so repeated
reflections smear the direction of the reverberant tail across the sphere
while the W energy decay stays untouched.
*/

/// A single FOA sample value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FoaSample {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl FoaSample {
    pub const ZERO: FoaSample = FoaSample {
        w: 0.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn set_zero(&mut self) {
        *self = Self::ZERO;
    }

    /// Rotate the directional components (X, Y, Z) in place.
    #[inline]
    pub fn rotate(&mut self, rotation: &UnitQuaternion<f32>) {
        let v = rotation.transform_vector(&Vector3::new(self.x, self.y, self.z));
        self.x = v.x;
        self.y = v.y;
        self.z = v.z;
    }

    /// Replace denormal components with exact zeros.
    #[inline]
    pub fn flush_denormals(&mut self) {
        self.w = crate::flush_denormal(self.w);
        self.x = crate::flush_denormal(self.x);
        self.y = crate::flush_denormal(self.y);
        self.z = crate::flush_denormal(self.z);
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn energy(&self) -> f32 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }
}

impl AddAssign for FoaSample {
    #[inline]
    fn add_assign(&mut self, rhs: FoaSample) {
        self.w += rhs.w;
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl SubAssign for FoaSample {
    #[inline]
    fn sub_assign(&mut self, rhs: FoaSample) {
        self.w -= rhs.w;
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl MulAssign<f32> for FoaSample {
    #[inline]
    fn mul_assign(&mut self, rhs: f32) {
        self.w *= rhs;
        self.x *= rhs;
        self.y *= rhs;
        self.z *= rhs;
    }
}

impl Add for FoaSample {
    type Output = FoaSample;

    #[inline]
    fn add(mut self, rhs: FoaSample) -> FoaSample {
        self += rhs;
        self
    }
}

impl Sub for FoaSample {
    type Output = FoaSample;

    #[inline]
    fn sub(mut self, rhs: FoaSample) -> FoaSample {
        self -= rhs;
        self
    }
}

impl Mul<f32> for FoaSample {
    type Output = FoaSample;

    #[inline]
    fn mul(mut self, rhs: f32) -> FoaSample {
        self *= rhs;
        self
    }
}

impl Mul<FoaSample> for f32 {
    type Output = FoaSample;

    #[inline]
    fn mul(self, mut rhs: FoaSample) -> FoaSample {
        rhs *= self;
        rhs
    }
}

/// Channel index of an FOA block in ACN order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoaChannel {
    W = 0,
    Y = 1,
    Z = 2,
    X = 3,
}

/// Four equally sized channel buffers holding one audio fragment in ACN
/// channel order (W, Y, Z, X).
#[derive(Debug, Clone, Default)]
pub struct FoaBlock {
    channels: [Vec<f32>; 4],
}

impl FoaBlock {
    pub fn new(len: usize) -> Self {
        Self {
            channels: [vec![0.0; len], vec![0.0; len], vec![0.0; len], vec![0.0; len]],
        }
    }

    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, ch: FoaChannel) -> &[f32] {
        &self.channels[ch as usize]
    }

    pub fn channel_mut(&mut self, ch: FoaChannel) -> &mut [f32] {
        &mut self.channels[ch as usize]
    }

    pub fn w(&self) -> &[f32] {
        self.channel(FoaChannel::W)
    }

    pub fn x(&self) -> &[f32] {
        self.channel(FoaChannel::X)
    }

    pub fn y(&self) -> &[f32] {
        self.channel(FoaChannel::Y)
    }

    pub fn z(&self) -> &[f32] {
        self.channel(FoaChannel::Z)
    }

    #[inline]
    pub fn get(&self, index: usize) -> FoaSample {
        FoaSample {
            w: self.channels[FoaChannel::W as usize][index],
            x: self.channels[FoaChannel::X as usize][index],
            y: self.channels[FoaChannel::Y as usize][index],
            z: self.channels[FoaChannel::Z as usize][index],
        }
    }

    #[inline]
    pub fn add_at(&mut self, index: usize, value: FoaSample) {
        self.channels[FoaChannel::W as usize][index] += value.w;
        self.channels[FoaChannel::X as usize][index] += value.x;
        self.channels[FoaChannel::Y as usize][index] += value.y;
        self.channels[FoaChannel::Z as usize][index] += value.z;
    }

    pub fn clear(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
    }

    pub fn scale(&mut self, gain: f32) {
        for ch in &mut self.channels {
            for v in ch.iter_mut() {
                *v *= gain;
            }
        }
    }

    /// Add another block of the same length sample by sample.
    pub fn mix_from(&mut self, other: &FoaBlock) {
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += s;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_arithmetic_is_componentwise() {
        let a = FoaSample::new(1.0, 2.0, 3.0, 4.0);
        let b = FoaSample::new(0.5, 0.5, 0.5, 0.5);

        assert_eq!(a + b, FoaSample::new(1.5, 2.5, 3.5, 4.5));
        assert_eq!(a - b, FoaSample::new(0.5, 1.5, 2.5, 3.5));
        assert_eq!(a * 2.0, FoaSample::new(2.0, 4.0, 6.0, 8.0));
        assert_eq!(2.0 * a, a * 2.0);

        let mut c = a;
        c.set_zero();
        assert_eq!(c, FoaSample::ZERO);
    }

    #[test]
    fn test_rotation_leaves_w_untouched() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let mut s = FoaSample::new(0.7, 1.0, 0.0, 0.0);
        s.rotate(&q);

        assert!((s.w - 0.7).abs() < 1e-6);
        assert!(s.x.abs() < 1e-6, "x should rotate onto y, got {}", s.x);
        assert!((s.y - 1.0).abs() < 1e-6);
        assert!(s.z.abs() < 1e-6);
    }

    #[test]
    fn test_block_get_and_add_use_acn_order() {
        let mut block = FoaBlock::new(4);
        block.add_at(2, FoaSample::new(1.0, 2.0, 3.0, 4.0));

        assert_eq!(block.w()[2], 1.0);
        assert_eq!(block.x()[2], 2.0);
        assert_eq!(block.y()[2], 3.0);
        assert_eq!(block.z()[2], 4.0);
        assert_eq!(block.channel(FoaChannel::Y)[2], 3.0);
        assert_eq!(block.get(2), FoaSample::new(1.0, 2.0, 3.0, 4.0));

        block.clear();
        assert_eq!(block.get(2), FoaSample::ZERO);
    }
}
