use nalgebra::UnitQuaternion;

use crate::dsp::delay::FoaDelayLine;
use crate::dsp::foa::FoaSample;
use crate::dsp::reflection::ReflectionFilter;

/// One delay path of a network: delay line, reflection filter and rotation.
pub struct FdnPath {
    pub(crate) delayline: FoaDelayLine,
    pub(crate) reflection: ReflectionFilter,
    pub(crate) rotation: UnitQuaternion<f32>,
    /// Last filtered and rotated output of this path.
    pub(crate) dlout: FoaSample,
}

impl FdnPath {
    pub fn new(maxdelay: usize) -> Self {
        Self {
            delayline: FoaDelayLine::new(maxdelay),
            reflection: ReflectionFilter::new(),
            rotation: UnitQuaternion::identity(),
            dlout: FoaSample::ZERO,
        }
    }

    pub fn delay(&self) -> usize {
        self.delayline.len()
    }

    pub fn rotation(&self) -> &UnitQuaternion<f32> {
        &self.rotation
    }

    pub fn reflection(&self) -> &ReflectionFilter {
        &self.reflection
    }

    pub fn output(&self) -> FoaSample {
        self.dlout
    }

    /// Read the tap, filter, rotate and remember the result.
    #[inline]
    pub(crate) fn tap(&mut self) -> FoaSample {
        let mut tmp = self.delayline.read();
        self.reflection.filter(&mut tmp);
        tmp.rotate(&self.rotation);
        self.dlout = tmp;
        tmp
    }

    pub fn set_zero(&mut self) {
        self.delayline.reset();
        self.dlout.set_zero();
    }
}
