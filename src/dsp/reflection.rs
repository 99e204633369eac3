use crate::dsp::foa::FoaSample;

/*
Reflection Filter
=================

Every trip through a delay path models one wall reflection. Real walls absorb
some energy and more of it at high frequencies, so each path carries:

  1. A first-order recursive lowpass with broadband gain

         y[n] = B1 * x[n] - A2 * y[n-1]      B1 = g * (1 - c),  A2 = -c

     The DC gain is exactly g, and higher frequencies lose more the larger
     the damping coefficient c is. |c| < 1 keeps the pole inside the unit
     circle.

  2. A first-order allpass with coefficient eta

         y[n] = eta * x[n] + x[n-1] - eta * y[n-1]

     which leaves the magnitude untouched but disperses phase, so the
     reflections of different paths do not line up into audible ringing.

The same coefficients are applied to all four FOA channels.
*/

/// Lowpass + allpass reflection filter operating on FOA samples.
#[derive(Debug, Clone, Default)]
pub struct ReflectionFilter {
    /// Non-recursive lowpass coefficient.
    b1: f32,
    /// Recursive lowpass coefficient.
    a2: f32,
    /// Allpass coefficient.
    eta: f32,
    /// Lowpass output state.
    sy: FoaSample,
    /// Allpass input state.
    sapx: FoaSample,
    /// Allpass output state.
    sapy: FoaSample,
}

impl ReflectionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set gain and damping of the lowpass and clear all state. The allpass
    /// coefficient is left as it is.
    pub fn set_lp(&mut self, gain: f32, damping: f32) {
        self.reset();
        self.b1 = gain * (1.0 - damping);
        self.a2 = -damping;
    }

    pub fn set_eta(&mut self, eta: f32) {
        self.eta = eta;
    }

    pub fn eta(&self) -> f32 {
        self.eta
    }

    pub fn coefficients(&self) -> (f32, f32) {
        (self.b1, self.a2)
    }

    /// Filter one sample in place. Must be called exactly once per sample.
    #[inline]
    pub fn filter(&mut self, x: &mut FoaSample) {
        // lowpass
        *x *= self.b1;
        *x -= self.a2 * self.sy;
        x.flush_denormals();
        self.sy = *x;

        // allpass
        let tmp = self.eta * *x + self.sapx;
        self.sapx = *x;
        *x = tmp - self.eta * self.sapy;
        x.flush_denormals();
        self.sapy = *x;
    }

    pub fn reset(&mut self) {
        self.sy.set_zero();
        self.sapx.set_zero();
        self.sapy.set_zero();
    }
}
