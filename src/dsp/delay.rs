use crate::dsp::foa::FoaSample;

/// FOA delay line over a fixed arena.
///
/// The buffer is sized once (`capacity` samples) and never reallocated. The
/// active length can be changed at any time between 2 and `capacity - 1`. Reads and
/// writes share a single position that walks *backwards* and wraps to the
/// active length, so a value written at the current position is seen again
/// after exactly `len` advances.
pub struct FoaDelayLine {
    buffer: Vec<FoaSample>,
    len: usize,
    pos: usize,
}

impl FoaDelayLine {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(3);
        Self {
            buffer: vec![FoaSample::ZERO; capacity],
            len: 2,
            pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Set the active length (RT-safe, no allocation).
    ///
    /// The position is kept inside `0..=len`.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.clamp(2, self.buffer.len() - 1);
        self.pos = self.pos.min(self.len);
    }

    #[inline]
    pub fn read(&self) -> FoaSample {
        self.buffer[self.pos]
    }

    #[inline]
    pub fn write(&mut self, sample: FoaSample) {
        self.buffer[self.pos] = sample;
    }

    /// Step the position back by one sample, wrapping to the active length.
    #[inline]
    pub fn advance(&mut self) {
        if self.pos == 0 {
            self.pos = self.len;
        }
        self.pos -= 1;
    }

    pub fn reset(&mut self) {
        self.buffer.fill(FoaSample::ZERO);
    }
}
