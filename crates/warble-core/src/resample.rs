//! Fractional-position resampling.
//!
//! [`Resampler`] reads its input at a fractional position that advances by
//! `factor` frames per output frame. A factor of 2 plays the input twice as
//! fast (half as many frames, every frequency doubled), 0.5 half as fast.
//!
//! The stage keeps one frame of history behind the read position and needs
//! two frames of lookahead ahead of it, so the 4-point cubic kernel always
//! has its neighbours. History frames stay at the front of the caller's
//! input buffer between passes.

use crate::buffer::SampleBuffer;
use crate::error::Result;
use crate::math::{MAX_FACTOR, MIN_FACTOR, cubic, lerp, to_sample};
use crate::period::Quality;

/// Frames of lookahead required past the read position.
const LOOKAHEAD: usize = 2;

/// Silence appended on flush so the lookahead covers the last real frame.
const FLUSH_PADDING: usize = LOOKAHEAD + 2;

/// Read-position advance per output frame. Factors outside
/// [`MIN_FACTOR`]..=[`MAX_FACTOR`] are clamped to it.
#[inline]
fn step_for(factor: f32) -> f64 {
    f64::from(factor.max(MIN_FACTOR).min(MAX_FACTOR))
}

/// Interpolation kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Straight line between the two neighbouring frames.
    #[default]
    Linear,
    /// 4-point cubic through the two frames on either side.
    Cubic,
}

impl From<Quality> for Interpolation {
    fn from(quality: Quality) -> Self {
        match quality {
            Quality::Fast => Self::Linear,
            Quality::High => Self::Cubic,
        }
    }
}

/// Streaming interpolating resampler.
///
/// # Example
///
/// ```rust
/// use warble_core::{Resampler, SampleBuffer};
///
/// let mut resampler = Resampler::default();
/// let mut input = SampleBuffer::new(1);
/// let mut output = SampleBuffer::new(1);
///
/// input.extend_from_slice(&[0, 100, 200, 300, 400, 500, 600, 700]).unwrap();
/// resampler.process(2.0, &mut input, &mut output).unwrap();
/// assert_eq!(output.as_slice(), &[0, 200, 400]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Resampler {
    interpolation: Interpolation,
    /// Read position in frames, relative to the front of the input buffer.
    position: f64,
}

impl Resampler {
    /// Creates a resampler with the given kernel.
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            interpolation,
            position: 0.0,
        }
    }

    /// Returns the interpolation kernel.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Sets the interpolation kernel.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Returns the read position to the start of the input.
    pub fn reset(&mut self) {
        self.position = 0.0;
    }

    /// Frames that `input_frames` of input turn into at `factor`.
    pub fn expected_frames(input_frames: f64, factor: f32) -> f64 {
        input_frames / step_for(factor)
    }

    /// Frames of `input` the read position has not yet passed.
    pub fn unread_frames(&self, input: &SampleBuffer) -> f64 {
        (input.frames() as f64 - self.position).max(0.0)
    }

    /// Resamples as much of `input` as the lookahead allows.
    ///
    /// Frames behind the read position are consumed; one frame of history
    /// is left in `input`. `factor` is clamped to
    /// [`MIN_FACTOR`]..=[`MAX_FACTOR`].
    pub fn process(
        &mut self,
        factor: f32,
        input: &mut SampleBuffer,
        output: &mut SampleBuffer,
    ) -> Result<()> {
        let step = step_for(factor);
        let frames = input.frames();
        let limit = frames.saturating_sub(LOOKAHEAD) as f64;

        let mut count = 0;
        let mut position = self.position;
        while position < limit {
            count += 1;
            position += step;
        }

        if count > 0 {
            let channels = input.channels();
            let samples = input.as_slice();
            let out = output.grow(count)?;
            let mut position = self.position;
            for frame in out.chunks_exact_mut(channels) {
                let index = position as usize;
                let t = (position - index as f64) as f32;
                self.interpolate(samples, channels, index, t, frame);
                position += step;
            }
            self.position = position;
        }

        let spent = (self.position as usize).saturating_sub(1).min(frames);
        input.consume(spent);
        self.position -= spent as f64;
        Ok(())
    }

    /// Resamples everything left in `input`, padding with silence.
    ///
    /// The output runs a few frames past the real content; callers trim it
    /// to [`expected_frames`](Self::expected_frames). The read position is
    /// reset.
    pub fn flush(
        &mut self,
        factor: f32,
        input: &mut SampleBuffer,
        output: &mut SampleBuffer,
    ) -> Result<()> {
        if !input.is_empty() {
            input.extend_silence(FLUSH_PADDING)?;
            self.process(factor, input, output)?;
            input.clear();
        }
        self.reset();
        Ok(())
    }

    /// Drops the history frames already read and resets the position.
    ///
    /// Whatever remains in `input` has not been emitted yet.
    pub fn settle(&mut self, input: &mut SampleBuffer) {
        let spent = libm::ceil(self.position).max(0.0) as usize;
        input.consume(spent.min(input.frames()));
        self.reset();
    }

    /// Moves `input` to `output` unchanged, skipping frames already emitted.
    pub fn bypass(&mut self, input: &mut SampleBuffer, output: &mut SampleBuffer) -> Result<()> {
        self.settle(input);
        output.append(input)
    }

    fn interpolate(
        &self,
        samples: &[i16],
        channels: usize,
        index: usize,
        t: f32,
        out: &mut [i16],
    ) {
        let at = |frame: usize, ch: usize| f32::from(samples[frame * channels + ch]);
        match self.interpolation {
            Interpolation::Linear => {
                for (ch, dst) in out.iter_mut().enumerate() {
                    *dst = to_sample(lerp(at(index, ch), at(index + 1, ch), t));
                }
            }
            Interpolation::Cubic => {
                let before = index.saturating_sub(1);
                for (ch, dst) in out.iter_mut().enumerate() {
                    *dst = to_sample(cubic(
                        at(before, ch),
                        at(index, ch),
                        at(index + 1, ch),
                        at(index + 2, ch),
                        t,
                    ));
                }
            }
        }
    }
}
