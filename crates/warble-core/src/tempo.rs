//! Pitch-preserving tempo change by period deletion and duplication.
//!
//! [`TempoEngine`] walks its input one pitch period at a time. To speed up
//! it deletes a period; to slow down it plays a period twice. Each splice
//! is hidden by a crossfade a quarter of a period long, so the local
//! waveform (and with it the pitch) is untouched.
//!
//! # Scheduling
//!
//! With speed `s` and detected period `P` at read position `p`:
//!
//! | Speed | Emitted | Consumed | Then copied unchanged |
//! |-------|---------|----------|------------------------|
//! | s ≥ 2 | P/(s-1) | P + P/(s-1) | - |
//! | 1 < s < 2 | P | 2P | P(2-s)/(s-1) |
//! | 0.5 ≤ s < 1 | 2P | P | P(2s-1)/(1-s) |
//! | s < 0.5 | P + Ps/(1-s) | Ps/(1-s) | - |
//!
//! Each row consumes `s` times what it emits. The fractional part of the
//! non-integral count is carried into the next splice, so the long-run
//! tempo is exact even though every edit is a whole number of frames.
//!
//! # Latency
//!
//! The engine only acts while a full detection window (two maximum
//! periods) is buffered. [`TempoEngine::flush`] pads the tail with silence
//! to push out the remainder.

use crate::buffer::SampleBuffer;
use crate::error::Result;
use crate::math::{MAX_FACTOR, MIN_FACTOR};
use crate::overlap::overlap_add;
use crate::period::{PeriodDetector, Quality};

/// Crossfade length as a fraction of the period (1/4).
const CROSSFADE_DIVISOR: usize = 4;

/// Slowest speed the engine runs at: the slowest stream speed divided by
/// the highest pitch.
const MIN_SPEED: f32 = MIN_FACTOR * MIN_FACTOR;

/// Fastest speed the engine runs at.
const MAX_SPEED: f32 = MAX_FACTOR * MAX_FACTOR;

/// `speed` clamped to the engine's range.
#[inline]
fn clamp_speed(speed: f32) -> f64 {
    f64::from(speed.max(MIN_SPEED).min(MAX_SPEED))
}

/// Time-scales interleaved audio without changing its pitch.
///
/// # Example
///
/// ```rust
/// use warble_core::{SampleBuffer, TempoEngine};
///
/// let mut engine = TempoEngine::new(16000);
/// let mut input = SampleBuffer::new(1);
/// let mut output = SampleBuffer::new(1);
///
/// let tone: Vec<i16> = (0..16000)
///     .map(|n| (libm::sinf(n as f32 * core::f32::consts::TAU / 40.0) * 8000.0) as i16)
///     .collect();
/// input.extend_from_slice(&tone).unwrap();
///
/// engine.process(2.0, &mut input, &mut output).unwrap();
/// engine.flush(2.0, &mut input, &mut output).unwrap();
/// assert!(output.frames() > 7500);
/// ```
#[derive(Debug, Clone)]
pub struct TempoEngine {
    detector: PeriodDetector,
    /// Frames still to be copied straight through after the last splice.
    pending_copy: usize,
    /// Fractional frames owed by earlier splices.
    carry: f64,
    /// Frames emitted beyond what the consumed input called for.
    surplus: f64,
}

impl TempoEngine {
    /// Creates an engine for the given sample rate.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            detector: PeriodDetector::new(sample_rate),
            pending_copy: 0,
            carry: 0.0,
            surplus: 0.0,
        }
    }

    /// Returns the period detector.
    pub fn detector(&self) -> &PeriodDetector {
        &self.detector
    }

    /// Sets the period search quality.
    pub fn set_quality(&mut self, quality: Quality) {
        self.detector.set_quality(quality);
    }

    /// Frames that must be buffered before a splice can be made.
    pub fn window_frames(&self) -> usize {
        self.detector.window_frames()
    }

    /// Clears splice scheduling state. Period history is kept.
    pub fn reset(&mut self) {
        self.pending_copy = 0;
        self.carry = 0.0;
        self.surplus = 0.0;
    }

    /// Clears splice scheduling state and period history.
    pub fn reset_history(&mut self) {
        self.reset();
        self.detector.reset();
    }

    /// Frames still to be emitted for `input_frames` more input at `speed`.
    ///
    /// Splices emit whole periods, so output runs ahead of or behind the
    /// input between splices. That imbalance is subtracted here.
    pub fn expected_frames(&self, input_frames: f64, speed: f32) -> f64 {
        input_frames / clamp_speed(speed) - self.surplus
    }

    /// Consumes as much of `input` as possible, appending the result to `output`.
    ///
    /// Frames that cannot be processed yet stay in `input`. On error, every
    /// frame already written to `output` has also been consumed from `input`.
    /// `speed` is clamped to `MIN_FACTOR²..=MAX_FACTOR²`.
    pub fn process(
        &mut self,
        speed: f32,
        input: &mut SampleBuffer,
        output: &mut SampleBuffer,
    ) -> Result<()> {
        let mut position = 0;
        let result = self.run(clamp_speed(speed), input, output, &mut position);
        input.consume(position);
        result
    }

    /// Processes everything left in `input`, padding with silence.
    ///
    /// The output runs on past the real content; callers trim it to
    /// [`expected_frames`](Self::expected_frames). Scheduling state is reset.
    pub fn flush(
        &mut self,
        speed: f32,
        input: &mut SampleBuffer,
        output: &mut SampleBuffer,
    ) -> Result<()> {
        if !input.is_empty() {
            input.extend_silence(self.window_frames())?;
            self.process(speed, input, output)?;
            input.clear();
        }
        self.reset();
        Ok(())
    }

    fn run(
        &mut self,
        speed: f64,
        input: &SampleBuffer,
        output: &mut SampleBuffer,
        position: &mut usize,
    ) -> Result<()> {
        let channels = input.channels();
        let window = self.window_frames();

        while input.frames() >= *position + window {
            let emitted = output.frames();
            let consumed = if self.pending_copy > 0 {
                let frames = self.pending_copy.min(input.frames() - *position);
                output.extend_from_slice(&input.frames_from(*position)[..frames * channels])?;
                self.pending_copy -= frames;
                frames
            } else {
                let samples = input.frames_from(*position);
                let period = self.detector.detect(samples, channels).period;
                if speed > 1.0 {
                    self.skip_period(speed, period, samples, channels, output)?
                } else {
                    self.insert_period(speed, period, samples, channels, output)?
                }
            };
            *position += consumed;
            self.surplus += (output.frames() - emitted) as f64 - consumed as f64 / speed;
        }

        Ok(())
    }

    /// Deletes one period. Returns the frames consumed.
    fn skip_period(
        &mut self,
        speed: f64,
        period: usize,
        samples: &[i16],
        channels: usize,
        output: &mut SampleBuffer,
    ) -> Result<usize> {
        let p = period as f64;
        let (emit, copy, carry) = if speed >= 2.0 {
            let exact = p / (speed - 1.0) + self.carry;
            let emit = exact as usize;
            (emit, 0, exact - emit as f64)
        } else {
            let exact = p * (2.0 - speed) / (speed - 1.0) + self.carry;
            let copy = exact as usize;
            (period, copy, exact - copy as f64)
        };

        let fade = crossfade_frames(period, emit);
        let head = (emit - fade) * channels;
        let out = output.grow(emit)?;
        out[..head].copy_from_slice(&samples[..head]);
        overlap_add(
            &mut out[head..],
            &samples[head..emit * channels],
            &samples[(period + emit - fade) * channels..(period + emit) * channels],
            channels,
        );

        self.pending_copy = copy;
        self.carry = carry;
        Ok(period + emit)
    }

    /// Plays one period twice. Returns the frames consumed.
    fn insert_period(
        &mut self,
        speed: f64,
        period: usize,
        samples: &[i16],
        channels: usize,
        output: &mut SampleBuffer,
    ) -> Result<usize> {
        let p = period as f64;
        let (advance, copy, carry) = if speed < 0.5 {
            let exact = p * speed / (1.0 - speed) + self.carry;
            let advance = exact as usize;
            (advance, 0, exact - advance as f64)
        } else {
            let exact = p * (2.0 * speed - 1.0) / (1.0 - speed) + self.carry;
            let copy = exact as usize;
            (period, copy, exact - copy as f64)
        };

        let fade = crossfade_frames(period, advance);
        let repeat = period * channels;
        let seam = (period + fade) * channels;
        let out = output.grow(period + advance)?;
        out[..repeat].copy_from_slice(&samples[..repeat]);
        overlap_add(
            &mut out[repeat..seam],
            &samples[repeat..seam],
            &samples[..fade * channels],
            channels,
        );
        out[seam..].copy_from_slice(&samples[fade * channels..advance * channels]);

        self.pending_copy = copy;
        self.carry = carry;
        Ok(advance)
    }
}

/// Crossfade length for a splice that emits or advances `span` frames.
#[inline]
fn crossfade_frames(period: usize, span: usize) -> usize {
    span.min((period / CROSSFADE_DIVISOR).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(period: f32, frames: usize, channels: usize) -> Vec<i16> {
        let mut out = Vec::with_capacity(frames * channels);
        for n in 0..frames {
            let s = (libm::sinf(core::f32::consts::TAU * n as f32 / period) * 8000.0) as i16;
            for _ in 0..channels {
                out.push(s);
            }
        }
        out
    }

    fn stretch(speed: f32, input: &[i16], channels: usize) -> Vec<i16> {
        let mut engine = TempoEngine::new(16000);
        let mut inp = SampleBuffer::new(channels);
        let mut out = SampleBuffer::new(channels);
        for chunk in input.chunks(333 * channels) {
            inp.extend_from_slice(chunk).unwrap();
            engine.process(speed, &mut inp, &mut out).unwrap();
        }
        engine.flush(speed, &mut inp, &mut out).unwrap();
        out.as_slice().to_vec()
    }

    #[test]
    fn extreme_speeds_are_clamped() {
        let input = tone(40.0, 4000, 1);
        let out = stretch(1e30, &input, 1);
        assert!(out.len() < 4000, "{} frames", out.len());

        let engine = TempoEngine::new(16000);
        let expected = engine.expected_frames(100.0, 1e-30);
        assert!((expected - 1_000_000.0).abs() < 100.0, "{expected}");
    }

    #[test]
    fn crossfade_is_quarter_period() {
        assert_eq!(crossfade_frames(80, 80), 20);
        assert_eq!(crossfade_frames(80, 5), 5);
        assert_eq!(crossfade_frames(2, 10), 1);
        assert_eq!(crossfade_frames(80, 0), 0);
    }

    #[test]
    fn holds_back_less_than_a_window() {
        let mut engine = TempoEngine::new(16000);
        let mut inp = SampleBuffer::new(1);
        let mut out = SampleBuffer::new(1);
        inp.extend_from_slice(&tone(32.0, 10_000, 1)).unwrap();
        engine.process(1.5, &mut inp, &mut out).unwrap();
        assert!(inp.frames() < engine.window_frames());
        assert!(!out.is_empty());
    }

    #[test]
    fn waits_for_a_full_window() {
        let mut engine = TempoEngine::new(16000);
        let mut inp = SampleBuffer::new(1);
        let mut out = SampleBuffer::new(1);
        inp.extend_from_slice(&tone(32.0, 100, 1)).unwrap();
        engine.process(2.0, &mut inp, &mut out).unwrap();
        assert_eq!(inp.frames(), 100);
        assert!(out.is_empty());
    }

    #[test]
    fn output_length_tracks_speed() {
        let input = tone(40.0, 32_000, 1);
        for speed in [0.4f32, 0.75, 1.3, 2.0, 3.5] {
            let out = stretch(speed, &input, 1);
            let expected = TempoEngine::new(16000).expected_frames(32_000.0, speed);
            // flush output runs on past the real content by at most a window
            assert!(
                out.len() as f64 >= expected - 320.0,
                "speed {speed}: {} frames, expected about {expected}",
                out.len()
            );
            assert!(
                (out.len() as f64) <= expected + 640.0 / f64::from(speed) + 640.0,
                "speed {speed}: {} frames, expected about {expected}",
                out.len()
            );
        }
    }

    #[test]
    fn double_speed_of_exact_period_is_seamless() {
        // 16-frame period: every splice joins identical material.
        let input = tone(16.0, 8000, 1);
        let out = stretch(2.0, &input, 1);
        for (i, w) in out[..3000].windows(17).enumerate() {
            assert!(
                (i32::from(w[0]) - i32::from(w[16])).abs() <= 2,
                "discontinuity near frame {i}"
            );
        }
    }

    #[test]
    fn stereo_channels_stay_aligned() {
        let input = tone(50.0, 12_000, 2);
        let out = stretch(0.6, &input, 2);
        for frame in out.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }
}
