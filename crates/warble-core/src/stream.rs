//! The streaming controller.
//!
//! [`Stream`] owns every buffer and stage of the pipeline:
//!
//! ```text
//! write → input → [rate] → rated → [tempo] → timed → [pitch] → [volume] → output → read
//! ```
//!
//! - **rate** resamples by `rate`, changing duration and pitch together.
//! - **tempo** stretches by `speed / pitch` (or `speed` in chord mode)
//!   without changing pitch.
//! - **pitch** resamples by `pitch`, restoring the duration the tempo stage
//!   set aside for it, or layers a shifted voice in chord mode.
//! - **volume** scales newly produced output with clipping.
//!
//! Each pass runs every stage once over whatever its input buffer holds.
//! A stage whose factor is unity moves its frames through untouched, so a
//! stream at default settings reproduces its input exactly.
//!
//! # Units
//!
//! A *sample* is one `i16`; a *frame* is one sample per channel.
//! [`write`](Stream::write), [`read`](Stream::read), [`flush`](Stream::flush)
//! and [`samples_available`](Stream::samples_available) count samples.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::buffer::SampleBuffer;
use crate::error::{Result, StreamError};
use crate::math::{MAX_FACTOR, MIN_FACTOR, is_unity, scale_samples, scaled_frames};
use crate::period::Quality;
use crate::pitch::PitchShifter;
use crate::resample::{Interpolation, Resampler};
use crate::tempo::TempoEngine;

/// Bytes per sample at the byte boundary.
const BYTES_PER_SAMPLE: usize = 2;

/// Control parameters of a [`Stream`].
///
/// # Example
///
/// ```rust
/// use warble_core::{Stream, StreamParams};
///
/// let mut stream = Stream::new(22050, 1).unwrap();
/// let params = StreamParams { speed: 1.5, volume: 0.8, ..StreamParams::default() };
/// stream.set_params(&params).unwrap();
/// assert_eq!(stream.speed(), 1.5);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamParams {
    /// Tempo multiplier; above 1 shortens the output.
    pub speed: f32,
    /// Frequency multiplier.
    pub pitch: f32,
    /// Tape-style multiplier of both tempo and frequency.
    pub rate: f32,
    /// Linear output gain.
    pub volume: f32,
    /// Layer the shifted voice over the dry signal instead of replacing it.
    pub chord_pitch: bool,
    /// Period search and interpolation quality.
    pub quality: Quality,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch: 1.0,
            rate: 1.0,
            volume: 1.0,
            chord_pitch: false,
            quality: Quality::Fast,
        }
    }
}

impl StreamParams {
    /// Checks speed, pitch and rate lie in [`MIN_FACTOR`]..=[`MAX_FACTOR`]
    /// and volume is finite and positive.
    pub fn validate(&self) -> Result<()> {
        check_factor("speed", self.speed)?;
        check_factor("pitch", self.pitch)?;
        check_factor("rate", self.rate)?;
        check_volume(self.volume)?;
        Ok(())
    }
}

fn check_factor(name: &'static str, value: f32) -> Result<f32> {
    if (MIN_FACTOR..=MAX_FACTOR).contains(&value) {
        Ok(value)
    } else {
        Err(StreamError::InvalidParameter { name, value })
    }
}

fn check_volume(value: f32) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(StreamError::InvalidParameter {
            name: "volume",
            value,
        })
    }
}

/// Streaming speed, pitch and rate transformer for interleaved 16-bit PCM.
///
/// # Example
///
/// ```rust
/// use warble_core::Stream;
///
/// let mut stream = Stream::new(16000, 1).unwrap();
/// stream.set_speed(2.0).unwrap();
///
/// let tone: Vec<i16> = (0..16000)
///     .map(|n| (libm::sinf(n as f32 * core::f32::consts::TAU / 16.0) * 8000.0) as i16)
///     .collect();
/// stream.write(&tone).unwrap();
/// stream.flush().unwrap();
///
/// let mut out = vec![0i16; stream.samples_available()];
/// let read = stream.read(&mut out).unwrap();
/// assert_eq!(read, 8000);
/// ```
#[derive(Debug, Clone)]
pub struct Stream {
    sample_rate: u32,
    channels: usize,
    params: StreamParams,

    input: SampleBuffer,
    rated: SampleBuffer,
    timed: SampleBuffer,
    output: SampleBuffer,

    rate_stage: Resampler,
    tempo: TempoEngine,
    pitch_stage: PitchShifter,
}

impl Stream {
    /// Creates a stream at default settings.
    ///
    /// # Errors
    ///
    /// [`StreamError::InvalidSampleRate`] or [`StreamError::InvalidChannelCount`]
    /// if either argument is zero.
    pub fn new(sample_rate: u32, channels: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(StreamError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 {
            return Err(StreamError::InvalidChannelCount(channels));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("stream_new: {sample_rate} Hz, {channels} channels");

        Ok(Self {
            sample_rate,
            channels,
            params: StreamParams::default(),
            input: SampleBuffer::new(channels),
            rated: SampleBuffer::new(channels),
            timed: SampleBuffer::new(channels),
            output: SampleBuffer::new(channels),
            rate_stage: Resampler::default(),
            tempo: TempoEngine::new(sample_rate),
            pitch_stage: PitchShifter::new(sample_rate, channels),
        })
    }

    /// Appends interleaved samples and processes as much as possible.
    ///
    /// Returns the number of samples accepted, which is always all of them.
    ///
    /// # Errors
    ///
    /// - [`StreamError::PartialFrame`] if `samples` is not a whole number of
    ///   frames. Nothing is buffered.
    /// - [`StreamError::OutOfMemory`] if the pass cannot be reserved. The
    ///   stream is untouched.
    pub fn write(&mut self, samples: &[i16]) -> Result<usize> {
        if samples.len() % self.channels != 0 {
            return Err(StreamError::PartialFrame {
                len: samples.len(),
                channels: self.channels,
            });
        }
        if samples.is_empty() {
            return Ok(0);
        }

        self.reserve_pass(samples.len() / self.channels)?;
        self.input.extend_from_slice(samples)?;
        self.process()?;
        Ok(samples.len())
    }

    /// Little-endian byte variant of [`write`](Self::write).
    ///
    /// Returns the number of bytes accepted. The length must be a multiple of
    /// two bytes per channel.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        let frame_bytes = BYTES_PER_SAMPLE * self.channels;
        if bytes.len() % frame_bytes != 0 {
            return Err(StreamError::PartialFrame {
                len: bytes.len(),
                channels: self.channels,
            });
        }
        if bytes.is_empty() {
            return Ok(0);
        }

        let frames = bytes.len() / frame_bytes;
        self.reserve_pass(frames)?;
        let dst = self.input.grow(frames)?;
        for (sample, le) in dst.iter_mut().zip(bytes.chunks_exact(BYTES_PER_SAMPLE)) {
            *sample = i16::from_le_bytes([le[0], le[1]]);
        }
        self.process()?;
        Ok(bytes.len())
    }

    /// Moves whole frames from the output into `out`.
    ///
    /// Returns the number of samples written. Zero means nothing is ready
    /// yet; it does not mean the stream has ended.
    ///
    /// # Errors
    ///
    /// [`StreamError::BufferTooSmall`] if `out` cannot hold one frame.
    pub fn read(&mut self, out: &mut [i16]) -> Result<usize> {
        if out.len() < self.channels {
            return Err(StreamError::BufferTooSmall {
                capacity: out.len(),
                channels: self.channels,
            });
        }
        Ok(self.output.read_into(out))
    }

    /// Little-endian byte variant of [`read`](Self::read).
    ///
    /// Returns the number of bytes written.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<usize> {
        let frame_bytes = BYTES_PER_SAMPLE * self.channels;
        if out.len() < frame_bytes {
            return Err(StreamError::BufferTooSmall {
                capacity: out.len(),
                channels: self.channels,
            });
        }

        let frames = (out.len() / frame_bytes).min(self.output.frames());
        let samples = frames * self.channels;
        let pairs = out.chunks_exact_mut(BYTES_PER_SAMPLE);
        for (le, sample) in pairs.zip(&self.output.as_slice()[..samples]) {
            le.copy_from_slice(&sample.to_le_bytes());
        }
        self.output.consume(frames);
        Ok(samples * BYTES_PER_SAMPLE)
    }

    /// Samples ready to be read.
    pub fn samples_available(&self) -> usize {
        self.output.len()
    }

    /// Frames ready to be read.
    pub fn frames_available(&self) -> usize {
        self.output.frames()
    }

    /// Frames written but not yet turned into output.
    pub fn pending_frames(&self) -> usize {
        self.input.frames()
            + self.rated.frames()
            + self.timed.frames()
            + self.pitch_stage.pending_frames()
    }

    /// Pushes everything buffered through the pipeline.
    ///
    /// The tail is padded with silence so every stage can finish, then the
    /// new output is trimmed to the length the current settings call for.
    /// Returns [`samples_available`](Self::samples_available). The stream
    /// stays usable; a flush with nothing pending changes nothing.
    pub fn flush(&mut self) -> Result<usize> {
        if self.pending_frames() == 0 {
            return Ok(self.samples_available());
        }

        let before = self.output.frames();
        let expected = libm::round(self.expected_flush_frames()) as usize;

        let drained = self.drain_stages();
        self.apply_volume(before);
        drained?;

        let target = before + expected;
        let produced = self.output.frames();
        if produced < target {
            self.output.extend_silence(target - produced)?;
        } else {
            self.output.truncate_frames(target);
        }
        self.reset_stages();

        #[cfg(feature = "tracing")]
        tracing::debug!("stream_flush: {expected} frames drained, {produced} produced before trim");

        Ok(self.samples_available())
    }

    /// Drops all buffered input and output and resets stage state.
    ///
    /// Period history and parameters are kept.
    pub fn clear(&mut self) {
        self.output.clear();
        self.reset_stages();
    }

    /// Returns the sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of interleaved channels.
    pub fn num_channels(&self) -> usize {
        self.channels
    }

    /// Changes the channel count.
    ///
    /// Period history is reset.
    ///
    /// # Errors
    ///
    /// - [`StreamError::InvalidChannelCount`] if `channels` is 0.
    /// - [`StreamError::PendingSamples`] while any frame is buffered,
    ///   including unread output. Flush and read everything first.
    pub fn set_num_channels(&mut self, channels: usize) -> Result<()> {
        if channels == 0 {
            return Err(StreamError::InvalidChannelCount(channels));
        }
        let frames = self.pending_frames() + self.output.frames();
        if frames > 0 {
            return Err(StreamError::PendingSamples { frames });
        }

        self.channels = channels;
        self.input.set_channels(channels);
        self.rated.set_channels(channels);
        self.timed.set_channels(channels);
        self.output.set_channels(channels);
        self.rate_stage.reset();
        self.tempo.reset_history();
        self.pitch_stage.set_channels(channels);

        #[cfg(feature = "tracing")]
        tracing::debug!("stream_channels: {channels}");
        Ok(())
    }

    /// Returns the current parameters.
    pub fn params(&self) -> StreamParams {
        self.params
    }

    /// Replaces every parameter at once. Nothing changes if any is invalid.
    pub fn set_params(&mut self, params: &StreamParams) -> Result<()> {
        params.validate()?;
        self.params = *params;
        self.set_quality(params.quality);

        #[cfg(feature = "tracing")]
        tracing::debug!("stream_params: {params:?}");
        Ok(())
    }

    /// Returns the tempo multiplier.
    pub fn speed(&self) -> f32 {
        self.params.speed
    }

    /// Sets the tempo multiplier. Values above 1 shorten the output.
    pub fn set_speed(&mut self, speed: f32) -> Result<()> {
        self.params.speed = check_factor("speed", speed)?;
        #[cfg(feature = "tracing")]
        tracing::debug!("stream_set: speed {speed}");
        Ok(())
    }

    /// Returns the frequency multiplier.
    pub fn pitch(&self) -> f32 {
        self.params.pitch
    }

    /// Sets the frequency multiplier.
    pub fn set_pitch(&mut self, pitch: f32) -> Result<()> {
        self.params.pitch = check_factor("pitch", pitch)?;
        #[cfg(feature = "tracing")]
        tracing::debug!("stream_set: pitch {pitch}");
        Ok(())
    }

    /// Returns the playback rate multiplier.
    pub fn rate(&self) -> f32 {
        self.params.rate
    }

    /// Sets the playback rate multiplier, which scales tempo and pitch together.
    pub fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.params.rate = check_factor("rate", rate)?;
        #[cfg(feature = "tracing")]
        tracing::debug!("stream_set: rate {rate}");
        Ok(())
    }

    /// Returns the output gain.
    pub fn volume(&self) -> f32 {
        self.params.volume
    }

    /// Sets the linear output gain.
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.params.volume = check_volume(volume)?;
        #[cfg(feature = "tracing")]
        tracing::debug!("stream_set: volume {volume}");
        Ok(())
    }

    /// Returns true if pitch shifts are layered over the dry signal.
    pub fn chord_pitch(&self) -> bool {
        self.params.chord_pitch
    }

    /// Chooses between clean transposition and chord voicing.
    pub fn set_chord_pitch(&mut self, chord_pitch: bool) {
        self.params.chord_pitch = chord_pitch;
        #[cfg(feature = "tracing")]
        tracing::debug!("stream_set: chord_pitch {chord_pitch}");
    }

    /// Returns the period search and interpolation quality.
    pub fn quality(&self) -> Quality {
        self.params.quality
    }

    /// Sets the period search and interpolation quality.
    pub fn set_quality(&mut self, quality: Quality) {
        self.params.quality = quality;
        self.rate_stage.set_interpolation(Interpolation::from(quality));
        self.tempo.set_quality(quality);
        self.pitch_stage.set_quality(quality);
    }

    fn tempo_factor(&self) -> f32 {
        let p = &self.params;
        PitchShifter::tempo_factor(p.speed, p.pitch, p.chord_pitch)
    }

    /// Reserves room in every buffer, the chord voicer's included, for a
    /// pass over `frames` new frames.
    fn reserve_pass(&mut self, frames: usize) -> Result<()> {
        let StreamParams {
            rate,
            pitch,
            chord_pitch,
            ..
        } = self.params;
        let slack = self.tempo.window_frames();
        let rated = scaled_frames(self.input.frames().saturating_add(frames), rate, slack);
        let timed = scaled_frames(
            self.rated.frames().saturating_add(rated),
            self.tempo_factor(),
            slack,
        );
        let voiced = self.timed.frames().saturating_add(timed);
        let retime = if chord_pitch { 1.0 } else { pitch };
        let output = scaled_frames(
            voiced.saturating_add(self.pitch_stage.pending_frames()),
            retime,
            slack,
        );

        self.input.reserve_frames(frames)?;
        self.rated.reserve_frames(rated)?;
        self.timed.reserve_frames(timed)?;
        self.pitch_stage.reserve(voiced, pitch, chord_pitch)?;
        self.output.reserve_frames(output)
    }

    fn process(&mut self) -> Result<()> {
        let before = self.output.frames();
        let result = self.run_stages();
        self.apply_volume(before);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            "stream_pass: {} frames out, {} pending",
            self.output.frames() - before,
            self.pending_frames()
        );
        result
    }

    fn run_stages(&mut self) -> Result<()> {
        let StreamParams {
            rate,
            pitch,
            chord_pitch,
            ..
        } = self.params;

        if is_unity(rate) {
            self.rate_stage.bypass(&mut self.input, &mut self.rated)?;
        } else {
            self.rate_stage
                .process(rate, &mut self.input, &mut self.rated)?;
        }

        let factor = self.tempo_factor();
        if is_unity(factor) {
            self.tempo.reset();
            self.timed.append(&mut self.rated)?;
        } else {
            self.tempo.process(factor, &mut self.rated, &mut self.timed)?;
        }

        self.pitch_stage
            .process(pitch, chord_pitch, &mut self.timed, &mut self.output)
    }

    fn drain_stages(&mut self) -> Result<()> {
        let StreamParams {
            rate,
            pitch,
            chord_pitch,
            ..
        } = self.params;

        if is_unity(rate) {
            self.rate_stage.bypass(&mut self.input, &mut self.rated)?;
        } else {
            self.rate_stage
                .flush(rate, &mut self.input, &mut self.rated)?;
        }

        let factor = self.tempo_factor();
        if is_unity(factor) {
            self.tempo.reset();
            self.timed.append(&mut self.rated)?;
        } else {
            self.tempo.flush(factor, &mut self.rated, &mut self.timed)?;
        }

        self.pitch_stage
            .flush(pitch, chord_pitch, &mut self.timed, &mut self.output)
    }

    /// Output frames the buffered input should still produce.
    fn expected_flush_frames(&self) -> f64 {
        let rate = self.params.rate;
        let rated = self.rated.frames() as f64
            + if is_unity(rate) {
                self.input.frames() as f64
            } else {
                Resampler::expected_frames(self.rate_stage.unread_frames(&self.input), rate)
            };

        let factor = self.tempo_factor();
        let timed = if is_unity(factor) {
            rated
        } else {
            self.tempo.expected_frames(rated, factor)
        };

        self.pitch_stage.expected_frames(
            &self.timed,
            timed,
            self.params.pitch,
            self.params.chord_pitch,
        )
    }

    fn apply_volume(&mut self, from_frame: usize) {
        let volume = self.params.volume;
        if !is_unity(volume) && from_frame < self.output.frames() {
            scale_samples(self.output.frames_from_mut(from_frame), volume);
        }
    }

    fn reset_stages(&mut self) {
        self.input.clear();
        self.rated.clear();
        self.timed.clear();
        self.rate_stage.reset();
        self.tempo.reset();
        self.pitch_stage.clear();
    }
}

/// Transforms a whole block in one call.
///
/// Creates a stream, applies `params`, writes `samples`, flushes, and
/// returns everything produced.
///
/// # Example
///
/// ```rust
/// use warble_core::{change_speed, StreamParams};
///
/// let input = vec![0i16; 8820];
/// let params = StreamParams { speed: 2.0, ..StreamParams::default() };
/// let output = change_speed(&input, 44100, 2, &params).unwrap();
/// assert_eq!(output.len(), 4410);
/// ```
pub fn change_speed(
    samples: &[i16],
    sample_rate: u32,
    channels: usize,
    params: &StreamParams,
) -> Result<Vec<i16>> {
    let mut stream = Stream::new(sample_rate, channels)?;
    stream.set_params(params)?;
    stream.write(samples)?;
    stream.flush()?;

    let mut out = Vec::new();
    let available = stream.samples_available();
    if available == 0 {
        return Ok(out);
    }
    out.try_reserve_exact(available)
        .map_err(|_| StreamError::OutOfMemory {
            requested: available,
        })?;
    out.resize(available, 0);
    let read = stream.read(&mut out)?;
    out.truncate(read);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, frames: usize, amplitude: f32) -> Vec<i16> {
        (0..frames)
            .map(|n| {
                let phase = core::f32::consts::TAU * freq * n as f32 / sample_rate as f32;
                (libm::sinf(phase) * amplitude) as i16
            })
            .collect()
    }

    fn drain(stream: &mut Stream) -> Vec<i16> {
        let mut out = vec![0i16; stream.samples_available().max(stream.num_channels())];
        let n = stream.read(&mut out).unwrap();
        out.truncate(n);
        out
    }

    #[test]
    fn rejects_invalid_construction() {
        assert_eq!(
            Stream::new(0, 1).unwrap_err(),
            StreamError::InvalidSampleRate(0)
        );
        assert_eq!(
            Stream::new(8000, 0).unwrap_err(),
            StreamError::InvalidChannelCount(0)
        );
    }

    #[test]
    fn defaults_are_unity() {
        let stream = Stream::new(44100, 2).unwrap();
        assert_eq!(stream.params(), StreamParams::default());
        assert_eq!(stream.sample_rate(), 44100);
        assert_eq!(stream.num_channels(), 2);
        assert!(!stream.chord_pitch());
        assert_eq!(stream.quality(), Quality::Fast);
    }

    #[test]
    fn passthrough_is_immediate_and_exact() {
        let mut stream = Stream::new(8000, 2).unwrap();
        let input: Vec<i16> = (0..400).map(|i| (i * 37 % 2000 - 1000) as i16).collect();
        assert_eq!(stream.write(&input).unwrap(), 400);
        assert_eq!(stream.samples_available(), 400);
        assert_eq!(drain(&mut stream), input);
    }

    #[test]
    fn partial_frame_is_rejected_without_side_effects() {
        let mut stream = Stream::new(8000, 2).unwrap();
        let err = stream.write(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            StreamError::PartialFrame {
                len: 3,
                channels: 2
            }
        );
        assert_eq!(stream.pending_frames(), 0);
        assert_eq!(stream.samples_available(), 0);
    }

    #[test]
    fn read_needs_room_for_a_frame() {
        let mut stream = Stream::new(8000, 2).unwrap();
        let mut one = [0i16; 1];
        assert!(matches!(
            stream.read(&mut one),
            Err(StreamError::BufferTooSmall { .. })
        ));
        let mut two = [0i16; 2];
        assert_eq!(stream.read(&mut two).unwrap(), 0);
    }

    #[test]
    fn partial_reads_keep_fifo_order() {
        let mut stream = Stream::new(8000, 1).unwrap();
        stream.write(&[1, 2, 3, 4, 5]).unwrap();
        let mut buf = [0i16; 2];
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [3, 4]);
        assert_eq!(stream.samples_available(), 1);
    }

    #[test]
    fn setters_reject_non_positive_and_non_finite() {
        let mut stream = Stream::new(8000, 1).unwrap();
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(stream.set_speed(bad).is_err());
            assert!(stream.set_pitch(bad).is_err());
            assert!(stream.set_rate(bad).is_err());
            assert!(stream.set_volume(bad).is_err());
        }
        assert_eq!(stream.params(), StreamParams::default());
    }

    #[test]
    fn extreme_factors_are_rejected_and_stream_stays_usable() {
        let mut stream = Stream::new(8000, 1).unwrap();
        for bad in [1e-20, MIN_FACTOR * 0.5, MAX_FACTOR * 2.0, 1e20] {
            assert_eq!(
                stream.set_speed(bad),
                Err(StreamError::InvalidParameter {
                    name: "speed",
                    value: bad
                })
            );
            assert!(stream.set_pitch(bad).is_err());
            assert!(stream.set_rate(bad).is_err());
        }
        assert_eq!(stream.params(), StreamParams::default());

        let input = tone(300.0, 8000, 1000, 6000.0);
        assert_eq!(stream.write(&input).unwrap(), 1000);
        stream.flush().unwrap();
        assert_eq!(drain(&mut stream), input);
    }

    #[test]
    fn factor_range_limits_produce_bounded_output() {
        let input = tone(300.0, 8000, 4000, 6000.0);

        let mut slow = Stream::new(8000, 1).unwrap();
        slow.set_speed(MIN_FACTOR).unwrap();
        slow.write(&input).unwrap();
        slow.flush().unwrap();
        let frames = slow.frames_available() as f32;
        assert!((frames - 4000.0 / MIN_FACTOR).abs() <= 4000.0, "{frames}");

        let mut fast = Stream::new(8000, 1).unwrap();
        fast.set_rate(MAX_FACTOR).unwrap();
        fast.set_speed(MAX_FACTOR).unwrap();
        fast.write(&input).unwrap();
        fast.flush().unwrap();
        assert!(fast.frames_available() <= 10, "{}", fast.frames_available());
    }

    #[test]
    fn set_params_is_all_or_nothing() {
        let mut stream = Stream::new(8000, 1).unwrap();
        let params = StreamParams {
            speed: 2.0,
            volume: -1.0,
            ..StreamParams::default()
        };
        assert!(stream.set_params(&params).is_err());
        assert_eq!(stream.speed(), 1.0);
    }

    #[test]
    fn byte_io_is_little_endian() {
        let mut stream = Stream::new(8000, 1).unwrap();
        assert_eq!(stream.write_bytes(&[0x34, 0x12, 0xff, 0xff]).unwrap(), 4);
        let mut out = [0u8; 4];
        assert_eq!(stream.read_bytes(&mut out).unwrap(), 4);
        assert_eq!(out, [0x34, 0x12, 0xff, 0xff]);
    }

    #[test]
    fn byte_io_rejects_partial_frames() {
        let mut stream = Stream::new(8000, 2).unwrap();
        assert!(matches!(
            stream.write_bytes(&[0; 6]),
            Err(StreamError::PartialFrame { len: 6, channels: 2 })
        ));
        let mut small = [0u8; 3];
        assert!(matches!(
            stream.read_bytes(&mut small),
            Err(StreamError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn channel_change_requires_empty_stream() {
        let mut stream = Stream::new(8000, 1).unwrap();
        stream.write(&[1, 2]).unwrap();
        assert!(matches!(
            stream.set_num_channels(2),
            Err(StreamError::PendingSamples { frames: 2 })
        ));
        drain(&mut stream);
        stream.set_num_channels(2).unwrap();
        assert_eq!(stream.num_channels(), 2);
        assert!(stream.write(&[1]).is_err());
        assert_eq!(
            stream.set_num_channels(0).unwrap_err(),
            StreamError::InvalidChannelCount(0)
        );
    }

    #[test]
    fn flush_on_empty_stream_is_noop() {
        let mut stream = Stream::new(16000, 1).unwrap();
        assert_eq!(stream.flush().unwrap(), 0);
        assert_eq!(stream.flush().unwrap(), 0);
        assert_eq!(stream.samples_available(), 0);
    }

    #[test]
    fn speed_change_buffers_until_flush() {
        let mut stream = Stream::new(16000, 1).unwrap();
        stream.set_speed(1.5).unwrap();
        stream.write(&tone(500.0, 16000, 300, 8000.0)).unwrap();
        assert_eq!(stream.samples_available(), 0);
        assert_eq!(stream.pending_frames(), 300);
        assert_eq!(stream.flush().unwrap(), 200);
        assert_eq!(stream.pending_frames(), 0);
    }

    #[test]
    fn flush_trims_to_expected_length() {
        let settings = [(2.0, 1.0, 1.0), (0.7, 1.3, 1.0), (1.0, 1.0, 1.6), (1.2, 0.8, 0.9)];
        for (speed, pitch, rate) in settings {
            let mut stream = Stream::new(16000, 1).unwrap();
            stream.set_speed(speed).unwrap();
            stream.set_pitch(pitch).unwrap();
            stream.set_rate(rate).unwrap();
            let input = tone(220.0, 16000, 8000, 6000.0);
            for chunk in input.chunks(500) {
                stream.write(chunk).unwrap();
            }
            let total = stream.flush().unwrap() as f32;
            let expected = 8000.0 / (speed * rate);
            assert!(
                (total - expected).abs() <= 320.0,
                "speed {speed} pitch {pitch} rate {rate}: {total} vs {expected}"
            );
        }
    }

    #[test]
    fn volume_scales_output() {
        let input = tone(300.0, 8000, 400, 10000.0);
        let mut stream = Stream::new(8000, 1).unwrap();
        stream.set_volume(0.5).unwrap();
        stream.write(&input).unwrap();
        let out = drain(&mut stream);
        for (o, i) in out.iter().zip(&input) {
            assert!((i32::from(*o) - i32::from(*i) / 2).abs() <= 1);
        }
    }

    #[test]
    fn volume_clips_instead_of_wrapping() {
        let mut stream = Stream::new(8000, 1).unwrap();
        stream.set_volume(4.0).unwrap();
        stream.write(&[20000, -20000, 100]).unwrap();
        assert_eq!(drain(&mut stream), [i16::MAX, i16::MIN, 400]);
    }

    #[test]
    fn clear_drops_everything() {
        let mut stream = Stream::new(16000, 1).unwrap();
        stream.set_speed(0.5).unwrap();
        stream.write(&tone(500.0, 16000, 2000, 8000.0)).unwrap();
        stream.clear();
        assert_eq!(stream.pending_frames(), 0);
        assert_eq!(stream.samples_available(), 0);
        assert_eq!(stream.speed(), 0.5);
    }

    #[test]
    fn change_speed_one_shot() {
        let input = tone(440.0, 22050, 22050, 8000.0);
        let params = StreamParams {
            speed: 0.5,
            ..StreamParams::default()
        };
        let out = change_speed(&input, 22050, 1, &params).unwrap();
        assert_eq!(out.len(), 44100);
    }

    #[test]
    fn change_speed_of_nothing_is_empty() {
        let params = StreamParams {
            speed: 1.7,
            ..StreamParams::default()
        };
        assert!(change_speed(&[], 8000, 2, &params).unwrap().is_empty());
    }
}
