//! Duration-preserving pitch shifting.
//!
//! A pitch shift by `p` is a time stretch by `1/p` followed by resampling
//! by `p`: the stretch keeps frequencies and scales duration, the resample
//! restores the duration and scales frequencies.
//!
//! In normal mode the stream folds the stretch into its own tempo stage, so
//! [`PitchShifter`] only resamples. In chord mode the [`ChordVoicer`] runs
//! the whole shift on a private copy and layers it over the dry signal.

use crate::buffer::SampleBuffer;
use crate::error::Result;
use crate::math::{is_unity, scaled_frames, to_sample};
use crate::period::Quality;
use crate::resample::{Interpolation, Resampler};
use crate::tempo::TempoEngine;

/// Gain applied to each voice of the chord mix.
const CHORD_VOICE_GAIN: f32 = 0.5;

/// Layers a pitch-shifted voice over the dry signal.
///
/// The dry input is held back until the shifted voice for the same frames
/// is ready, then both are mixed at half level. The mix is never louder
/// than the louder of the two voices, so it cannot clip.
#[derive(Debug, Clone)]
pub struct ChordVoicer {
    dry: SampleBuffer,
    pending: SampleBuffer,
    stretched: SampleBuffer,
    shifted: SampleBuffer,
    tempo: TempoEngine,
    resampler: Resampler,
}

impl ChordVoicer {
    /// Creates a voicer for the given format.
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            dry: SampleBuffer::new(channels),
            pending: SampleBuffer::new(channels),
            stretched: SampleBuffer::new(channels),
            shifted: SampleBuffer::new(channels),
            tempo: TempoEngine::new(sample_rate),
            resampler: Resampler::default(),
        }
    }

    /// Dry frames waiting for their shifted counterpart.
    pub fn pending_frames(&self) -> usize {
        self.dry.frames()
    }

    /// Reserves room for `frames` more input frames at `pitch`, so the next
    /// [`process`](Self::process) over them cannot fail to allocate.
    pub fn reserve(&mut self, frames: usize, pitch: f32) -> Result<()> {
        let slack = self.tempo.window_frames();
        let stretched = scaled_frames(
            self.pending.frames().saturating_add(frames),
            1.0 / pitch,
            slack,
        );
        let shifted = scaled_frames(
            self.stretched.frames().saturating_add(stretched),
            pitch,
            slack,
        );

        self.dry.reserve_frames(frames)?;
        self.pending.reserve_frames(frames)?;
        self.stretched.reserve_frames(stretched)?;
        self.shifted.reserve_frames(shifted)
    }

    /// Moves all of `input` into the voicer and emits every frame whose
    /// shifted voice is ready.
    pub fn process(
        &mut self,
        pitch: f32,
        input: &mut SampleBuffer,
        output: &mut SampleBuffer,
    ) -> Result<()> {
        self.dry.extend_from_slice(input.as_slice())?;
        if let Err(err) = self.pending.append(input) {
            self.dry.truncate_frames(self.dry.frames() - input.frames());
            return Err(err);
        }

        self.tempo
            .process(1.0 / pitch, &mut self.pending, &mut self.stretched)?;
        self.resampler
            .process(pitch, &mut self.stretched, &mut self.shifted)?;

        let frames = self.dry.frames().min(self.shifted.frames());
        self.mix(frames, output)
    }

    /// Emits every pending dry frame, padding the shifted voice with silence
    /// where it falls short.
    pub fn flush(&mut self, pitch: f32, output: &mut SampleBuffer) -> Result<()> {
        self.tempo
            .flush(1.0 / pitch, &mut self.pending, &mut self.stretched)?;
        self.resampler
            .flush(pitch, &mut self.stretched, &mut self.shifted)?;

        let frames = self.dry.frames();
        if self.shifted.frames() < frames {
            self.shifted.extend_silence(frames - self.shifted.frames())?;
        }
        self.mix(frames, output)?;
        self.clear();
        Ok(())
    }

    /// Emits pending dry frames unchanged and drops the shifted voice.
    pub fn drain_dry(&mut self, output: &mut SampleBuffer) -> Result<()> {
        output.append(&mut self.dry)?;
        self.clear();
        Ok(())
    }

    /// Drops all buffered audio and splice state.
    pub fn clear(&mut self) {
        self.dry.clear();
        self.pending.clear();
        self.stretched.clear();
        self.shifted.clear();
        self.tempo.reset();
        self.resampler.reset();
    }

    fn set_quality(&mut self, quality: Quality) {
        self.tempo.set_quality(quality);
        self.resampler.set_interpolation(quality.into());
    }

    fn set_channels(&mut self, channels: usize) {
        self.dry.set_channels(channels);
        self.pending.set_channels(channels);
        self.stretched.set_channels(channels);
        self.shifted.set_channels(channels);
        self.tempo.reset_history();
        self.resampler.reset();
    }

    fn mix(&mut self, frames: usize, output: &mut SampleBuffer) -> Result<()> {
        if frames == 0 {
            return Ok(());
        }
        let samples = frames * self.dry.channels();
        let out = output.grow(frames)?;
        let voices = self.dry.as_slice().iter().zip(self.shifted.as_slice());
        for (dst, (&dry, &wet)) in out.iter_mut().zip(voices).take(samples) {
            *dst = to_sample((f32::from(dry) + f32::from(wet)) * CHORD_VOICE_GAIN);
        }
        self.dry.consume(frames);
        self.shifted.consume(frames);
        Ok(())
    }
}

/// Final stage of the pipeline: clean transposition or chord voicing.
#[derive(Debug, Clone)]
pub struct PitchShifter {
    resampler: Resampler,
    chord: ChordVoicer,
}

impl PitchShifter {
    /// Creates a pitch stage for the given format.
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            resampler: Resampler::default(),
            chord: ChordVoicer::new(sample_rate, channels),
        }
    }

    /// Tempo factor the preceding stage must apply for this stage to keep
    /// the duration at `speed`.
    ///
    /// Chord mode does its own retiming, so only normal mode folds `pitch`
    /// into the tempo factor.
    pub fn tempo_factor(speed: f32, pitch: f32, chord: bool) -> f32 {
        if chord { speed } else { speed / pitch }
    }

    /// Frames this stage will still emit for the contents of `input`, the
    /// frames held inside the stage, and `upstream` frames yet to arrive.
    pub fn expected_frames(
        &self,
        input: &SampleBuffer,
        upstream: f64,
        pitch: f32,
        chord: bool,
    ) -> f64 {
        let incoming = self.resampler.unread_frames(input) + upstream;
        let dry = self.chord.pending_frames() as f64;
        if chord || is_unity(pitch) {
            dry + incoming
        } else {
            dry + Resampler::expected_frames(incoming, pitch)
        }
    }

    /// Dry frames held inside the chord voicer.
    pub fn pending_frames(&self) -> usize {
        self.chord.pending_frames()
    }

    /// Reserves the chord voicer's buffers for `frames` more input frames.
    /// Normal mode writes straight into the caller's output and needs none.
    pub fn reserve(&mut self, frames: usize, pitch: f32, chord: bool) -> Result<()> {
        if chord && !is_unity(pitch) {
            self.chord.reserve(frames, pitch)
        } else {
            Ok(())
        }
    }

    /// Sets interpolation and period search quality.
    pub fn set_quality(&mut self, quality: Quality) {
        self.resampler.set_interpolation(Interpolation::from(quality));
        self.chord.set_quality(quality);
    }

    /// Changes the channel layout and forgets all state.
    pub fn set_channels(&mut self, channels: usize) {
        self.resampler.reset();
        self.chord.set_channels(channels);
    }

    /// Shifts `input` into `output`.
    ///
    /// A unity `pitch` moves the input unchanged. Switching between normal
    /// and chord mode hands over cleanly: frames already emitted by one path
    /// are never emitted again by the other.
    pub fn process(
        &mut self,
        pitch: f32,
        chord: bool,
        input: &mut SampleBuffer,
        output: &mut SampleBuffer,
    ) -> Result<()> {
        let unity = is_unity(pitch);
        if chord && !unity {
            self.resampler.settle(input);
            self.chord.process(pitch, input, output)
        } else {
            self.chord.drain_dry(output)?;
            if unity {
                self.resampler.bypass(input, output)
            } else {
                self.resampler.process(pitch, input, output)
            }
        }
    }

    /// Pushes everything buffered in the stage (and `input`) to `output`.
    pub fn flush(
        &mut self,
        pitch: f32,
        chord: bool,
        input: &mut SampleBuffer,
        output: &mut SampleBuffer,
    ) -> Result<()> {
        self.process(pitch, chord, input, output)?;
        if chord && !is_unity(pitch) {
            self.chord.flush(pitch, output)
        } else {
            self.resampler.flush(pitch, input, output)
        }
    }

    /// Drops all buffered audio and state.
    pub fn clear(&mut self) {
        self.resampler.reset();
        self.chord.clear();
    }
}
