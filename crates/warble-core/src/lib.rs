//! Warble Core - streaming speed, pitch and rate transformation
//!
//! This crate changes the tempo, pitch and playback rate of interleaved
//! 16-bit PCM as it streams through, with bounded latency and without ever
//! holding the whole signal in memory. It works entirely in the time domain:
//! pitch periods are detected, then deleted or repeated with crossfaded
//! seams, and interpolating resamplers handle the frequency side.
//!
//! # Core Abstractions
//!
//! ## Streaming
//!
//! - [`Stream`] - Write samples in, read transformed samples out
//! - [`StreamParams`] - Speed, pitch, rate, volume, chord mode and quality
//! - [`change_speed`] - One-shot transformation of a whole block
//!
//! ## Pipeline Stages
//!
//! - [`Resampler`] - Fractional-position resampling (rate and pitch)
//! - [`TempoEngine`] - Pitch-preserving tempo change by period splicing
//! - [`PitchShifter`] / [`ChordVoicer`] - Clean transposition or layered voices
//!
//! ## Building Blocks
//!
//! - [`PeriodDetector`] - Normalized cross-correlation period search
//! - [`SampleBuffer`] - Interleaved FIFO with fallible growth
//! - [`overlap_add`] - Linear crossfade between two segments
//! - Sample math: [`to_sample`], [`scale_samples`], [`is_unity`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! warble-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use warble_core::Stream;
//!
//! let mut stream = Stream::new(44100, 2).unwrap();
//! stream.set_speed(1.25).unwrap();
//! stream.set_pitch(0.9).unwrap();
//!
//! let chunk = vec![0i16; 2 * 4096];
//! let mut out = vec![0i16; 2 * 4096];
//! for _ in 0..10 {
//!     stream.write(&chunk).unwrap();
//!     while stream.read(&mut out).unwrap() > 0 {
//!         // hand `out` to the audio device
//!     }
//! }
//!
//! stream.flush().unwrap();
//! while stream.read(&mut out).unwrap() > 0 {}
//! ```
//!
//! # Design Principles
//!
//! - **Bounded latency**: stages hold at most one analysis window
//! - **Bit-exact passthrough**: unity stages copy frames untouched
//! - **Recoverable allocation failure**: all growth goes through `try_reserve`
//! - **No dependencies on std**: `libm` for math, `alloc` for buffers

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod buffer;
pub mod error;
pub mod math;
pub mod overlap;
pub mod period;
pub mod pitch;
pub mod resample;
pub mod stream;
pub mod tempo;

// Re-export main types at crate root
pub use buffer::SampleBuffer;
pub use error::{Result, StreamError};
pub use math::{
    MAX_FACTOR, MIN_FACTOR, UNITY_TOLERANCE, cubic, is_unity, lerp, scale_samples, to_sample,
};
pub use overlap::overlap_add;
pub use period::{
    MAX_PITCH_HZ, MIN_CONFIDENCE, MIN_PITCH_HZ, PeriodDetector, PeriodEstimate, Quality,
};
pub use pitch::{ChordVoicer, PitchShifter};
pub use resample::{Interpolation, Resampler};
pub use stream::{Stream, StreamParams, change_speed};
pub use tempo::TempoEngine;
