//! Error types for stream operations.
//!
//! Two kinds of failure exist: resource exhaustion while growing a buffer,
//! which is recoverable and leaves the stream untouched, and contract
//! violations (malformed arguments), which are rejected before any state
//! changes. Degenerate signals such as silence never produce an error.

use thiserror::Error;

/// Errors returned by [`Stream`](crate::Stream) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    /// A buffer could not grow to hold the requested number of samples.
    #[error("failed to reserve space for {requested} samples")]
    OutOfMemory {
        /// Number of additional samples that could not be reserved.
        requested: usize,
    },

    /// Input length is not a whole number of frames.
    #[error("{len} samples is not a multiple of {channels} channels")]
    PartialFrame {
        /// Length of the rejected input, in samples (or bytes for byte I/O).
        len: usize,
        /// Channel count of the stream.
        channels: usize,
    },

    /// Read buffer cannot hold a single frame.
    #[error("buffer of {capacity} samples cannot hold one frame of {channels} channels")]
    BufferTooSmall {
        /// Capacity of the rejected buffer, in samples (or bytes for byte I/O).
        capacity: usize,
        /// Channel count of the stream.
        channels: usize,
    },

    /// Sample rate must be non-zero.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// Channel count must be non-zero.
    #[error("invalid channel count: {0}")]
    InvalidChannelCount(usize),

    /// A control parameter was zero, negative, or not finite.
    #[error("invalid value {value} for parameter '{name}'")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// Channel count cannot change while samples are still buffered.
    #[error("{frames} frames of the previous channel layout are still buffered")]
    PendingSamples {
        /// Frames still held by the stream.
        frames: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_frame_display() {
        let err = StreamError::PartialFrame {
            len: 5,
            channels: 2,
        };
        assert_eq!(err.to_string(), "5 samples is not a multiple of 2 channels");
    }

    #[test]
    fn invalid_parameter_display() {
        let err = StreamError::InvalidParameter {
            name: "speed",
            value: -1.0,
        };
        assert_eq!(err.to_string(), "invalid value -1 for parameter 'speed'");
    }

    #[test]
    fn out_of_memory_display() {
        let err = StreamError::OutOfMemory { requested: 4096 };
        assert!(err.to_string().contains("4096"));
    }
}
