//! Range checks for stream settings.
//!
//! The stream itself accepts any finite positive factor. These limits are
//! tighter: they reject values that parse fine but would make a preset
//! useless or pathological, such as a speed of 1e-9 or a volume of 1e6.
//!
//! # Example
//!
//! ```rust
//! use warble_config::{StreamSettings, validate_settings};
//!
//! let mut settings = StreamSettings::default();
//! settings.speed = 1.5;
//! validate_settings(&settings).expect("1.5x is in range");
//!
//! settings.speed = 50.0;
//! assert!(validate_settings(&settings).is_err());
//! ```

use thiserror::Error;

use crate::settings::StreamSettings;

/// Lowest accepted speed, pitch or rate factor.
pub const MIN_FACTOR: f32 = 0.05;
/// Highest accepted speed, pitch or rate factor.
pub const MAX_FACTOR: f32 = 20.0;
/// Highest accepted volume. Zero is rejected.
pub const MAX_VOLUME: f32 = 16.0;
/// Highest accepted channel count.
pub const MAX_CHANNELS: usize = 32;
/// Lowest accepted sample rate in Hz.
pub const MIN_SAMPLE_RATE: u32 = 1000;
/// Highest accepted sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Parameter value out of range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the parameter.
        param: &'static str,
        /// The value that was out of range.
        value: f32,
        /// Minimum allowed value.
        min: f32,
        /// Maximum allowed value.
        max: f32,
    },

    /// Channel count outside `1..=MAX_CHANNELS`.
    #[error("invalid channel count: {0}")]
    InvalidChannelCount(usize),

    /// Sample rate outside `MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE`.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Checks a speed, pitch or rate factor.
pub fn validate_factor(param: &'static str, value: f32) -> ValidationResult<()> {
    if (MIN_FACTOR..=MAX_FACTOR).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            param,
            value,
            min: MIN_FACTOR,
            max: MAX_FACTOR,
        })
    }
}

/// Checks a volume multiplier: `(0, MAX_VOLUME]`.
pub fn validate_volume(value: f32) -> ValidationResult<()> {
    if value > 0.0 && value <= MAX_VOLUME {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            param: "volume",
            value,
            min: 0.0,
            max: MAX_VOLUME,
        })
    }
}

/// Checks every field of `settings`, collecting all failures.
///
/// A single failure is returned as is; several are wrapped in
/// [`ValidationError::Multiple`].
pub fn validate_settings(settings: &StreamSettings) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&settings.sample_rate) {
        errors.push(ValidationError::InvalidSampleRate(settings.sample_rate));
    }
    if !(1..=MAX_CHANNELS).contains(&settings.channels) {
        errors.push(ValidationError::InvalidChannelCount(settings.channels));
    }

    let factors = [
        ("speed", settings.speed),
        ("pitch", settings.pitch),
        ("rate", settings.rate),
    ];
    for (param, value) in factors {
        if let Err(e) = validate_factor(param, value) {
            errors.push(e);
        }
    }
    if let Err(e) = validate_volume(settings.volume) {
        errors.push(e);
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
