//! Sample math shared by the pipeline stages.
//!
//! All stages work on 16-bit integers at their boundaries and on `f32`
//! internally. Conversions back to integers round to nearest and clip to the
//! representable range; they never wrap.
//!
//! - [`to_sample`] - Round and clip a float to `i16`
//! - [`scale_samples`] - Apply a linear gain in place
//! - [`lerp`] / [`cubic`] - Fractional-position interpolation
//! - [`is_unity`] - Detect factors that should bypass a stage

use libm::roundf;

/// Factors closer to 1.0 than this are treated as exactly 1.0.
pub const UNITY_TOLERANCE: f32 = 1e-5;

/// Smallest speed, pitch or rate multiplier a stream accepts.
pub const MIN_FACTOR: f32 = 0.01;

/// Largest speed, pitch or rate multiplier a stream accepts.
pub const MAX_FACTOR: f32 = 100.0;

/// Frames a stage turns `frames` into at `factor`, plus `slack`.
///
/// Saturates at `usize::MAX`, which no reservation can satisfy.
#[inline]
pub(crate) fn scaled_frames(frames: usize, factor: f32, slack: usize) -> usize {
    let scaled = libm::ceil(frames as f64 / f64::from(factor));
    if scaled.is_finite() && scaled < usize::MAX as f64 {
        (scaled as usize).saturating_add(slack)
    } else {
        usize::MAX
    }
}

/// Returns true if `factor` is close enough to 1.0 to skip a stage.
///
/// # Example
///
/// ```rust
/// use warble_core::is_unity;
///
/// assert!(is_unity(1.0));
/// assert!(is_unity(1.000001));
/// assert!(!is_unity(1.01));
/// ```
#[inline]
pub fn is_unity(factor: f32) -> bool {
    (factor - 1.0).abs() < UNITY_TOLERANCE
}

/// Rounds `x` to the nearest integer and clips it to the `i16` range.
///
/// # Example
///
/// ```rust
/// use warble_core::to_sample;
///
/// assert_eq!(to_sample(1.6), 2);
/// assert_eq!(to_sample(40000.0), i16::MAX);
/// assert_eq!(to_sample(-40000.0), i16::MIN);
/// ```
#[inline]
pub fn to_sample(x: f32) -> i16 {
    roundf(x).clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Multiplies every sample by `gain`, clipping at the `i16` range.
#[inline]
pub fn scale_samples(samples: &mut [i16], gain: f32) {
    for s in samples.iter_mut() {
        *s = to_sample(f32::from(*s) * gain);
    }
}

/// Linear interpolation between `a` and `b` at position `t` in [0, 1].
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// 4-point cubic interpolation between `y1` and `y2` at position `t` in [0, 1].
///
/// `y0` precedes `y1` and `y3` follows `y2`. The curve passes through `y1`
/// at `t = 0` and `y2` at `t = 1`, and can overshoot between them.
#[inline]
pub fn cubic(y0: f32, y1: f32, y2: f32, y3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a0 = y3 - y2 - y0 + y1;
    let a1 = y0 - y1 - a0;
    let a2 = y2 - y0;

    a0 * t3 + a1 * t2 + a2 * t + y1
}
