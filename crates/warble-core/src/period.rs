//! Pitch period detection.
//!
//! The tempo engine and the chord voicer splice audio at pitch-period
//! boundaries, so they need the length of the local fundamental period.
//! [`PeriodDetector`] estimates it with a normalized cross-correlation search
//! over a bounded lag range:
//!
//! ```text
//! r(τ) = Σ x[n]·x[n+τ] / sqrt(Σ x[n]² · Σ x[n+τ]²),   n ∈ [0, W)
//! ```
//!
//! where `x` is the channel-averaged signal and `W` is one maximum period.
//! Lags span fundamentals from [`MIN_PITCH_HZ`] to [`MAX_PITCH_HZ`], so every
//! detection needs an analysis window of two maximum periods.
//!
//! # Search Order
//!
//! 1. Around the previous estimate (`prev ± max(2, prev/16)`), accepted when
//!    the score reaches 0.9.
//! 2. Full range. In [`Quality::Fast`] this runs on a copy decimated to
//!    about 4 kHz and is then refined at full resolution.
//!
//! The first local peak scoring at least 90% of the best one wins, which
//! keeps the estimate on the fundamental rather than one of its multiples.
//!
//! # Fallback
//!
//! Silence and noise do not correlate. When the best score stays under
//! [`MIN_CONFIDENCE`] the detector returns the previous confident estimate,
//! or a 200 Hz default before the first one.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use libm::sqrtf;

use crate::error::{Result, StreamError};

/// Lowest detectable fundamental in Hz.
pub const MIN_PITCH_HZ: u32 = 50;

/// Highest detectable fundamental in Hz.
pub const MAX_PITCH_HZ: u32 = 1000;

/// Minimum correlation score for an estimate to be trusted.
pub const MIN_CONFIDENCE: f32 = 0.5;

const DEFAULT_PITCH_HZ: u32 = 200;
const DECIMATED_RATE_HZ: u32 = 4000;
const SEED_ACCEPT: f32 = 0.9;
const PEAK_RATIO: f32 = 0.9;

/// Speed/quality trade-off for period detection and interpolation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Quality {
    /// Decimated coarse search and linear interpolation.
    #[default]
    Fast,
    /// Full-resolution search and 4-point cubic interpolation.
    High,
}

/// Result of one period detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodEstimate {
    /// Period length in frames.
    pub period: usize,
    /// Correlation score of the best candidate, in [-1, 1].
    pub confidence: f32,
}

impl PeriodEstimate {
    /// Returns true if the estimate came from the signal rather than the fallback.
    pub fn is_confident(&self) -> bool {
        self.confidence >= MIN_CONFIDENCE
    }
}

/// Finds the local pitch period of interleaved 16-bit audio.
///
/// # Example
///
/// ```rust
/// use warble_core::PeriodDetector;
///
/// let sample_rate = 16000;
/// let mut detector = PeriodDetector::new(sample_rate);
///
/// // 500 Hz tone: 32 samples per period
/// let tone: Vec<i16> = (0..detector.window_frames())
///     .map(|n| {
///         let phase = 2.0 * core::f32::consts::PI * 500.0 * n as f32 / sample_rate as f32;
///         (libm::sinf(phase) * 12000.0) as i16
///     })
///     .collect();
///
/// let estimate = detector.detect(&tone, 1);
/// assert_eq!(estimate.period, 32);
/// assert!(estimate.is_confident());
/// ```
#[derive(Debug, Clone)]
pub struct PeriodDetector {
    min_period: usize,
    max_period: usize,
    default_period: usize,
    decimation: usize,
    quality: Quality,
    previous: Option<usize>,
    /// Channel-averaged analysis window.
    mono: Vec<f32>,
    /// `mono` averaged over `decimation` frames.
    coarse: Vec<f32>,
    /// Per-lag scores of the current search.
    scores: Vec<f32>,
}

impl PeriodDetector {
    /// Creates a detector for the given sample rate.
    ///
    /// # Panics
    ///
    /// Panics if `sample_rate` is 0. Use [`try_new`](Self::try_new) for a
    /// rate that has not been checked.
    pub fn new(sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "sample rate must be > 0");

        let min_period = ((sample_rate / MAX_PITCH_HZ) as usize).max(1);
        let max_period = ((sample_rate / MIN_PITCH_HZ) as usize).max(min_period + 1);
        let default_period =
            ((sample_rate / DEFAULT_PITCH_HZ) as usize).clamp(min_period, max_period);
        let decimation = ((sample_rate / DECIMATED_RATE_HZ) as usize).max(1);
        let window = 2 * max_period;

        Self {
            min_period,
            max_period,
            default_period,
            decimation,
            quality: Quality::Fast,
            previous: None,
            mono: vec![0.0; window],
            coarse: vec![0.0; window / decimation],
            scores: Vec::with_capacity(max_period + 3),
        }
    }

    /// Creates a detector, rejecting a zero sample rate.
    pub fn try_new(sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(StreamError::InvalidSampleRate(sample_rate));
        }
        Ok(Self::new(sample_rate))
    }

    /// Shortest period the detector reports, in frames.
    pub fn min_period(&self) -> usize {
        self.min_period
    }

    /// Longest period the detector reports, in frames.
    pub fn max_period(&self) -> usize {
        self.max_period
    }

    /// Frames required by [`detect`](Self::detect).
    pub fn window_frames(&self) -> usize {
        2 * self.max_period
    }

    /// Returns the current quality setting.
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Sets the search quality.
    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    /// Last confident period, used as the search hint.
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// Forgets the period history.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Estimates the period at the start of `samples`.
    ///
    /// `samples` holds interleaved frames of `channels` channels and must
    /// contain at least [`window_frames`](Self::window_frames) frames; only
    /// the first window is examined.
    pub fn detect(&mut self, samples: &[i16], channels: usize) -> PeriodEstimate {
        let window = self.window_frames();
        debug_assert!(samples.len() >= window * channels);

        self.downmix(&samples[..window * channels], channels);
        let estimate = self.search();

        if estimate.is_confident() {
            self.previous = Some(estimate.period);
            estimate
        } else {
            PeriodEstimate {
                period: self.previous.unwrap_or(self.default_period),
                confidence: estimate.confidence,
            }
        }
    }

    fn downmix(&mut self, samples: &[i16], channels: usize) {
        let scale = 1.0 / channels as f32;
        for (dst, frame) in self.mono.iter_mut().zip(samples.chunks_exact(channels)) {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            *dst = sum as f32 * scale;
        }
    }

    fn search(&mut self) -> PeriodEstimate {
        let max_period = self.max_period;

        if let Some(prev) = self.previous {
            let spread = (prev / 16).max(2);
            let lo = prev.saturating_sub(spread).max(self.min_period);
            let hi = (prev + spread).min(max_period);
            let (period, confidence) = best_lag(&self.mono, max_period, lo, hi, &mut self.scores);
            if confidence >= SEED_ACCEPT {
                return PeriodEstimate { period, confidence };
            }
        }

        let (period, confidence) = if self.quality == Quality::Fast && self.decimation > 1 {
            let d = self.decimation;
            for (dst, chunk) in self.coarse.iter_mut().zip(self.mono.chunks_exact(d)) {
                *dst = chunk.iter().sum::<f32>() / d as f32;
            }
            let lo = (self.min_period / d).max(1);
            let hi = (max_period / d).max(lo);
            let (coarse_lag, _) = best_lag(&self.coarse, max_period / d, lo, hi, &mut self.scores);

            let centre = coarse_lag * d;
            let lo = centre.saturating_sub(2 * d).max(self.min_period);
            let hi = (centre + 2 * d).min(max_period);
            best_lag(&self.mono, max_period, lo, hi, &mut self.scores)
        } else {
            best_lag(&self.mono, max_period, self.min_period, max_period, &mut self.scores)
        };

        #[cfg(feature = "tracing")]
        tracing::trace!("period_search: lag {period} score {confidence:.3}");

        PeriodEstimate { period, confidence }
    }
}

/// Scores every lag in `min_lag..=max_lag` and returns the shortest local
/// peak scoring at least [`PEAK_RATIO`] of the best one.
///
/// One extra lag is scored on each side so a peak sitting on the edge of the
/// range can still be recognized as a peak.
fn best_lag(
    signal: &[f32],
    window: usize,
    min_lag: usize,
    max_lag: usize,
    scores: &mut Vec<f32>,
) -> (usize, f32) {
    let window = window.min(signal.len());
    let reference = &signal[..window];
    let reference_energy: f32 = reference.iter().map(|&x| x * x).sum();
    let first = min_lag.saturating_sub(1).max(1);

    scores.clear();
    for lag in first..=max_lag + 1 {
        let Some(candidate) = signal.get(lag..lag + window) else {
            break;
        };
        let mut cross = 0.0;
        let mut energy = 0.0;
        for (&a, &b) in reference.iter().zip(candidate) {
            cross += a * b;
            energy += b * b;
        }
        let denom = sqrtf(reference_energy * energy);
        scores.push(if denom > f32::EPSILON { cross / denom } else { 0.0 });
    }

    let offset = min_lag - first;
    if scores.len() <= offset {
        return (min_lag, 0.0);
    }
    let last = (max_lag - first).min(scores.len() - 1);

    let (peak_idx, peak) = (offset..=last).fold((offset, f32::MIN), |best, i| {
        if scores[i] > best.1 { (i, scores[i]) } else { best }
    });

    let idx = if peak > 0.0 {
        (offset..=last)
            .find(|&i| {
                let s = scores[i];
                let left = i.checked_sub(1).map_or(f32::MIN, |j| scores[j]);
                let right = scores.get(i + 1).copied().unwrap_or(f32::MIN);
                s >= PEAK_RATIO * peak && s >= left && s >= right
            })
            .unwrap_or(peak_idx)
    } else {
        peak_idx
    };

    (first + idx, scores[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, frames: usize, channels: usize) -> Vec<i16> {
        let mut out = Vec::with_capacity(frames * channels);
        for n in 0..frames {
            let phase = 2.0 * core::f32::consts::PI * freq * n as f32 / sample_rate as f32;
            let s = (libm::sinf(phase) * 10000.0) as i16;
            for _ in 0..channels {
                out.push(s);
            }
        }
        out
    }

    fn noise(frames: usize) -> Vec<i16> {
        let mut state = 0x1234_5678u32;
        (0..frames)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 16) as i16 / 4
            })
            .collect()
    }

    #[test]
    fn try_new_rejects_zero_rate() {
        assert_eq!(
            PeriodDetector::try_new(0).unwrap_err(),
            StreamError::InvalidSampleRate(0)
        );
        assert_eq!(PeriodDetector::try_new(16000).unwrap().max_period(), 320);
    }

    #[test]
    fn range_from_sample_rate() {
        let d = PeriodDetector::new(16000);
        assert_eq!(d.min_period(), 16);
        assert_eq!(d.max_period(), 320);
        assert_eq!(d.window_frames(), 640);
    }

    #[test]
    fn detects_1khz_at_16khz() {
        let mut d = PeriodDetector::new(16000);
        let input = tone(1000.0, 16000, d.window_frames(), 1);
        let est = d.detect(&input, 1);
        assert_eq!(est.period, 16);
        assert!(est.confidence > 0.99);
    }

    #[test]
    fn detects_low_voice_at_44k() {
        for quality in [Quality::Fast, Quality::High] {
            let mut d = PeriodDetector::new(44100);
            d.set_quality(quality);
            let input = tone(120.0, 44100, d.window_frames(), 1);
            let est = d.detect(&input, 1);
            let expected = 44100.0 / 120.0;
            assert!(
                (est.period as f32 - expected).abs() <= 1.0,
                "{quality:?}: got {} expected {expected}",
                est.period
            );
        }
    }

    #[test]
    fn prefers_fundamental_over_multiples() {
        let mut d = PeriodDetector::new(16000);
        d.set_quality(Quality::High);
        let input = tone(400.0, 16000, d.window_frames(), 1);
        assert_eq!(d.detect(&input, 1).period, 40);
    }

    #[test]
    fn stereo_input_is_downmixed() {
        let mut d = PeriodDetector::new(16000);
        let input = tone(500.0, 16000, d.window_frames(), 2);
        assert_eq!(d.detect(&input, 2).period, 32);
    }

    #[test]
    fn silence_uses_default_period() {
        let mut d = PeriodDetector::new(16000);
        let input = vec![0i16; d.window_frames()];
        let est = d.detect(&input, 1);
        assert_eq!(est.period, 80);
        assert!(!est.is_confident());
        assert_eq!(d.previous(), None);
    }

    #[test]
    fn silence_after_tone_keeps_previous_period() {
        let mut d = PeriodDetector::new(16000);
        let input = tone(250.0, 16000, d.window_frames(), 1);
        assert_eq!(d.detect(&input, 1).period, 64);

        let silence = vec![0i16; d.window_frames()];
        assert_eq!(d.detect(&silence, 1).period, 64);
    }

    #[test]
    fn noise_falls_back() {
        let mut d = PeriodDetector::new(16000);
        let input = noise(d.window_frames());
        let est = d.detect(&input, 1);
        assert!(!est.is_confident(), "noise scored {}", est.confidence);
        assert_eq!(est.period, 80);
    }

    #[test]
    fn reset_forgets_history() {
        let mut d = PeriodDetector::new(16000);
        let input = tone(250.0, 16000, d.window_frames(), 1);
        d.detect(&input, 1);
        assert!(d.previous().is_some());
        d.reset();
        assert!(d.previous().is_none());
    }

    #[test]
    fn low_sample_rate_has_valid_range() {
        let d = PeriodDetector::new(500);
        assert!(d.min_period() >= 1);
        assert!(d.max_period() > d.min_period());
    }
}
