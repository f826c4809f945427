//! Interleaved sample FIFO used between pipeline stages.
//!
//! [`SampleBuffer`] holds 16-bit samples in interleaved frame order. New
//! samples are appended at the back, processed frames are consumed from the
//! front. Consumption only advances a read cursor; the dead prefix is
//! compacted away lazily, so consuming is amortized O(1) and stages can
//! always look at their pending frames as one contiguous slice.
//!
//! All growth goes through [`Vec::try_reserve`]. A failed reservation
//! returns [`StreamError::OutOfMemory`] and leaves the buffer unchanged.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::{Result, StreamError};

/// Dead prefix length (in samples) below which compaction is skipped.
const MIN_COMPACT_SAMPLES: usize = 4096;

/// FIFO of interleaved 16-bit samples, addressed in whole frames.
///
/// # Example
///
/// ```rust
/// use warble_core::SampleBuffer;
///
/// let mut buf = SampleBuffer::new(2);
/// buf.extend_from_slice(&[1, -1, 2, -2, 3, -3]).unwrap();
/// assert_eq!(buf.frames(), 3);
///
/// buf.consume(1);
/// assert_eq!(buf.as_slice(), &[2, -2, 3, -3]);
///
/// let mut out = [0i16; 2];
/// assert_eq!(buf.read_into(&mut out), 2);
/// assert_eq!(out, [2, -2]);
/// ```
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Vec<i16>,
    /// Index of the first live sample in `data`.
    head: usize,
    channels: usize,
}

impl SampleBuffer {
    /// Creates an empty buffer for `channels` interleaved channels.
    ///
    /// # Panics
    ///
    /// Panics if `channels` is 0. Use [`try_new`](Self::try_new) for a
    /// channel count that has not been checked.
    pub fn new(channels: usize) -> Self {
        assert!(channels > 0, "channel count must be > 0");
        Self {
            data: Vec::new(),
            head: 0,
            channels,
        }
    }

    /// Creates an empty buffer, rejecting a zero channel count.
    pub fn try_new(channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(StreamError::InvalidChannelCount(channels));
        }
        Ok(Self::new(channels))
    }

    /// Returns the number of interleaved channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the number of buffered samples (all channels).
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    /// Returns true if no samples are buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of buffered frames.
    #[inline]
    pub fn frames(&self) -> usize {
        self.len() / self.channels
    }

    /// Returns the buffered samples in FIFO order.
    #[inline]
    pub fn as_slice(&self) -> &[i16] {
        &self.data[self.head..]
    }

    /// Returns the buffered samples starting at `frame`.
    ///
    /// # Panics
    ///
    /// Panics if `frame > frames()`.
    #[inline]
    pub fn frames_from(&self, frame: usize) -> &[i16] {
        &self.as_slice()[frame * self.channels..]
    }

    /// Returns a mutable view of the samples starting at `frame`.
    ///
    /// # Panics
    ///
    /// Panics if `frame > frames()`.
    #[inline]
    pub fn frames_from_mut(&mut self, frame: usize) -> &mut [i16] {
        let start = self.head + frame * self.channels;
        &mut self.data[start..]
    }

    /// Frames that fit before the next reallocation.
    #[cfg(test)]
    pub(crate) fn spare_frames(&self) -> usize {
        (self.data.capacity() - self.data.len()) / self.channels
    }

    /// Ensures room for `frames` more frames without reallocating later.
    ///
    /// A request too large to represent fails with
    /// [`StreamError::OutOfMemory`] like any other failed allocation.
    pub fn reserve_frames(&mut self, frames: usize) -> Result<()> {
        self.reserve_samples(frames.saturating_mul(self.channels))
    }

    fn reserve_samples(&mut self, additional: usize) -> Result<()> {
        if self.head > 0 && self.data.len().saturating_add(additional) > self.data.capacity() {
            self.compact();
        }
        self.data.try_reserve(additional).map_err(|_| {
            #[cfg(feature = "tracing")]
            tracing::warn!("sample_buffer: failed to reserve {additional} samples");
            StreamError::OutOfMemory {
                requested: additional,
            }
        })
    }

    /// Appends interleaved samples. The length must be a whole number of frames.
    pub fn extend_from_slice(&mut self, samples: &[i16]) -> Result<()> {
        debug_assert_eq!(samples.len() % self.channels, 0);
        self.reserve_samples(samples.len())?;
        self.data.extend_from_slice(samples);
        Ok(())
    }

    /// Appends `frames` frames of silence.
    pub fn extend_silence(&mut self, frames: usize) -> Result<()> {
        let samples = frames * self.channels;
        self.reserve_samples(samples)?;
        self.data.resize(self.data.len() + samples, 0);
        Ok(())
    }

    /// Appends `frames` zeroed frames and returns them for the caller to fill.
    pub fn grow(&mut self, frames: usize) -> Result<&mut [i16]> {
        let start = self.data.len();
        self.extend_silence(frames)?;
        Ok(&mut self.data[start..])
    }

    /// Moves every frame of `other` to the back of `self`, leaving `other` empty.
    ///
    /// When `self` is empty the storage is swapped instead of copied.
    pub fn append(&mut self, other: &mut SampleBuffer) -> Result<()> {
        debug_assert_eq!(self.channels, other.channels);
        if self.is_empty() {
            core::mem::swap(&mut self.data, &mut other.data);
            core::mem::swap(&mut self.head, &mut other.head);
        } else {
            self.extend_from_slice(other.as_slice())?;
        }
        other.clear();
        Ok(())
    }

    /// Drops `frames` frames from the front.
    ///
    /// # Panics
    ///
    /// Panics if `frames > self.frames()`.
    pub fn consume(&mut self, frames: usize) {
        let samples = frames * self.channels;
        assert!(samples <= self.len(), "consumed past end of buffer");
        self.head += samples;
        if self.head == self.data.len() {
            self.clear();
        } else if self.head >= MIN_COMPACT_SAMPLES && self.head * 2 >= self.data.len() {
            self.compact();
        }
    }

    /// Copies as many whole frames as fit in `out` and consumes them.
    ///
    /// Returns the number of samples written.
    pub fn read_into(&mut self, out: &mut [i16]) -> usize {
        let frames = (out.len() / self.channels).min(self.frames());
        let samples = frames * self.channels;
        out[..samples].copy_from_slice(&self.as_slice()[..samples]);
        self.consume(frames);
        samples
    }

    /// Keeps only the first `frames` frames.
    pub fn truncate_frames(&mut self, frames: usize) {
        if frames < self.frames() {
            self.data.truncate(self.head + frames * self.channels);
        }
    }

    /// Removes all samples, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    /// Changes the channel layout. Buffered samples are discarded.
    ///
    /// # Panics
    ///
    /// Panics if `channels` is 0.
    pub fn set_channels(&mut self, channels: usize) {
        assert!(channels > 0, "channel count must be > 0");
        self.clear();
        self.channels = channels;
    }

    fn compact(&mut self) {
        self.data.drain(..self.head);
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_new_rejects_zero_channels() {
        assert_eq!(
            SampleBuffer::try_new(0).unwrap_err(),
            StreamError::InvalidChannelCount(0)
        );
        assert_eq!(SampleBuffer::try_new(3).unwrap().channels(), 3);
    }

    #[test]
    fn unrepresentable_reservation_is_out_of_memory() {
        let mut buf = SampleBuffer::new(2);
        buf.extend_from_slice(&[1, 2]).unwrap();
        assert!(matches!(
            buf.reserve_frames(usize::MAX),
            Err(StreamError::OutOfMemory { .. })
        ));
        assert_eq!(buf.as_slice(), &[1, 2]);
    }

    #[test]
    fn extend_and_consume_preserve_order() {
        let mut buf = SampleBuffer::new(1);
        buf.extend_from_slice(&[1, 2, 3, 4]).unwrap();
        buf.consume(2);
        buf.extend_from_slice(&[5, 6]).unwrap();
        assert_eq!(buf.as_slice(), &[3, 4, 5, 6]);
        assert_eq!(buf.frames(), 4);
    }

    #[test]
    fn consume_everything_resets_cursor() {
        let mut buf = SampleBuffer::new(2);
        buf.extend_from_slice(&[1, 2, 3, 4]).unwrap();
        buf.consume(2);
        assert!(buf.is_empty());
        assert_eq!(buf.head, 0);
    }

    #[test]
    fn compaction_keeps_contents() {
        let mut buf = SampleBuffer::new(1);
        let samples: Vec<i16> = (0..10_000).map(|i| (i % 1000) as i16).collect();
        buf.extend_from_slice(&samples).unwrap();
        buf.consume(6000);
        assert_eq!(buf.head, 0, "large dead prefix should be compacted");
        assert_eq!(buf.as_slice(), &samples[6000..]);
    }

    #[test]
    fn read_into_copies_whole_frames_only() {
        let mut buf = SampleBuffer::new(2);
        buf.extend_from_slice(&[1, 2, 3, 4, 5, 6]).unwrap();
        let mut out = [0i16; 5];
        assert_eq!(buf.read_into(&mut out), 4);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
        assert_eq!(buf.as_slice(), &[5, 6]);
    }

    #[test]
    fn read_into_empty_returns_zero() {
        let mut buf = SampleBuffer::new(1);
        let mut out = [0i16; 8];
        assert_eq!(buf.read_into(&mut out), 0);
    }

    #[test]
    fn append_into_empty_swaps_storage() {
        let mut a = SampleBuffer::new(1);
        let mut b = SampleBuffer::new(1);
        b.extend_from_slice(&[7, 8, 9]).unwrap();
        b.consume(1);
        a.append(&mut b).unwrap();
        assert_eq!(a.as_slice(), &[8, 9]);
        assert!(b.is_empty());
    }

    #[test]
    fn append_onto_existing_concatenates() {
        let mut a = SampleBuffer::new(1);
        let mut b = SampleBuffer::new(1);
        a.extend_from_slice(&[1]).unwrap();
        b.extend_from_slice(&[2, 3]).unwrap();
        a.append(&mut b).unwrap();
        assert_eq!(a.as_slice(), &[1, 2, 3]);
        assert!(b.is_empty());
    }

    #[test]
    fn grow_returns_zeroed_tail() {
        let mut buf = SampleBuffer::new(2);
        buf.extend_from_slice(&[1, 1]).unwrap();
        let tail = buf.grow(2).unwrap();
        assert_eq!(tail, &[0, 0, 0, 0]);
        tail[0] = 5;
        assert_eq!(buf.as_slice(), &[1, 1, 5, 0, 0, 0]);
    }

    #[test]
    fn truncate_after_consume() {
        let mut buf = SampleBuffer::new(1);
        buf.extend_from_slice(&[1, 2, 3, 4, 5]).unwrap();
        buf.consume(1);
        buf.truncate_frames(2);
        assert_eq!(buf.as_slice(), &[2, 3]);
    }

    #[test]
    fn set_channels_discards_samples() {
        let mut buf = SampleBuffer::new(1);
        buf.extend_from_slice(&[1, 2]).unwrap();
        buf.set_channels(2);
        assert!(buf.is_empty());
        assert_eq!(buf.channels(), 2);
    }
}
