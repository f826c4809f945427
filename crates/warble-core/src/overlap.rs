//! Linear crossfades between interleaved segments.
//!
//! Every splice the engine makes (deleting or repeating a pitch period)
//! hides its seam with a short overlap-add: one segment ramps from full
//! level to zero while the other ramps from zero to full level.
//!
//! ```text
//! out[t] = (down[t]·(n - t) + up[t]·t) / n,   t ∈ [0, n)
//! ```

/// Crossfades `down` into `up`, writing `out`.
///
/// All three slices hold the same number of interleaved frames of `channels`
/// channels. The first output frame equals `down`; the ramp approaches `up`
/// so the frame that follows the crossfade in `up`'s source continues it.
///
/// # Example
///
/// ```rust
/// use warble_core::overlap_add;
///
/// let down = [100i16, 100, 100, 100];
/// let up = [0i16, 0, 0, 0];
/// let mut out = [0i16; 4];
/// overlap_add(&mut out, &down, &up, 1);
/// assert_eq!(out, [100, 75, 50, 25]);
/// ```
#[inline]
pub fn overlap_add(out: &mut [i16], down: &[i16], up: &[i16], channels: usize) {
    debug_assert_eq!(out.len(), down.len());
    debug_assert_eq!(out.len(), up.len());

    let frames = (out.len() / channels) as i32;
    if frames == 0 {
        return;
    }

    let frame_iter = out
        .chunks_exact_mut(channels)
        .zip(down.chunks_exact(channels))
        .zip(up.chunks_exact(channels));
    for (t, ((o, d), u)) in frame_iter.enumerate() {
        let t = t as i32;
        for ((o, &d), &u) in o.iter_mut().zip(d).zip(u) {
            let mixed = (i32::from(d) * (frames - t) + i32::from(u) * t) / frames;
            *o = mixed as i16;
        }
    }
}
