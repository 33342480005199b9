//! Per-layer mixing kernels.
//!
//! Four inner loops — {fade, play} × {mono source, stereo source} —
//! advance a layer's cursor and accumulate into an interleaved stereo
//! buffer. The `simd` feature selects 4-frame strides over
//! `wide::f32x4`; without it the scalar variant walks frame by frame.
//! All window and fade quantities are truncated to multiples of 4 at the
//! control surface so the strided variant always lands exactly on the
//! window edges.

#[cfg(feature = "simd")]
mod simd;
#[cfg(feature = "simd")]
use simd as variant;

#[cfg(not(feature = "simd"))]
mod scalar;
#[cfg(not(feature = "simd"))]
use scalar as variant;

use core::sync::atomic::Ordering;

use lc_core::{PlayState, StereoGain};

use crate::layer::{Layer, FLAG_FREE};

/// Mix one layer into `acc` and run its state machine for this call.
///
/// `acc` is interleaved stereo; its length bounds how far the cursor
/// advances. In the `simd` build `acc.len()` must be a multiple of 8
/// (4 frames).
pub(crate) fn mix_layer(lay: &Layer, volume: f32, acc: &mut [f32]) {
    let flag = lay.flag.load(Ordering::Acquire);
    if flag == FLAG_FREE {
        return;
    }
    let cur = lay.cursor.load(Ordering::Acquire);
    let g = StereoGain::from_bits(lay.gain.load(Ordering::Acquire));
    let (gl, gr) = (g.left * volume, g.right * volume);
    let Some(snd) = (unsafe { lay.sample() }) else {
        return;
    };

    if flag <= PlayState::Halt as u8 {
        // Fade-out path. The kernel only runs while there is envelope
        // left and room before the window end.
        let mut cur = cur;
        if lay.fade.load(Ordering::Relaxed) > 0 && cur < lay.end.load(Ordering::Relaxed) {
            cur = if snd.is_stereo() {
                variant::fade_stereo(lay, snd, cur, gl, gr, acc)
            } else {
                variant::fade_mono(lay, snd, cur, gl, gr, acc)
            };
        }
        // A stopped layer that finished its fade-out is done for good; a
        // halted one stays claimed so its handle can resume it.
        if flag == PlayState::Stop as u8
            && (lay.fade.load(Ordering::Relaxed) == 0 || cur == lay.end.load(Ordering::Relaxed))
        {
            lay.flag.store(FLAG_FREE, Ordering::Release);
        }
    } else {
        let looping = flag == PlayState::Loop as u8;
        let cur = if snd.is_stereo() {
            variant::play_stereo(lay, snd, looping, cur, gl, gr, acc)
        } else {
            variant::play_mono(lay, snd, looping, cur, gl, gr, acc)
        };
        // CAS rather than store: a concurrent control-thread state change
        // (say, to STOP) must win so its fade-out runs on the next call.
        if flag == PlayState::Play as u8 && cur == lay.end.load(Ordering::Relaxed) {
            let _ = lay
                .flag
                .compare_exchange(flag, FLAG_FREE, Ordering::AcqRel, Ordering::Acquire);
        }
    }
}

/// Publish the advanced cursor back to the layer.
///
/// A control-thread seek that lands between the kernel's snapshot and
/// this point wins: the CAS fails and the seeked position is returned.
fn publish_cursor(lay: &Layer, old: i32, new: i32) -> i32 {
    match lay
        .cursor
        .compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire)
    {
        Ok(_) => new,
        Err(seeked) => seeked,
    }
}
