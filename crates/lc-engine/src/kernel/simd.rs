//! 4-frame-stride kernels over portable SIMD.
//!
//! Each stride handles 4 frames as two `f32x4`s of interleaved stereo.
//! Mono sources load 4 samples at once and duplicate each into both
//! channels; stereo sources load 8 floats straight through. The read
//! position wraps at the sample length, so a window reaching past the
//! end repeats the sample instead of reading out of bounds.

use core::sync::atomic::Ordering;

use wide::f32x4;

use lc_core::Sample;

use super::publish_cursor;
use crate::layer::Layer;

/// Fade-out for a mono source (STOP or HALT).
pub(super) fn fade_mono(
    lay: &Layer,
    snd: &Sample,
    cur: i32,
    gl: f32,
    gr: f32,
    acc: &mut [f32],
) -> i32 {
    let old = cur;
    let mut cur = cur;
    let end = lay.end.load(Ordering::Relaxed);
    let mut fade = lay.fade.load(Ordering::Relaxed);
    let fmax = lay.fmax.load(Ordering::Relaxed);
    let data = snd.data();
    let len = snd.frames();
    let gmul = f32x4::from([gl, gr, gl, gr]);

    if fade < end - cur {
        for frame in acc.chunks_exact_mut(8) {
            if fade == 0 {
                break;
            }
            if cur >= 0 {
                let fmul = gmul * f32x4::splat(fade as f32 / fmax as f32);
                mix_mono_stride(data, (cur % len) as usize, fmul, frame);
            }
            fade -= 4;
            cur += 4;
        }
        lay.fade.store(fade, Ordering::Relaxed);
    } else {
        // Too close to the end for a full envelope: play out at full gain.
        for frame in acc.chunks_exact_mut(8) {
            if cur == end {
                break;
            }
            if cur >= 0 {
                mix_mono_stride(data, (cur % len) as usize, gmul, frame);
            }
            cur += 4;
        }
    }
    publish_cursor(lay, old, cur)
}

/// Fade-out for a stereo source (STOP or HALT).
pub(super) fn fade_stereo(
    lay: &Layer,
    snd: &Sample,
    cur: i32,
    gl: f32,
    gr: f32,
    acc: &mut [f32],
) -> i32 {
    let old = cur;
    let mut cur = cur;
    let end = lay.end.load(Ordering::Relaxed);
    let mut fade = lay.fade.load(Ordering::Relaxed);
    let fmax = lay.fmax.load(Ordering::Relaxed);
    let data = snd.data();
    let len = snd.frames();
    let gmul = f32x4::from([gl, gr, gl, gr]);

    if fade < end - cur {
        for frame in acc.chunks_exact_mut(8) {
            if fade == 0 {
                break;
            }
            if cur >= 0 {
                let fmul = gmul * f32x4::splat(fade as f32 / fmax as f32);
                mix_stereo_stride(data, (cur % len) as usize, fmul, frame);
            }
            fade -= 4;
            cur += 4;
        }
        lay.fade.store(fade, Ordering::Relaxed);
    } else {
        for frame in acc.chunks_exact_mut(8) {
            if cur == end {
                break;
            }
            if cur >= 0 {
                mix_stereo_stride(data, (cur % len) as usize, gmul, frame);
            }
            cur += 4;
        }
    }
    publish_cursor(lay, old, cur)
}

/// Playback for a mono source (PLAY or LOOP), including fade-in.
pub(super) fn play_mono(
    lay: &Layer,
    snd: &Sample,
    looping: bool,
    cur: i32,
    gl: f32,
    gr: f32,
    acc: &mut [f32],
) -> i32 {
    let old = cur;
    let mut cur = cur;
    let start = lay.start.load(Ordering::Relaxed);
    let end = lay.end.load(Ordering::Relaxed);
    let mut fade = lay.fade.load(Ordering::Relaxed);
    let fmax = lay.fmax.load(Ordering::Relaxed);
    let data = snd.data();
    let len = snd.frames();
    let gmul = f32x4::from([gl, gr, gl, gr]);

    if fade < fmax {
        for frame in acc.chunks_exact_mut(8) {
            if cur == end {
                if !looping {
                    break;
                }
                cur = start;
            }
            if cur >= 0 {
                let fmul = gmul * f32x4::splat(fade as f32 / fmax as f32);
                mix_mono_stride(data, (cur % len) as usize, fmul, frame);
            }
            if fade < fmax {
                fade += 4;
            }
            cur += 4;
        }
        lay.fade.store(fade, Ordering::Relaxed);
    } else {
        for frame in acc.chunks_exact_mut(8) {
            if cur == end {
                if !looping {
                    break;
                }
                cur = start;
            }
            if cur >= 0 {
                mix_mono_stride(data, (cur % len) as usize, gmul, frame);
            }
            cur += 4;
        }
    }
    publish_cursor(lay, old, cur)
}

/// Playback for a stereo source (PLAY or LOOP), including fade-in.
pub(super) fn play_stereo(
    lay: &Layer,
    snd: &Sample,
    looping: bool,
    cur: i32,
    gl: f32,
    gr: f32,
    acc: &mut [f32],
) -> i32 {
    let old = cur;
    let mut cur = cur;
    let start = lay.start.load(Ordering::Relaxed);
    let end = lay.end.load(Ordering::Relaxed);
    let mut fade = lay.fade.load(Ordering::Relaxed);
    let fmax = lay.fmax.load(Ordering::Relaxed);
    let data = snd.data();
    let len = snd.frames();
    let gmul = f32x4::from([gl, gr, gl, gr]);

    if fade < fmax {
        for frame in acc.chunks_exact_mut(8) {
            if cur == end {
                if !looping {
                    break;
                }
                cur = start;
            }
            if cur >= 0 {
                let fmul = gmul * f32x4::splat(fade as f32 / fmax as f32);
                mix_stereo_stride(data, (cur % len) as usize, fmul, frame);
            }
            if fade < fmax {
                fade += 4;
            }
            cur += 4;
        }
        lay.fade.store(fade, Ordering::Relaxed);
    } else {
        for frame in acc.chunks_exact_mut(8) {
            if cur == end {
                if !looping {
                    break;
                }
                cur = start;
            }
            if cur >= 0 {
                mix_stereo_stride(data, (cur % len) as usize, gmul, frame);
            }
            cur += 4;
        }
    }
    publish_cursor(lay, old, cur)
}

/// Expand 4 mono frames to stereo, scale, and add into one 8-float chunk.
#[inline]
fn mix_mono_stride(data: &[f32], pos: usize, mul: f32x4, out: &mut [f32]) {
    let s = &data[pos..pos + 4];
    add4(&mut out[..4], f32x4::from([s[0], s[0], s[1], s[1]]) * mul);
    add4(&mut out[4..8], f32x4::from([s[2], s[2], s[3], s[3]]) * mul);
}

/// Scale 4 stereo frames and add them into one 8-float chunk.
#[inline]
fn mix_stereo_stride(data: &[f32], pos: usize, mul: f32x4, out: &mut [f32]) {
    // pos counts frames; two floats per frame.
    let s = &data[pos * 2..pos * 2 + 8];
    add4(&mut out[..4], f32x4::from([s[0], s[1], s[2], s[3]]) * mul);
    add4(&mut out[4..8], f32x4::from([s[4], s[5], s[6], s[7]]) * mul);
}

#[inline]
fn add4(out: &mut [f32], v: f32x4) {
    let sum = f32x4::from([out[0], out[1], out[2], out[3]]) + v;
    out.copy_from_slice(&sum.to_array());
}
