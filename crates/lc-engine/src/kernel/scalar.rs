//! Frame-by-frame kernels, used when the `simd` feature is off.
//!
//! Identical contract to the strided variant: the read position wraps at
//! the sample length, a negative cursor advances without reading, and the
//! advanced cursor publishes through a CAS that concurrent seeks win.
//! The envelope moves one frame at a time instead of four.

use core::sync::atomic::Ordering;

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

    if fade < end - cur {
        for frame in acc.chunks_exact_mut(2) {
            if fade == 0 {
                break;
            }
            if cur >= 0 {
                let f = fade as f32 / fmax as f32;
                let s = data[(cur % len) as usize];
                frame[0] += s * f * gl;
                frame[1] += s * f * gr;
            }
            fade -= 1;
            cur += 1;
        }
        lay.fade.store(fade, Ordering::Relaxed);
    } else {
        // Too close to the end for a full envelope: play out at full gain.
        for frame in acc.chunks_exact_mut(2) {
            if cur == end {
                break;
            }
            if cur >= 0 {
                let s = data[(cur % len) as usize];
                frame[0] += s * gl;
                frame[1] += s * gr;
            }
            cur += 1;
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

    if fade < end - cur {
        for frame in acc.chunks_exact_mut(2) {
            if fade == 0 {
                break;
            }
            if cur >= 0 {
                let f = fade as f32 / fmax as f32;
                let off = ((cur % len) * 2) as usize;
                frame[0] += data[off] * f * gl;
                frame[1] += data[off + 1] * f * gr;
            }
            fade -= 1;
            cur += 1;
        }
        lay.fade.store(fade, Ordering::Relaxed);
    } else {
        for frame in acc.chunks_exact_mut(2) {
            if cur == end {
                break;
            }
            if cur >= 0 {
                let off = ((cur % len) * 2) as usize;
                frame[0] += data[off] * gl;
                frame[1] += data[off + 1] * gr;
            }
            cur += 1;
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

    if fade < fmax {
        for frame in acc.chunks_exact_mut(2) {
            if cur == end {
                if !looping {
                    break;
                }
                cur = start;
            }
            if cur >= 0 {
                let f = fade as f32 / fmax as f32;
                let s = data[(cur % len) as usize];
                frame[0] += s * f * gl;
                frame[1] += s * f * gr;
            }
            if fade < fmax {
                fade += 1;
            }
            cur += 1;
        }
        lay.fade.store(fade, Ordering::Relaxed);
    } else {
        for frame in acc.chunks_exact_mut(2) {
            if cur == end {
                if !looping {
                    break;
                }
                cur = start;
            }
            if cur >= 0 {
                let s = data[(cur % len) as usize];
                frame[0] += s * gl;
                frame[1] += s * gr;
            }
            cur += 1;
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

    if fade < fmax {
        for frame in acc.chunks_exact_mut(2) {
            if cur == end {
                if !looping {
                    break;
                }
                cur = start;
            }
            if cur >= 0 {
                let f = fade as f32 / fmax as f32;
                let off = ((cur % len) * 2) as usize;
                frame[0] += data[off] * f * gl;
                frame[1] += data[off + 1] * f * gr;
            }
            if fade < fmax {
                fade += 1;
            }
            cur += 1;
        }
        lay.fade.store(fade, Ordering::Relaxed);
    } else {
        for frame in acc.chunks_exact_mut(2) {
            if cur == end {
                if !looping {
                    break;
                }
                cur = start;
            }
            if cur >= 0 {
                let off = ((cur % len) * 2) as usize;
                frame[0] += data[off] * gl;
                frame[1] += data[off + 1] * gr;
            }
            cur += 1;
        }
    }
    publish_cursor(lay, old, cur)
}
