//! Mixer control surface and the audio-thread render path.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "simd")]
use alloc::vec::Vec;
#[cfg(feature = "simd")]
use arrayvec::ArrayVec;

use lc_core::{PlayState, Sample, SoundHandle, StereoGain};

use crate::kernel;
use crate::layer::{Layer, FLAG_FREE};

/// Default layer-pool size exponent: 2^8 = 256 layers.
pub const DEFAULT_LAYER_BITS: u32 = 8;

/// Frames the renderer's scratch accumulator reserves up front. Requests
/// up to this size never allocate on the audio thread.
#[cfg(feature = "simd")]
const SCRATCH_FRAMES: usize = 4096;

/// State shared between the control and audio sides.
struct Shared {
    /// Mixer-wide volume as f32 bits.
    volume: AtomicU32,
    layers: Box<[Layer]>,
    /// `layers.len() - 1`; masks a handle id down to its slot index.
    mask: u32,
}

/// Control-thread surface of the engine.
///
/// Owns layer claiming and every play/seek/gain/state mutation. All
/// operations are wait-free; none of them observes or blocks on the audio
/// thread beyond single atomic operations. Only one control thread may
/// drive a mixer.
pub struct Mixer {
    shared: Arc<Shared>,
    /// Monotonic id counter; low bits are the next slot probed.
    next_id: u32,
    /// Envelope length [`Mixer::play`] gives new sounds, in frames.
    fade_default: i32,
}

/// Audio-thread surface of the engine.
///
/// Exactly one renderer exists per mixer. It is `Send` so it can move
/// into the device callback, and [`Renderer::mix`] takes `&mut self`, so
/// a second concurrent consumer cannot be expressed.
pub struct Renderer {
    shared: Arc<Shared>,
    /// Accumulator for the 4-frame-aligned mixing target.
    #[cfg(feature = "simd")]
    scratch: Vec<f32>,
    /// Up to 3 stereo frames mixed past the previous request.
    #[cfg(feature = "simd")]
    carry: ArrayVec<f32, 6>,
}

/// Negative fades are no fade; positive ones truncate to whole strides.
fn clamp_fade(fade: i32) -> i32 {
    if fade < 0 {
        0
    } else {
        fade & !3
    }
}

impl Mixer {
    /// Create a mixer with [`DEFAULT_LAYER_BITS`] and its paired renderer.
    ///
    /// `volume` scales every layer; `fade` is the default envelope length
    /// in frames for sounds started with [`Mixer::play`].
    pub fn new(volume: f32, fade: i32) -> (Mixer, Renderer) {
        Self::with_layer_bits(volume, fade, DEFAULT_LAYER_BITS)
    }

    /// Create a mixer whose pool holds `2^layer_bits` layers.
    pub fn with_layer_bits(volume: f32, fade: i32, layer_bits: u32) -> (Mixer, Renderer) {
        let count = 1usize << layer_bits;
        let layers: Box<[Layer]> = (0..count).map(|_| Layer::new()).collect();
        let shared = Arc::new(Shared {
            volume: AtomicU32::new(volume.to_bits()),
            layers,
            mask: count as u32 - 1,
        });
        let mixer = Mixer {
            shared: shared.clone(),
            next_id: 0,
            fade_default: clamp_fade(fade),
        };
        let renderer = Renderer {
            shared,
            #[cfg(feature = "simd")]
            scratch: Vec::with_capacity(SCRATCH_FRAMES * 2),
            #[cfg(feature = "simd")]
            carry: ArrayVec::new(),
        };
        (mixer, renderer)
    }

    /// Play `sample` over its whole length with the default fade.
    ///
    /// Returns a handle for later mutations, or `None` when every layer
    /// is claimed.
    pub fn play(
        &mut self,
        sample: &Arc<Sample>,
        state: PlayState,
        gain: f32,
        pan: f32,
    ) -> Option<SoundHandle> {
        self.play_advanced(sample, state, gain, pan, 0, sample.frames(), self.fade_default)
    }

    /// Play `sample` over the window `[start, end)` with an explicit fade.
    ///
    /// `start` may be negative to delay the first audible frame, and
    /// `end` may exceed the sample length, in which case the sample
    /// repeats inside the window. Frame arguments are truncated to
    /// multiples of 4. Returns `None` when the window is shorter than 4
    /// frames, ends before frame 4, or no layer is free.
    #[allow(clippy::too_many_arguments)]
    pub fn play_advanced(
        &mut self,
        sample: &Arc<Sample>,
        state: PlayState,
        gain: f32,
        pan: f32,
        start: i32,
        end: i32,
        fade: i32,
    ) -> Option<SoundHandle> {
        if (end as i64 - start as i64) < 4 || end < 4 {
            return None;
        }
        let layers = &self.shared.layers;
        for _ in 0..layers.len() {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            let lay = &layers[(id & self.shared.mask) as usize];
            if lay.flag.load(Ordering::Acquire) != FLAG_FREE {
                continue;
            }
            // Id 0 is the invalid-handle sentinel; hand out the id that
            // aliases to the same slot one generation up instead.
            let id = if id == 0 { layers.len() as u32 } else { id };
            lay.id.store(id, Ordering::Relaxed);
            // SAFETY: the slot was observed FREE, so the audio thread is
            // not reading the cell, and only this thread claims slots.
            unsafe { lay.set_sample(sample.clone()) };
            let fmax = clamp_fade(fade);
            lay.start.store(start & !3, Ordering::Relaxed);
            lay.end.store(end & !3, Ordering::Relaxed);
            lay.fmax.store(fmax, Ordering::Relaxed);
            // STOP and HALT begin fully faded out; PLAY and LOOP fully in.
            let fade0 = if (state as u8) < PlayState::Play as u8 { 0 } else { fmax };
            lay.fade.store(fade0, Ordering::Relaxed);
            lay.gain
                .store(StereoGain::from_gain_pan(gain, pan).to_bits(), Ordering::Release);
            lay.cursor.store(start & !3, Ordering::Release);
            // The flag store publishes everything above to the renderer.
            lay.flag.store(state as u8, Ordering::Release);
            return SoundHandle::new(id);
        }
        None
    }

    fn layer_for(&self, handle: SoundHandle) -> &Layer {
        &self.shared.layers[(handle.id() & self.shared.mask) as usize]
    }

    /// Update the gain and pan of a live sound.
    ///
    /// Fails when the handle is stale or the sound is already stopping.
    pub fn set_gain(&self, handle: SoundHandle, gain: f32, pan: f32) -> bool {
        let lay = self.layer_for(handle);
        if lay.id.load(Ordering::Relaxed) == handle.id()
            && lay.flag.load(Ordering::Acquire) > PlayState::Stop as u8
        {
            lay.gain
                .store(StereoGain::from_gain_pan(gain, pan).to_bits(), Ordering::Release);
            return true;
        }
        false
    }

    /// Seek a live sound.
    ///
    /// The position clamps to the play window and truncates to a multiple
    /// of 4. A seek issued while the renderer is mid-mix wins over the
    /// renderer's own cursor advancement.
    pub fn set_cursor(&self, handle: SoundHandle, cursor: i32) -> bool {
        let lay = self.layer_for(handle);
        if lay.id.load(Ordering::Relaxed) == handle.id()
            && lay.flag.load(Ordering::Acquire) > PlayState::Stop as u8
        {
            let start = lay.start.load(Ordering::Relaxed);
            let end = lay.end.load(Ordering::Relaxed);
            let cursor = if cursor < start {
                start
            } else if cursor > end {
                end
            } else {
                cursor & !3
            };
            lay.cursor.store(cursor, Ordering::Release);
            return true;
        }
        false
    }

    /// Change the state of a live sound.
    ///
    /// Succeeds trivially when the state already matches. Otherwise the
    /// change is a CAS, so a concurrent reclaim by the renderer wins and
    /// the stale handle reports failure.
    pub fn set_state(&self, handle: SoundHandle, state: PlayState) -> bool {
        let lay = self.layer_for(handle);
        if lay.id.load(Ordering::Relaxed) == handle.id() {
            let prev = lay.flag.load(Ordering::Acquire);
            if prev > PlayState::Stop as u8 {
                if prev == state as u8 {
                    return true;
                }
                return lay
                    .flag
                    .compare_exchange(prev, state as u8, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
            }
        }
        false
    }

    /// Set the mixer-wide volume. Applied from the next mix call on.
    pub fn set_volume(&self, volume: f32) {
        self.shared.volume.store(volume.to_bits(), Ordering::Release);
    }

    /// Set the fade [`Mixer::play`] gives sounds started after this call.
    pub fn set_default_fade(&mut self, fade: i32) {
        self.fade_default = clamp_fade(fade);
    }

    /// Fade out every live sound and release its layer.
    ///
    /// Every outstanding handle becomes stale; later `set_*` calls on
    /// them fail.
    pub fn stop_all(&self) {
        for lay in self.shared.layers.iter() {
            if lay.flag.load(Ordering::Acquire) > PlayState::Stop as u8 {
                lay.flag.store(PlayState::Stop as u8, Ordering::Release);
            }
        }
    }

    /// Fade out every playing or looping sound, keeping it resumable.
    pub fn halt_all(&self) {
        for lay in self.shared.layers.iter() {
            let flag = lay.flag.load(Ordering::Acquire);
            if flag > PlayState::Halt as u8 {
                let _ = lay.flag.compare_exchange(
                    flag,
                    PlayState::Halt as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
        }
    }

    /// Resume every halted sound with a fade-in. Looping and stopping
    /// sounds are unaffected.
    pub fn resume_all(&self) {
        for lay in self.shared.layers.iter() {
            let _ = lay.flag.compare_exchange(
                PlayState::Halt as u8,
                PlayState::Play as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }
}

impl Renderer {
    /// Fill `out` with interleaved stereo frames and return the frame
    /// count written, always `out.len() / 2`.
    ///
    /// Internally the mix runs in whole 4-frame strides; when that
    /// overshoots the request the spare frames (at most 3) carry over to
    /// the front of the next call.
    #[cfg(feature = "simd")]
    pub fn mix(&mut self, out: &mut [f32]) -> usize {
        let frames = out.len() / 2;
        let out = &mut out[..frames * 2];

        // Serve carried frames from the previous call first.
        let carried = if self.carry.is_empty() {
            0
        } else if out.len() <= self.carry.len() {
            out.copy_from_slice(&self.carry[..out.len()]);
            self.carry.drain(..out.len());
            return frames;
        } else {
            let n = self.carry.len();
            out[..n].copy_from_slice(&self.carry);
            self.carry.clear();
            n
        };
        let out = &mut out[carried..];

        let rem_frames = out.len() / 2;
        let asize = (rem_frames + 3) & !3;
        self.scratch.clear();
        self.scratch.resize(asize * 2, 0.0);

        let volume = f32::from_bits(self.shared.volume.load(Ordering::Acquire));
        for lay in self.shared.layers.iter() {
            kernel::mix_layer(lay, volume, &mut self.scratch);
        }

        #[cfg(feature = "clip")]
        for s in self.scratch.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }

        out.copy_from_slice(&self.scratch[..out.len()]);
        self.carry
            .extend(self.scratch[out.len()..].iter().copied());
        frames
    }

    /// Fill `out` with interleaved stereo frames and return the frame
    /// count written, always `out.len() / 2`.
    #[cfg(not(feature = "simd"))]
    pub fn mix(&mut self, out: &mut [f32]) -> usize {
        let frames = out.len() / 2;
        let out = &mut out[..frames * 2];
        out.fill(0.0);

        let volume = f32::from_bits(self.shared.volume.load(Ordering::Acquire));
        for lay in self.shared.layers.iter() {
            kernel::mix_layer(lay, volume, out);
        }

        #[cfg(feature = "clip")]
        for s in out.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn mono(data: &[f32]) -> Arc<Sample> {
        Arc::new(Sample::from_frames(1, data).unwrap())
    }

    fn stereo(data: &[f32]) -> Arc<Sample> {
        Arc::new(Sample::from_frames(2, data).unwrap())
    }

    fn mix_frames(renderer: &mut Renderer, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames * 2];
        assert_eq!(renderer.mix(&mut out), frames);
        out
    }

    /// Cursor of the slot a handle points at, read the renderer's way.
    fn cursor_of(mixer: &Mixer, handle: SoundHandle) -> i32 {
        mixer.layer_for(handle).cursor.load(Ordering::Acquire)
    }

    #[test]
    fn silence_with_no_layers() {
        let (_mixer, mut renderer) = Mixer::new(1.0, 0);
        let out = mix_frames(&mut renderer, 128);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn steady_state_mono_loop() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 4]);
        mixer.play(&sample, PlayState::Loop, 1.0, 0.0).unwrap();

        let out = mix_frames(&mut renderer, 8);
        // 0.5 sample × 0.5 per-channel gain on both channels.
        assert!(out.iter().all(|&s| s == 0.25), "{:?}", out);
    }

    #[test]
    fn stereo_sample_passes_through() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let data = [0.1, -0.1, 0.2, -0.2, 0.3, -0.3, 0.4, -0.4];
        let sample = stereo(&data);
        // Gain 2 at center pan is unity per channel.
        mixer.play(&sample, PlayState::Loop, 2.0, 0.0).unwrap();

        let out = mix_frames(&mut renderer, 8);
        assert_eq!(out[..8], data);
        assert_eq!(out[8..16], data);
    }

    #[test]
    fn mono_expands_to_both_channels() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.8, 0.6, 0.4, 0.2]);
        mixer.play(&sample, PlayState::Loop, 2.0, 0.0).unwrap();

        let out = mix_frames(&mut renderer, 4);
        assert_eq!(out, [0.8, 0.8, 0.6, 0.6, 0.4, 0.4, 0.2, 0.2]);
    }

    #[test]
    fn pan_moves_signal_between_channels() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 4]);
        mixer.play(&sample, PlayState::Loop, 1.0, 1.0).unwrap();

        let out = mix_frames(&mut renderer, 4);
        for frame in out.chunks_exact(2) {
            assert_eq!(frame[0], 0.0);
            assert_eq!(frame[1], 0.5);
        }
    }

    #[test]
    fn volume_scales_all_layers() {
        let (mut mixer, mut renderer) = Mixer::new(0.5, 0);
        let sample = mono(&[0.5; 4]);
        mixer.play(&sample, PlayState::Loop, 1.0, 0.0).unwrap();

        let out = mix_frames(&mut renderer, 4);
        assert!(out.iter().all(|&s| s == 0.125));

        mixer.set_volume(2.0);
        let out = mix_frames(&mut renderer, 4);
        assert!(out.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn mixing_is_linear_in_layers() {
        let a = mono(&[0.25, -0.125, 0.0625, 0.5]);
        let b = mono(&[0.03125, 0.125, -0.25, 0.0625]);

        let (mut both_mixer, mut both) = Mixer::new(1.0, 0);
        both_mixer.play(&a, PlayState::Loop, 1.0, 0.0).unwrap();
        both_mixer.play(&b, PlayState::Loop, 1.0, 0.0).unwrap();

        let (mut a_mixer, mut only_a) = Mixer::new(1.0, 0);
        a_mixer.play(&a, PlayState::Loop, 1.0, 0.0).unwrap();
        let (mut b_mixer, mut only_b) = Mixer::new(1.0, 0);
        b_mixer.play(&b, PlayState::Loop, 1.0, 0.0).unwrap();

        let sum = mix_frames(&mut both, 16);
        let oa = mix_frames(&mut only_a, 16);
        let ob = mix_frames(&mut only_b, 16);
        for i in 0..sum.len() {
            assert_eq!(sum[i], oa[i] + ob[i]);
        }
    }

    #[test]
    fn clipping_bounds_the_output() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[1.0; 4]);
        // Gain 8 at center is 4.0 per channel, far past full scale.
        mixer.play(&sample, PlayState::Loop, 8.0, 0.0).unwrap();

        let out = mix_frames(&mut renderer, 8);
        assert!(out.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn pool_exhausts_at_capacity_and_recovers() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.1; 4]);

        let handles: Vec<_> = (0..256)
            .map(|_| mixer.play(&sample, PlayState::Loop, 1.0, 0.0))
            .collect();
        assert!(handles.iter().all(|h| h.is_some()));
        assert!(mixer.play(&sample, PlayState::Loop, 1.0, 0.0).is_none());

        mixer.stop_all();
        mix_frames(&mut renderer, 4);
        assert!(mixer.play(&sample, PlayState::Loop, 1.0, 0.0).is_some());
    }

    #[test]
    fn handles_are_distinct_and_nonzero() {
        let (mut mixer, _renderer) = Mixer::with_layer_bits(1.0, 0, 4);
        let sample = mono(&[0.1; 4]);
        let mut seen = Vec::new();
        for _ in 0..16 {
            let h = mixer.play(&sample, PlayState::Loop, 1.0, 0.0).unwrap();
            assert!(!seen.contains(&h.id()));
            seen.push(h.id());
        }
    }

    #[test]
    fn stop_all_invalidates_handles() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 8]);
        let handle = mixer.play(&sample, PlayState::Loop, 1.0, 0.0).unwrap();

        mixer.stop_all();
        // Zero fade: the layer reclaims on the next mix call.
        mix_frames(&mut renderer, 8);
        assert!(!mixer.set_state(handle, PlayState::Play));
        assert!(!mixer.set_gain(handle, 1.0, 0.0));
        assert!(!mixer.set_cursor(handle, 0));
    }

    #[test]
    fn play_rejects_degenerate_windows() {
        let (mut mixer, _renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 16]);
        assert!(mixer
            .play_advanced(&sample, PlayState::Play, 1.0, 0.0, 8, 10, 0)
            .is_none());
        assert!(mixer
            .play_advanced(&sample, PlayState::Play, 1.0, 0.0, -8, 0, 0)
            .is_none());
    }

    #[test]
    fn looping_window_wraps_cursor() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 16]);
        let handle = mixer
            .play_advanced(&sample, PlayState::Loop, 1.0, 0.0, 0, 8, 0)
            .unwrap();

        mix_frames(&mut renderer, 8);
        assert_eq!(cursor_of(&mixer, handle), 8);
        mix_frames(&mut renderer, 4);
        assert_eq!(cursor_of(&mixer, handle), 4);
        mix_frames(&mut renderer, 8);
        assert_eq!(cursor_of(&mixer, handle), 4);
    }

    #[test]
    fn set_cursor_clamps_and_truncates() {
        let (mut mixer, _renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 16]);
        let handle = mixer
            .play_advanced(&sample, PlayState::Loop, 1.0, 0.0, 0, 8, 0)
            .unwrap();

        assert!(mixer.set_cursor(handle, 100));
        assert_eq!(cursor_of(&mixer, handle), 8);
        assert!(mixer.set_cursor(handle, -20));
        assert_eq!(cursor_of(&mixer, handle), 0);
        assert!(mixer.set_cursor(handle, 6));
        assert_eq!(cursor_of(&mixer, handle), 4);
    }

    #[test]
    fn pre_delay_plays_silence_first() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 16]);
        mixer
            .play_advanced(&sample, PlayState::Play, 1.0, 0.0, -64, 16, 0)
            .unwrap();

        let out = mix_frames(&mut renderer, 64);
        assert!(out.iter().all(|&s| s == 0.0));
        let out = mix_frames(&mut renderer, 16);
        assert!(out.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn oversized_window_repeats_sample() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.8, 0.6, 0.4, 0.2]);
        let handle = mixer
            .play_advanced(&sample, PlayState::Play, 2.0, 0.0, 0, 8, 0)
            .unwrap();

        let out = mix_frames(&mut renderer, 8);
        let expect = [0.8, 0.8, 0.6, 0.6, 0.4, 0.4, 0.2, 0.2];
        assert_eq!(out[..8], expect);
        assert_eq!(out[8..16], expect);
        // The window ended, so the layer reclaimed and the handle is dead.
        assert!(!mixer.set_gain(handle, 1.0, 0.0));
    }

    #[test]
    fn play_reclaims_layer_at_window_end() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 8]);
        let handle = mixer.play(&sample, PlayState::Play, 1.0, 0.0).unwrap();

        mix_frames(&mut renderer, 8);
        assert!(!mixer.set_state(handle, PlayState::Play));

        // The freed slot is claimable again under a fresh id.
        let next = mixer.play(&sample, PlayState::Play, 1.0, 0.0).unwrap();
        assert_ne!(next, handle);
    }

    #[test]
    fn set_state_is_idempotent() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 4]);
        let handle = mixer.play(&sample, PlayState::Loop, 1.0, 0.0).unwrap();

        assert!(mixer.set_state(handle, PlayState::Loop));
        let out = mix_frames(&mut renderer, 4);
        assert!(out.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn stopping_sound_rejects_gain_changes() {
        let (mut mixer, _renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 64]);
        let handle = mixer
            .play_advanced(&sample, PlayState::Loop, 1.0, 0.0, 0, 64, 16)
            .unwrap();

        assert!(mixer.set_gain(handle, 0.5, 0.0));
        assert!(mixer.set_state(handle, PlayState::Stop));
        assert!(!mixer.set_gain(handle, 0.5, 0.0));
        assert!(!mixer.set_cursor(handle, 0));
    }

    #[test]
    fn fade_out_envelope_is_monotonic() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[1.0; 64]);
        let handle = mixer
            .play_advanced(&sample, PlayState::Loop, 2.0, 0.0, 0, 64, 32)
            .unwrap();

        mix_frames(&mut renderer, 8);
        mixer.set_state(handle, PlayState::Stop);

        let out = mix_frames(&mut renderer, 48);
        let left: Vec<f32> = out.chunks_exact(2).map(|f| f[0]).collect();
        assert_eq!(left[0], 1.0);
        for pair in left.windows(2) {
            assert!(pair[1] <= pair[0], "envelope rose: {:?}", pair);
        }
        assert_eq!(left[40], 0.0);
    }

    #[test]
    fn halted_start_is_silent_until_resumed() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[1.0; 64]);
        let handle = mixer
            .play_advanced(&sample, PlayState::Halt, 2.0, 0.0, 0, 64, 16)
            .unwrap();

        let out = mix_frames(&mut renderer, 16);
        assert!(out.iter().all(|&s| s == 0.0));

        assert!(mixer.set_state(handle, PlayState::Play));
        let out = mix_frames(&mut renderer, 32);
        let left: Vec<f32> = out.chunks_exact(2).map(|f| f[0]).collect();
        assert_eq!(left[0], 0.0);
        for pair in left.windows(2) {
            assert!(pair[1] >= pair[0], "fade-in fell: {:?}", pair);
        }
        assert_eq!(left[31], 1.0);
    }

    #[test]
    fn halt_keeps_handle_alive_through_fade() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[1.0; 64]);
        let handle = mixer
            .play_advanced(&sample, PlayState::Loop, 2.0, 0.0, 0, 64, 16)
            .unwrap();

        mix_frames(&mut renderer, 8);
        assert!(mixer.set_state(handle, PlayState::Halt));

        // Run the fade-out to completion and then some.
        let out = mix_frames(&mut renderer, 64);
        let tail: Vec<f32> = out[40..].to_vec();
        assert!(tail.iter().all(|&s| s == 0.0));

        // Still claimed: the handle resumes it with a fresh fade-in.
        assert!(mixer.set_state(handle, PlayState::Play));
        let out = mix_frames(&mut renderer, 16);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn halt_all_and_resume_all_round_trip() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[1.0; 64]);
        let playing = mixer.play(&sample, PlayState::Play, 2.0, 0.0).unwrap();
        let looping = mixer.play(&sample, PlayState::Loop, 2.0, 0.0).unwrap();

        mixer.halt_all();
        mix_frames(&mut renderer, 16);
        let out = mix_frames(&mut renderer, 16);
        assert!(out.iter().all(|&s| s == 0.0));

        mixer.resume_all();
        let out = mix_frames(&mut renderer, 16);
        assert!(out.iter().any(|&s| s != 0.0));
        // Both ex-halted sounds are in PLAY now, handles still live.
        assert!(mixer.set_state(playing, PlayState::Play));
        assert!(mixer.set_state(looping, PlayState::Play));
    }

    #[test]
    fn stop_close_to_end_plays_out_without_fade() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[1.0; 16]);
        let handle = mixer
            .play_advanced(&sample, PlayState::Play, 2.0, 0.0, 0, 16, 64)
            .unwrap();

        mix_frames(&mut renderer, 8);
        mixer.set_state(handle, PlayState::Stop);

        // 8 frames left but a 64-frame envelope: plays to the end at full
        // gain, then the layer frees.
        let out = mix_frames(&mut renderer, 16);
        let left: Vec<f32> = out.chunks_exact(2).map(|f| f[0]).collect();
        assert!(left[..8].iter().all(|&s| s == 1.0));
        assert!(left[8..].iter().all(|&s| s == 0.0));
        assert!(!mixer.set_state(handle, PlayState::Play));
    }

    #[test]
    fn fresh_play_starts_fully_faded_in() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 16);
        let sample = mono(&[1.0; 64]);
        mixer.play(&sample, PlayState::Play, 2.0, 0.0).unwrap();

        // A fade only ramps on resume; a fresh PLAY is at full level.
        let out = mix_frames(&mut renderer, 8);
        assert!(out.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn default_fade_applies_to_halted_play() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 16);
        let sample = mono(&[1.0; 64]);
        let handle = mixer.play(&sample, PlayState::Halt, 2.0, 0.0).unwrap();

        assert!(mixer.set_state(handle, PlayState::Play));
        let out = mix_frames(&mut renderer, 32);
        let left: Vec<f32> = out.chunks_exact(2).map(|f| f[0]).collect();
        assert_eq!(left[0], 0.0);
        assert_eq!(left[31], 1.0);
    }

    #[test]
    fn set_default_fade_truncates() {
        let (mut mixer, _renderer) = Mixer::new(1.0, 0);
        mixer.set_default_fade(-100);
        assert_eq!(mixer.fade_default, 0);
        mixer.set_default_fade(15);
        assert_eq!(mixer.fade_default, 12);
    }

    #[test]
    fn remainder_frames_carry_between_calls() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let data = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
        let sample = mono(&data);
        mixer.play(&sample, PlayState::Loop, 2.0, 0.0).unwrap();

        // 6 + 6 + 4 frames across three calls, none a stride multiple.
        let mut stream = Vec::new();
        stream.extend(mix_frames(&mut renderer, 6));
        stream.extend(mix_frames(&mut renderer, 6));
        stream.extend(mix_frames(&mut renderer, 4));

        for (k, frame) in stream.chunks_exact(2).enumerate() {
            let expect = data[k % 8];
            assert_eq!(frame[0], expect, "frame {}", k);
            assert_eq!(frame[1], expect, "frame {}", k);
        }
    }

    #[test]
    fn tiny_requests_drain_the_carry() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let data = [0.1, 0.2, 0.3, 0.4];
        let sample = mono(&data);
        mixer.play(&sample, PlayState::Loop, 2.0, 0.0).unwrap();

        let mut stream = Vec::new();
        for _ in 0..12 {
            stream.extend(mix_frames(&mut renderer, 1));
        }
        for (k, frame) in stream.chunks_exact(2).enumerate() {
            assert_eq!(frame[0], data[k % 4], "frame {}", k);
        }
    }

    #[test]
    fn gain_change_applies_to_later_frames() {
        let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
        let sample = mono(&[0.5; 4]);
        let handle = mixer.play(&sample, PlayState::Loop, 1.0, 0.0).unwrap();

        let out = mix_frames(&mut renderer, 4);
        assert!(out.iter().all(|&s| s == 0.25));

        assert!(mixer.set_gain(handle, 2.0, 0.0));
        let out = mix_frames(&mut renderer, 4);
        assert!(out.iter().all(|&s| s == 0.5));
    }
}
