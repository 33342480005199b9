//! Wait-free real-time mixing engine.
//!
//! A [`Mixer`] owns a fixed pool of layers, each able to play one
//! [`Sample`] through one of four states (stop, halt, play, loop) with
//! its own gain, pan, cursor, and linear fade envelope. One control
//! thread mutates layers through the [`Mixer`]; exactly one audio thread
//! pulls interleaved stereo frames through [`Renderer::mix`], usually
//! from inside a device callback. The two sides coordinate purely through
//! per-layer atomics: no locks, and no allocation on the audio thread in
//! steady state.
//!
//! ```
//! use std::sync::Arc;
//! use lc_engine::{Mixer, PlayState, Sample};
//!
//! let (mut mixer, mut renderer) = Mixer::new(1.0, 0);
//! let tone = Arc::new(Sample::from_frames(1, &[0.5; 64])?);
//! let handle = mixer.play(&tone, PlayState::Loop, 1.0, 0.0).unwrap();
//!
//! // In the audio callback:
//! let mut out = [0.0f32; 256];
//! renderer.mix(&mut out);
//!
//! mixer.set_state(handle, PlayState::Stop);
//! # Ok::<(), lc_engine::SampleError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod kernel;
mod layer;
mod mixer;

pub use lc_core::{PlayState, Sample, SampleError, SoundHandle, StereoGain};
pub use mixer::{Mixer, Renderer, DEFAULT_LAYER_BITS};
