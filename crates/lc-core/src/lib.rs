//! Core types for the layercake mixing engine.
//!
//! This crate defines the leaf data types shared by the engine and the
//! audio backends: immutable PCM [`Sample`]s, the [`StereoGain`] pan law,
//! playback states, and generation-tagged sound handles.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod gain;
mod sample;
mod state;

pub use gain::StereoGain;
pub use sample::{Sample, SampleError};
pub use state::{PlayState, SoundHandle};
