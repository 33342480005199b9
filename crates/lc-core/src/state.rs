//! Playback states and sound handles.

use core::num::NonZeroU32;

/// Playback state of a layer.
///
/// The discriminants are the values stored in a layer's atomic state
/// flag. 0 marks a free slot and is not a public state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PlayState {
    /// Fade out, then release the layer.
    Stop = 1,
    /// Fade out but keep the layer addressable for a later resume.
    Halt = 2,
    /// Play the window once, releasing the layer at its end.
    Play = 3,
    /// Wrap from the window end back to its start indefinitely.
    Loop = 4,
}

impl PlayState {
    /// Decode a raw flag byte; `None` for 0 (free) or out-of-range values.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            1 => Some(PlayState::Stop),
            2 => Some(PlayState::Halt),
            3 => Some(PlayState::Play),
            4 => Some(PlayState::Loop),
            _ => None,
        }
    }
}

/// Generation-tagged handle addressing one playing sound.
///
/// The low bits of the id select the layer slot; the remaining bits are a
/// generation tag, so a handle kept past its sound's lifetime addresses
/// nothing instead of whatever claimed the slot next. The raw id is never
/// 0, which keeps an `Option<SoundHandle>` pointer-sized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SoundHandle(NonZeroU32);

impl SoundHandle {
    /// Wrap a raw nonzero id.
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    /// The raw generation-tagged id.
    pub fn id(self) -> u32 {
        self.0.get()
    }
}
