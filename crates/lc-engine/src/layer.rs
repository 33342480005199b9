//! A slot in the mixer's fixed layer table.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, AtomicU8};

use alloc::sync::Arc;

use lc_core::Sample;

/// Flag value of an unclaimed slot.
pub(crate) const FLAG_FREE: u8 = 0;

/// One slot in the layer table.
///
/// Field ownership while the slot is live (flag non-zero): the audio
/// thread advances `cursor` and the `fade` counter; the control thread
/// owns `id`, the sample, `start`, `end`, and `fmax`. `flag`, `cursor`,
/// and `gain` are written from both sides. While the slot is free only
/// the control thread touches it at all.
///
/// Publication is the release store of `flag` at claim time, which
/// carries every other field with it; the kernel's acquire load of `flag`
/// pairs with that store.
pub(crate) struct Layer {
    /// Generation-tagged id of the current occupant.
    pub id: AtomicU32,
    /// Playback state; [`FLAG_FREE`] marks the slot unclaimed.
    pub flag: AtomicU8,
    /// Next frame to read, in the sample's frame space. Multiple of 4;
    /// negative while a pre-delay runs off.
    pub cursor: AtomicI32,
    /// Packed per-channel gain pair ([`lc_core::StereoGain`] bits).
    pub gain: AtomicU64,
    /// Play window start, truncated to a multiple of 4.
    pub start: AtomicI32,
    /// Play window end (exclusive), truncated to a multiple of 4.
    pub end: AtomicI32,
    /// Frames remaining of the pending envelope, in `[0, fmax]`.
    pub fade: AtomicI32,
    /// Envelope length in frames; 0 makes fades instantaneous.
    pub fmax: AtomicI32,
    /// Sound played by the current occupant.
    sample: UnsafeCell<Option<Arc<Sample>>>,
}

// SAFETY: `sample` is the only non-atomic field. The control thread
// writes it only while `flag` is FREE and then publishes with a release
// store of `flag`; the audio thread reads it only after observing a
// non-FREE flag with acquire ordering, and performs no access after it
// stores FREE back (that store is a release, so the reads cannot sink
// below it). The two threads therefore never touch the cell concurrently.
unsafe impl Sync for Layer {}

impl Layer {
    pub fn new() -> Self {
        Self {
            id: AtomicU32::new(0),
            flag: AtomicU8::new(FLAG_FREE),
            cursor: AtomicI32::new(0),
            gain: AtomicU64::new(0),
            start: AtomicI32::new(0),
            end: AtomicI32::new(0),
            fade: AtomicI32::new(0),
            fmax: AtomicI32::new(0),
            sample: UnsafeCell::new(None),
        }
    }

    /// Sound of the current occupant.
    ///
    /// # Safety
    ///
    /// The caller must have observed a non-FREE `flag` with acquire
    /// ordering on this thread, and the returned borrow must end before
    /// this thread stores FREE into `flag`.
    pub unsafe fn sample(&self) -> Option<&Sample> {
        (*self.sample.get()).as_deref()
    }

    /// Install the occupant's sound, dropping the previous occupant's.
    ///
    /// # Safety
    ///
    /// Control thread only, and only while `flag` has been observed FREE.
    pub unsafe fn set_sample(&self, sample: Arc<Sample>) {
        *self.sample.get() = Some(sample);
    }
}
