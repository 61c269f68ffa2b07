//! Single-slot handoff of the most recent frame from the driver thread to
//! the redraw path.
//!
//! Both sides hold the slot's mutex for the whole write or read, so a reader
//! sees either the previous complete frame or the next one, never a mix.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::HandoffError;

/// Bytes per RGB24 pixel.
pub const BYTES_PER_PIXEL: usize = 3;

struct Slot {
    pixels: Vec<u8>,
    generation: u64,
}

pub struct FrameHandoff {
    width: u32,
    height: u32,
    slot: Mutex<Slot>,
}

impl FrameHandoff {
    /// Allocate a black frame of `width * height` RGB24 pixels.
    pub fn new(width: u32, height: u32) -> Result<Self, HandoffError> {
        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(BYTES_PER_PIXEL))
            .ok_or(HandoffError::Allocation { bytes: usize::MAX })?;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(bytes)
            .map_err(|_| HandoffError::Allocation { bytes })?;
        pixels.resize(bytes, 0);

        Ok(Self {
            width,
            height,
            slot: Mutex::new(Slot {
                pixels,
                generation: 0,
            }),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Render the next frame directly into the slot. Returns its generation.
    pub fn publish_with(&self, render: impl FnOnce(&mut [u8])) -> u64 {
        let mut slot = self.lock();
        render(&mut slot.pixels);
        slot.generation += 1;
        slot.generation
    }

    /// Copy a complete frame into the slot. Returns its generation.
    pub fn publish(&self, frame: &[u8]) -> Result<u64, HandoffError> {
        let expected = self.frame_len();
        if frame.len() != expected {
            return Err(HandoffError::SizeMismatch {
                expected,
                actual: frame.len(),
            });
        }
        Ok(self.publish_with(|pixels| pixels.copy_from_slice(frame)))
    }

    /// Hand the latest frame and its generation to `read`. Publishing is
    /// blocked until `read` returns, so draw inside the closure.
    pub fn consume_latest<R>(&self, read: impl FnOnce(&[u8], u64) -> R) -> R {
        let slot = self.lock();
        read(&slot.pixels, slot.generation)
    }

    /// Number of frames published so far.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    // A panic while the lock was held can only come from a render or read
    // closure; the slot still holds a full-size buffer, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
