//! Pull-model audio: the host output device asks for samples on its own
//! thread, and the bridge drains exactly that many from the machine.

use std::sync::Arc;

use crate::core::machine::SampleSource;
use crate::error::AudioError;

/// Interleaved channels per frame (stereo).
pub const CHANNELS: u16 = 2;

/// Bytes per stereo frame of signed 16-bit little-endian samples.
pub const BYTES_PER_FRAME: usize = 4;

/// Device buffer size requested at open time, in frames.
pub const DEVICE_BUFFER_FRAMES: u32 = 1024;

/// Stereo frames contained in a request of `bytes` bytes.
pub const fn frames_for_bytes(bytes: usize) -> usize {
    bytes / BYTES_PER_FRAME
}

/// Parameters for opening the host output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_frames: u32,
}

impl AudioSpec {
    /// Stereo output at the machine's own rate, so nothing here resamples.
    pub fn native(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: CHANNELS,
            buffer_frames: DEVICE_BUFFER_FRAMES,
        }
    }
}

/// Callback-side adapter between the host device and a [`SampleSource`].
/// Keeps no buffer of its own.
#[derive(Clone)]
pub struct AudioBridge {
    source: Arc<dyn SampleSource>,
}

impl AudioBridge {
    pub fn new(source: Arc<dyn SampleSource>) -> Self {
        Self { source }
    }

    /// Fill `out` (interleaved stereo) completely. Returns the number of
    /// frames requested from the source.
    pub fn fill(&self, out: &mut [i16]) -> usize {
        let frames = out.len() / CHANNELS as usize;
        self.source.read_output(out, frames);
        // A stray odd sample cannot form a frame.
        if let Some(tail) = out.get_mut(frames * CHANNELS as usize..) {
            tail.fill(0);
        }
        frames
    }
}

/// A host audio device that can be opened for pull playback.
///
/// The driver opens it on its own thread and closes the resulting stream
/// there too, so only the opener has to cross threads.
pub trait AudioOutput: Send {
    fn open(&mut self, spec: &AudioSpec, bridge: AudioBridge)
    -> Result<Box<dyn AudioStream>, AudioError>;
}

/// A playing output stream. Dropping it without `close` also stops playback.
pub trait AudioStream {
    fn close(self: Box<Self>);
}
