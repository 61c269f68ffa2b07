use std::path::Path;
use std::sync::Arc;

/// Describes a single logical input line that a machine accepts.
pub struct InputButton {
    /// Machine-defined line identifier, passed to `press_key()` / `release_key()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "A", "Start").
    pub name: &'static str,
}

/// Queue of synthesized audio owned by a machine.
///
/// Read from the host audio callback thread, so implementations must be
/// shareable across threads. Samples are interleaved signed 16-bit stereo.
pub trait SampleSource: Send + Sync {
    /// Write exactly `frames` stereo frames (`frames * 2` samples) into the
    /// front of `buffer`.
    ///
    /// What happens when fewer frames are queued (silence, repeat, block) is
    /// up to the implementation.
    fn read_output(&self, buffer: &mut [i16], frames: usize);
}

/// Machine-agnostic interface for the emulated system.
///
/// The driver thread owns the machine exclusively: every method here is
/// called from that one thread. The only piece that escapes to another
/// thread is the [`SampleSource`] handed out by `sample_source()`.
pub trait Machine {
    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Bring the machine up. Called once on the driver thread before the first frame.
    fn init(&mut self) {}

    /// Tear the machine down. Called once on the driver thread after the loop exits.
    fn deinit(&mut self) {}

    /// Run one frame of emulation and return how many scanlines it lasted.
    ///
    /// A full-length frame reports the nominal count; shorter or longer
    /// frames are paced proportionally.
    fn run_frame(&mut self) -> u32;

    /// Render the current video state into an RGB24 pixel buffer.
    ///
    /// The buffer is exactly `width * height * 3` bytes (from `display_size()`).
    /// Pixels are stored left-to-right, top-to-bottom, 3 bytes per pixel (R, G, B).
    fn render_frame(&self, buffer: &mut [u8]);

    /// Load a program image. The path is passed through untouched.
    ///
    /// Returns `false` if the machine rejected it; the machine reports the
    /// reason itself.
    fn load_rom(&mut self, path: &Path, direct_boot: bool) -> bool;

    /// Latch logical input line `line` as pressed.
    fn press_key(&mut self, line: u8);

    /// Latch logical input line `line` as released.
    fn release_key(&mut self, line: u8);

    /// Get the list of input lines this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Native audio output rate in Hz, or 0 if the machine is silent.
    fn sample_rate(&self) -> u32 {
        0
    }

    /// Shared handle to the machine's audio output queue.
    fn sample_source(&self) -> Option<Arc<dyn SampleSource>> {
        None
    }
}
