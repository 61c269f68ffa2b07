use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tandem_core::core::machine::{InputButton, Machine, SampleSource};
use tandem_core::input::KeyBindings;
use tandem_core::pacer::NOMINAL_SCANLINES;
use tracing::{info, warn};

use crate::registry::MachineEntry;

// ---------------------------------------------------------------------------
// Geometry and timing
// ---------------------------------------------------------------------------

pub const SCREEN_WIDTH: u32 = 256;
pub const SCREEN_HEIGHT: u32 = 192;

/// Two screens stacked vertically.
pub const DISPLAY_HEIGHT: u32 = SCREEN_HEIGHT * 2;

/// Native output rate: the 32823.6328125 Hz sound clock, rounded.
pub const SAMPLE_RATE: u32 = 32824;

/// Stereo frames synthesized per video frame (32823.63 / 60).
pub const SAMPLES_PER_FRAME: usize = 547;

/// Audio queued beyond this many frames is dropped from the front.
pub const MAX_QUEUED_FRAMES: usize = SAMPLES_PER_FRAME * 8;

/// Frame length while Select is held.
pub const SHORT_FRAME_SCANLINES: u32 = NOMINAL_SCANLINES / 2;

const INPUT_SELECT: u8 = 2;

const AMPLITUDE: i16 = 3000;

const BAR_WIDTH: u32 = 32;

/// 75% SMPTE-style bars.
const BARS: [[u8; 3]; 8] = [
    [191, 191, 191],
    [191, 191, 0],
    [0, 191, 191],
    [0, 191, 0],
    [191, 0, 191],
    [191, 0, 0],
    [0, 0, 191],
    [0, 0, 0],
];

const INDICATOR_SIZE: u32 = 36;
const INDICATOR_PITCH: u32 = 42;
const INDICATOR_COLUMNS: u32 = 6;

static TESTCARD_INPUT_MAP: &[InputButton] = &[
    InputButton { id: 0, name: "A" },
    InputButton { id: 1, name: "B" },
    InputButton { id: 2, name: "Select" },
    InputButton { id: 3, name: "Start" },
    InputButton { id: 4, name: "Right" },
    InputButton { id: 5, name: "Left" },
    InputButton { id: 6, name: "Up" },
    InputButton { id: 7, name: "Down" },
    InputButton { id: 8, name: "R" },
    InputButton { id: 9, name: "L" },
    InputButton { id: 16, name: "X" },
    InputButton { id: 17, name: "Y" },
];

// ---------------------------------------------------------------------------
// Audio queue
// ---------------------------------------------------------------------------

/// Interleaved stereo samples waiting for the host audio callback.
/// Short reads are padded with silence.
#[derive(Default)]
pub struct ToneQueue {
    samples: Mutex<VecDeque<i16>>,
}

impl ToneQueue {
    pub fn queued_frames(&self) -> usize {
        self.lock().len() / 2
    }

    fn push_frame(samples: &mut VecDeque<i16>, left: i16, right: i16) {
        samples.push_back(left);
        samples.push_back(right);
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<i16>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SampleSource for ToneQueue {
    fn read_output(&self, buffer: &mut [i16], frames: usize) {
        let mut samples = self.lock();
        for out in buffer.iter_mut().take(frames * 2) {
            *out = samples.pop_front().unwrap_or(0);
        }
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Reference machine: colour bars on the top screen, one indicator per input
/// slot on the bottom screen, and a square tone whose pitch follows the
/// lowest pressed line.
pub struct TestCard {
    frame: u64,
    pressed: u32,
    tint: u8,
    rom_loaded: bool,
    powered: bool,
    phase: u32,
    audio: Arc<ToneQueue>,
}

impl Default for TestCard {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCard {
    pub fn new() -> Self {
        Self {
            frame: 0,
            pressed: 0,
            tint: 0,
            rom_loaded: false,
            powered: false,
            phase: 0,
            audio: Arc::new(ToneQueue::default()),
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn is_pressed(&self, line: u8) -> bool {
        line < 32 && self.pressed & (1 << line) != 0
    }

    pub fn rom_loaded(&self) -> bool {
        self.rom_loaded
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn queued_audio_frames(&self) -> usize {
        self.audio.queued_frames()
    }

    /// Square wave half-period in samples for the lowest pressed line, or
    /// `None` for silence.
    fn tone_half_period(&self) -> Option<u32> {
        if self.pressed == 0 {
            return None;
        }
        let line = self.pressed.trailing_zeros();
        let freq = 220 + 55 * line;
        Some((SAMPLE_RATE / (2 * freq)).max(1))
    }

    fn synthesize(&mut self) {
        let half_period = self.tone_half_period();
        let mut samples = self.audio.lock();

        for _ in 0..SAMPLES_PER_FRAME {
            let level = match half_period {
                Some(half) => {
                    self.phase = (self.phase + 1) % (half * 2);
                    if self.phase < half { AMPLITUDE } else { -AMPLITUDE }
                }
                None => 0,
            };
            ToneQueue::push_frame(&mut samples, level, level);
        }

        let excess = samples.len().saturating_sub(MAX_QUEUED_FRAMES * 2);
        samples.drain(..excess);
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if y < SCREEN_HEIGHT {
            let bar = (x.wrapping_add(self.frame as u32) / BAR_WIDTH) as usize % BARS.len();
            let [r, g, b] = BARS[bar];
            [r ^ self.tint, g, b]
        } else {
            self.indicator_pixel(x, y - SCREEN_HEIGHT)
        }
    }

    fn indicator_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        const BACKGROUND: [u8; 3] = [16, 16, 32];
        const IDLE: [u8; 3] = [64, 64, 64];
        const LIT: [u8; 3] = [255, 255, 255];

        let (x, y) = (x.wrapping_sub(8), y.wrapping_sub(48));
        let (col, row) = (x / INDICATOR_PITCH, y / INDICATOR_PITCH);
        if col >= INDICATOR_COLUMNS
            || x % INDICATOR_PITCH >= INDICATOR_SIZE
            || y % INDICATOR_PITCH >= INDICATOR_SIZE
        {
            return BACKGROUND;
        }

        match KeyBindings::slot_line((row * INDICATOR_COLUMNS + col) as usize) {
            Some(line) if self.is_pressed(line) => LIT,
            Some(_) => IDLE,
            None => BACKGROUND,
        }
    }
}

impl Machine for TestCard {
    fn display_size(&self) -> (u32, u32) {
        (SCREEN_WIDTH, DISPLAY_HEIGHT)
    }

    fn init(&mut self) {
        self.frame = 0;
        self.pressed = 0;
        self.phase = 0;
        self.powered = true;
    }

    fn deinit(&mut self) {
        self.powered = false;
        self.audio.clear();
    }

    fn run_frame(&mut self) -> u32 {
        self.frame += 1;
        self.synthesize();

        if self.is_pressed(INPUT_SELECT) {
            SHORT_FRAME_SCANLINES
        } else {
            NOMINAL_SCANLINES
        }
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        for (i, px) in buffer.chunks_exact_mut(3).enumerate() {
            let x = i as u32 % SCREEN_WIDTH;
            let y = i as u32 / SCREEN_WIDTH;
            px.copy_from_slice(&self.pixel(x, y));
        }
    }

    fn load_rom(&mut self, path: &Path, direct_boot: bool) -> bool {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                warn!(path = %path.display(), "cannot read ROM: {err}");
                return false;
            }
        };
        if data.is_empty() {
            warn!(path = %path.display(), "ROM is empty");
            return false;
        }

        self.tint = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        self.frame = 0;
        self.rom_loaded = true;
        info!(bytes = data.len(), direct_boot, "testcard ROM accepted");
        true
    }

    fn press_key(&mut self, line: u8) {
        if line < 32 {
            self.pressed |= 1 << line;
        }
    }

    fn release_key(&mut self, line: u8) {
        if line < 32 {
            self.pressed &= !(1 << line);
        }
    }

    fn input_map(&self) -> &[InputButton] {
        TESTCARD_INPUT_MAP
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn sample_source(&self) -> Option<Arc<dyn SampleSource>> {
        let source: Arc<dyn SampleSource> = self.audio.clone();
        Some(source)
    }
}

// ---------------------------------------------------------------------------
// Machine registry
// ---------------------------------------------------------------------------

fn create_machine() -> Box<dyn Machine + Send> {
    Box::new(TestCard::new())
}

inventory::submit! {
    MachineEntry::new(
        "testcard",
        "Colour bars, input indicators and a test tone",
        create_machine,
    )
}
