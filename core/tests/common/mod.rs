#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tandem_core::audio::{AudioBridge, AudioOutput, AudioSpec, AudioStream};
use tandem_core::clock::{Clock, ManualClock};
use tandem_core::core::machine::{InputButton, Machine, SampleSource};
use tandem_core::driver::DriverHooks;
use tandem_core::error::AudioError;
use tandem_core::pacer::NOMINAL_SCANLINES;

/// Everything observable that happened to the scripted machine and its
/// audio output, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trace {
    Init,
    Deinit,
    Frame,
    Press(u8),
    Release(u8),
    Load(PathBuf, bool),
    AudioOpen(AudioSpec),
    AudioClose,
}

pub type TraceLog = Arc<Mutex<Vec<Trace>>>;

pub fn new_log() -> TraceLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn count(log: &TraceLog, pred: impl Fn(&Trace) -> bool) -> usize {
    log.lock().unwrap().iter().filter(|t| pred(t)).count()
}

/// Minimal machine: a tiny display whose every byte holds the frame number.
pub struct ScriptedMachine {
    log: TraceLog,
    scanlines: u32,
    accept_roms: bool,
    load_delay: Duration,
    frame: u8,
}

pub const WIDTH: u32 = 4;
pub const HEIGHT: u32 = 2;

impl ScriptedMachine {
    pub fn new(log: TraceLog) -> Self {
        Self {
            log,
            scanlines: NOMINAL_SCANLINES,
            accept_roms: true,
            load_delay: Duration::ZERO,
            frame: 0,
        }
    }

    pub fn rejecting_roms(mut self) -> Self {
        self.accept_roms = false;
        self
    }

    /// Make `load_rom` take `delay` before answering.
    pub fn slow_loading(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    fn record(&self, trace: Trace) {
        self.log.lock().unwrap().push(trace);
    }
}

static SCRIPTED_INPUT_MAP: &[InputButton] = &[InputButton { id: 0, name: "A" }];

impl Machine for ScriptedMachine {
    fn display_size(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn init(&mut self) {
        self.record(Trace::Init);
    }

    fn deinit(&mut self) {
        self.record(Trace::Deinit);
    }

    fn run_frame(&mut self) -> u32 {
        self.frame = self.frame.wrapping_add(1);
        self.record(Trace::Frame);
        self.scanlines
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        buffer.fill(self.frame);
    }

    fn load_rom(&mut self, path: &Path, direct_boot: bool) -> bool {
        self.record(Trace::Load(path.to_path_buf(), direct_boot));
        std::thread::sleep(self.load_delay);
        self.accept_roms
    }

    fn press_key(&mut self, line: u8) {
        self.record(Trace::Press(line));
    }

    fn release_key(&mut self, line: u8) {
        self.record(Trace::Release(line));
    }

    fn input_map(&self) -> &[InputButton] {
        SCRIPTED_INPUT_MAP
    }

    fn sample_rate(&self) -> u32 {
        32824
    }

    fn sample_source(&self) -> Option<Arc<dyn SampleSource>> {
        let source: Arc<dyn SampleSource> = Arc::new(RecordingSource::default());
        Some(source)
    }
}

/// Sample source that remembers every frame count it was asked for.
#[derive(Default)]
pub struct RecordingSource {
    pub requests: Mutex<Vec<usize>>,
}

impl SampleSource for RecordingSource {
    fn read_output(&self, buffer: &mut [i16], frames: usize) {
        self.requests.lock().unwrap().push(frames);
        for sample in buffer.iter_mut().take(frames * 2) {
            *sample = 1;
        }
    }
}

/// Audio output that logs open/close into the machine's trace.
pub struct RecordingOutput {
    pub log: TraceLog,
}

struct RecordingStream {
    log: TraceLog,
}

impl AudioOutput for RecordingOutput {
    fn open(
        &mut self,
        spec: &AudioSpec,
        _bridge: AudioBridge,
    ) -> Result<Box<dyn AudioStream>, AudioError> {
        self.log.lock().unwrap().push(Trace::AudioOpen(*spec));
        Ok(Box::new(RecordingStream {
            log: Arc::clone(&self.log),
        }))
    }
}

impl AudioStream for RecordingStream {
    fn close(self: Box<Self>) {
        self.log.lock().unwrap().push(Trace::AudioClose);
    }
}

/// Audio output with no device behind it.
pub struct MissingOutput;

impl AudioOutput for MissingOutput {
    fn open(
        &mut self,
        _spec: &AudioSpec,
        _bridge: AudioBridge,
    ) -> Result<Box<dyn AudioStream>, AudioError> {
        Err(AudioError::NoDevice)
    }
}

#[derive(Default)]
pub struct RecordingHooks {
    pub redraws: AtomicUsize,
    pub statuses: Mutex<Vec<String>>,
    clock: Option<ManualClock>,
    stamped: Mutex<Vec<(u64, String)>>,
}

impl RecordingHooks {
    /// Also record the clock reading at each status update.
    pub fn with_clock(clock: ManualClock) -> Self {
        Self {
            clock: Some(clock),
            ..Self::default()
        }
    }

    pub fn stamped_statuses(&self) -> Vec<(u64, String)> {
        self.stamped.lock().unwrap().clone()
    }

    pub fn redraw_count(&self) -> usize {
        self.redraws.load(Ordering::SeqCst)
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }
}

impl DriverHooks for RecordingHooks {
    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }

    fn set_status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_owned());
        if let Some(clock) = &self.clock {
            self.stamped
                .lock()
                .unwrap()
                .push((clock.ticks_ms(), text.to_owned()));
        }
    }
}

/// Poll `cond` until it holds, failing the test after a generous timeout.
pub fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}
