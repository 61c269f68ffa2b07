//! The emulation driver: a dedicated thread that steps the machine one
//! frame at a time, publishes frames, paces against the wall clock and
//! services commands from the UI thread.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::audio::{AudioBridge, AudioOutput, AudioSpec, AudioStream};
use crate::clock::Clock;
use crate::core::machine::Machine;
use crate::error::{DriverError, HandoffError};
use crate::handoff::FrameHandoff;
use crate::input::KeyCommand;
use crate::pacer::FramePacer;
use crate::run_state::{RunState, SharedRunState};

/// How long a paused driver waits for a command before redrawing again.
pub const PAUSE_INTERVAL: Duration = Duration::from_millis(50);

/// Callbacks into the UI layer. Invoked from the driver thread.
pub trait DriverHooks: Send + Sync {
    /// A new frame (or the paused screen) is ready to be drawn.
    fn request_redraw(&self);

    /// Status line update, e.g. `"60/60 FPS"`. Roughly twice per second while running.
    fn set_status(&self, text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Passed through to `Machine::load_rom`.
    pub direct_boot: bool,
    pub limit_fps: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            direct_boot: true,
            limit_fps: true,
        }
    }
}

/// Everything the driver thread takes ownership of.
pub struct DriverParts {
    pub machine: Box<dyn Machine + Send>,
    pub handoff: Arc<FrameHandoff>,
    pub hooks: Arc<dyn DriverHooks>,
    /// `None` runs without sound.
    pub audio: Option<Box<dyn AudioOutput>>,
    pub clock: Box<dyn Clock>,
}

enum Command {
    Input(KeyCommand),
    Load { path: PathBuf, reply: Sender<bool> },
    Wake,
}

struct Shared {
    state: SharedRunState,
    limit_fps: AtomicBool,
    loading: AtomicBool,
    /// Held while checking `loading` together with a state change, so a run
    /// request cannot slip in between a load's flag and its pause.
    transition: Mutex<()>,
}

impl Shared {
    fn transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// UI-side handle to the driver thread. Dropping it stops and joins the thread.
pub struct Driver {
    shared: Arc<Shared>,
    commands: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl Driver {
    /// Spawn the driver thread. The machine starts out `Paused`.
    pub fn start(parts: DriverParts, config: DriverConfig) -> Result<Self, DriverError> {
        let (width, height) = parts.machine.display_size();
        if parts.handoff.dimensions() != (width, height) {
            return Err(HandoffError::SizeMismatch {
                expected: width as usize * height as usize * crate::handoff::BYTES_PER_PIXEL,
                actual: parts.handoff.frame_len(),
            }
            .into());
        }

        let shared = Arc::new(Shared {
            state: SharedRunState::new(RunState::Paused),
            limit_fps: AtomicBool::new(config.limit_fps),
            loading: AtomicBool::new(false),
            transition: Mutex::new(()),
        });
        let (commands, inbox) = mpsc::channel();

        let worker = EmulationLoop {
            machine: parts.machine,
            handoff: parts.handoff,
            hooks: parts.hooks,
            audio: parts.audio,
            pacer: FramePacer::new(parts.clock),
            shared: Arc::clone(&shared),
            inbox,
            direct_boot: config.direct_boot,
        };

        let thread = thread::Builder::new()
            .name("emu-driver".into())
            .spawn(move || worker.run())?;
        info!("driver thread started");

        Ok(Self {
            shared,
            commands,
            thread: Some(thread),
        })
    }

    pub fn state(&self) -> RunState {
        self.shared.state.get()
    }

    /// Resume emulation. Refused while a load is in flight or after stop.
    pub fn request_run(&self) -> bool {
        let _transition = self.shared.transition();
        if self.shared.loading.load(Ordering::SeqCst) {
            debug!("run request ignored while a ROM load is in progress");
            return false;
        }
        self.shared.state.run()
    }

    pub fn request_pause(&self) -> bool {
        self.shared.state.pause()
    }

    /// Ask the thread to exit. Call [`join`](Self::join) before releasing
    /// anything the loop uses.
    pub fn request_stop(&self) {
        self.shared.state.stop();
        let _ = self.commands.send(Command::Wake);
    }

    /// Wait for the driver thread to finish its teardown.
    pub fn join(&mut self) -> Result<(), DriverError> {
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| DriverError::Panicked)?;
            info!("driver thread joined");
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.request_stop();
        self.join()
    }

    pub fn set_limit_fps(&self, limit: bool) {
        self.shared.limit_fps.store(limit, Ordering::Relaxed);
    }

    pub fn limit_fps(&self) -> bool {
        self.shared.limit_fps.load(Ordering::Relaxed)
    }

    /// Forward a press/release to the machine. Delivered before the next
    /// frame, and also while paused.
    pub fn send_input(&self, command: KeyCommand) -> Result<(), DriverError> {
        trace!(line = command.line, pressed = command.pressed, "input");
        self.commands
            .send(Command::Input(command))
            .map_err(|_| DriverError::Stopped)
    }

    /// Pause, load `path` on the driver thread, and resume only if the
    /// machine accepted it. Blocks until the load has been attempted.
    pub fn load_rom(&self, path: impl AsRef<Path>) -> Result<bool, DriverError> {
        let _loading = {
            let _transition = self.shared.transition();
            if self.shared.loading.swap(true, Ordering::SeqCst) {
                return Err(DriverError::Busy);
            }
            let flag = LoadingFlag(&self.shared.loading);
            if !self.shared.state.pause() {
                return Err(DriverError::Stopped);
            }
            flag
        };

        let (reply, result) = mpsc::channel();
        self.commands
            .send(Command::Load {
                path: path.as_ref().to_path_buf(),
                reply,
            })
            .map_err(|_| DriverError::Stopped)?;
        let loaded = result.recv().map_err(|_| DriverError::Stopped)?;

        if loaded && !self.shared.state.resume_from_pause() {
            return Err(DriverError::Stopped);
        }
        Ok(loaded)
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!("driver shutdown: {err}");
        }
    }
}

/// Clears the loading flag when a load finishes, however it finishes.
struct LoadingFlag<'a>(&'a AtomicBool);

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// State owned by the driver thread.
struct EmulationLoop {
    machine: Box<dyn Machine + Send>,
    handoff: Arc<FrameHandoff>,
    hooks: Arc<dyn DriverHooks>,
    audio: Option<Box<dyn AudioOutput>>,
    pacer: FramePacer,
    shared: Arc<Shared>,
    inbox: Receiver<Command>,
    direct_boot: bool,
}

impl EmulationLoop {
    fn run(mut self) {
        self.machine.init();
        let stream = self.open_audio();
        self.pacer.reset();

        loop {
            if self.shared.state.is_stopped() {
                break;
            }
            self.drain_commands();

            match self.shared.state.get() {
                RunState::Stopped => break,
                RunState::Running => self.step(),
                RunState::Paused => self.idle(),
            }
        }

        if let Some(stream) = stream {
            stream.close();
            debug!("audio stream closed");
        }
        self.machine.deinit();
        info!("driver thread exiting");
    }

    fn step(&mut self) {
        let scanlines = self.machine.run_frame();

        let machine = &self.machine;
        self.handoff.publish_with(|pixels| machine.render_frame(pixels));
        self.hooks.request_redraw();

        self.pacer.set_limit(self.shared.limit_fps.load(Ordering::Relaxed));
        let delay = self.pacer.on_frame_produced(scanlines);
        if !delay.is_zero() {
            self.pacer.clock().sleep(delay);
        }

        if let Some(sample) = self.pacer.record_frame() {
            debug!(measured = sample.measured, target = sample.target, "fps");
            self.hooks.set_status(&sample.to_string());
        }
    }

    fn idle(&mut self) {
        self.pacer.reset();
        self.hooks.request_redraw();

        match self.inbox.recv_timeout(PAUSE_INTERVAL) {
            Ok(command) => self.handle(command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.shared.state.stop(),
        }
    }

    fn drain_commands(&mut self) {
        loop {
            match self.inbox.try_recv() {
                Ok(command) => self.handle(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.shared.state.stop();
                    break;
                }
            }
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Input(KeyCommand {
                line,
                pressed: true,
            }) => self.machine.press_key(line),
            Command::Input(KeyCommand {
                line,
                pressed: false,
            }) => self.machine.release_key(line),
            Command::Load { path, reply } => {
                let loaded = self.machine.load_rom(&path, self.direct_boot);
                if loaded {
                    info!(path = %path.display(), "ROM loaded");
                } else {
                    warn!(path = %path.display(), "ROM rejected by machine");
                }
                // The caller may have given up waiting; nothing to do then.
                let _ = reply.send(loaded);
            }
            Command::Wake => {}
        }
    }

    fn open_audio(&mut self) -> Option<Box<dyn AudioStream>> {
        let output = self.audio.as_mut()?;
        let rate = self.machine.sample_rate();
        let Some(source) = self.machine.sample_source().filter(|_| rate > 0) else {
            debug!("machine has no audio output");
            return None;
        };

        let spec = AudioSpec::native(rate);
        match output.open(&spec, AudioBridge::new(source)) {
            Ok(stream) => {
                info!(rate, "audio output opened");
                Some(stream)
            }
            Err(err) => {
                warn!("audio unavailable, continuing without sound: {err}");
                None
            }
        }
    }
}
