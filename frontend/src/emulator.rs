//! UI-thread event loop: draws published frames, forwards keys to the
//! driver, and handles the Alt accelerators.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use sdl2::EventPump;
use sdl2::event::{Event, EventSender, WindowEvent};
use sdl2::keyboard::Scancode;
use tandem_core::driver::{Driver, DriverHooks};
use tandem_core::handoff::FrameHandoff;
use tandem_core::input::{InputTranslator, KeyEvent};
use tandem_core::run_state::RunState;
use tracing::{info, trace, warn};

use crate::error::FrontendError;
use crate::input;
use crate::video::Video;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Custom SDL events posted by the driver thread.
pub enum UiEvent {
    Redraw,
    Status(String),
}

/// Window title for a status line.
pub fn window_title(status: Option<&str>) -> String {
    match status {
        Some(status) => format!("{status} | tandem {VERSION}"),
        None => format!("tandem {VERSION}"),
    }
}

/// [`DriverHooks`] that post [`UiEvent`]s into the SDL queue.
///
/// At most one redraw is queued at a time; the UI clears the flag when it
/// starts drawing.
pub struct SdlHooks {
    sender: EventSender,
    redraw_pending: AtomicBool,
}

impl SdlHooks {
    pub fn new(sender: EventSender) -> Self {
        Self {
            sender,
            redraw_pending: AtomicBool::new(false),
        }
    }

    fn redraw_started(&self) {
        self.redraw_pending.store(false, Ordering::Release);
    }
}

impl DriverHooks for SdlHooks {
    fn request_redraw(&self) {
        if self.redraw_pending.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self.sender.push_custom_event(UiEvent::Redraw) {
            trace!("redraw event dropped: {err}");
            self.redraw_pending.store(false, Ordering::Release);
        }
    }

    fn set_status(&self, text: &str) {
        if let Err(err) = self.sender.push_custom_event(UiEvent::Status(text.to_owned())) {
            trace!("status event dropped: {err}");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Everything the UI thread touches while the driver runs.
pub struct Session<'a> {
    pub driver: &'a Driver,
    pub handoff: &'a FrameHandoff,
    pub hooks: &'a SdlHooks,
    pub translator: &'a InputTranslator,
    pub video: &'a mut Video,
}

impl Session<'_> {
    /// Block on SDL events until the user quits.
    pub fn run(&mut self, event_pump: &mut EventPump) -> Result<(), FrontendError> {
        'main: loop {
            let first = event_pump.wait_event();
            for event in std::iter::once(first).chain(event_pump.poll_iter()) {
                if self.handle(event)? == Flow::Quit {
                    break 'main;
                }
            }
        }
        info!("quit requested");
        Ok(())
    }

    /// Pause, load, resume on success. Errors are reported, not fatal.
    pub fn load(&mut self, path: &Path) {
        match self.driver.load_rom(path) {
            Ok(true) => info!(path = %path.display(), "running"),
            Ok(false) => {
                warn!(path = %path.display(), "load failed");
                self.video.set_title(&window_title(Some("Load failed")));
            }
            Err(err) => warn!(path = %path.display(), "load aborted: {err}"),
        }
    }

    fn handle(&mut self, event: Event) -> Result<Flow, FrontendError> {
        match event {
            Event::Quit { .. }
            | Event::KeyDown {
                scancode: Some(input::QUIT_KEY),
                ..
            } => return Ok(Flow::Quit),

            Event::KeyDown {
                scancode: Some(sc),
                keymod,
                repeat,
                ..
            } => self.key(input::key_event(sc, keymod, false, repeat)),

            Event::KeyUp {
                scancode: Some(sc),
                keymod,
                ..
            } => self.key(input::key_event(sc, keymod, true, false)),

            Event::DropFile { filename, .. } => self.load(Path::new(&filename)),

            Event::Window {
                win_event: WindowEvent::Exposed,
                ..
            } => self.redraw()?,

            event if event.is_user_event() => match event.as_user_event_type::<UiEvent>() {
                Some(UiEvent::Redraw) => self.redraw()?,
                Some(UiEvent::Status(status)) => self.video.set_title(&window_title(Some(&status))),
                None => {}
            },

            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn key(&mut self, event: KeyEvent) {
        let translation = self.translator.translate(&event);
        for command in translation.commands {
            if let Err(err) = self.driver.send_input(command) {
                warn!("input dropped: {err}");
            }
        }

        if !translation.consumed && !event.up && !event.repeat {
            self.accelerator(event.scancode);
        }
    }

    fn accelerator(&mut self, scancode: u32) {
        if scancode == Scancode::P as u32 {
            match self.driver.state() {
                RunState::Running => {
                    self.driver.request_pause();
                    self.video.set_title(&window_title(Some("Paused")));
                }
                RunState::Paused => {
                    self.driver.request_run();
                }
                RunState::Stopped => {}
            }
        } else if scancode == Scancode::L as u32 {
            let limit = !self.driver.limit_fps();
            self.driver.set_limit_fps(limit);
            info!(limit, "frame limiter toggled");
        }
    }

    fn redraw(&mut self) -> Result<(), FrontendError> {
        self.hooks.redraw_started();
        let video = &mut *self.video;
        self.handoff
            .consume_latest(|frame, _generation| video.present(frame))
    }
}
