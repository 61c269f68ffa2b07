//! Run/pause/stop state shared between the UI thread and the driver thread.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Stopped = 0,
    Paused = 1,
    Running = 2,
}

impl RunState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => RunState::Paused,
            2 => RunState::Running,
            _ => RunState::Stopped,
        }
    }
}

/// Atomic cell holding a [`RunState`].
///
/// `Stopped` is terminal: once stored, `run()` and `pause()` are refused.
#[derive(Debug)]
pub struct SharedRunState(AtomicU8);

impl Default for SharedRunState {
    fn default() -> Self {
        Self::new(RunState::Paused)
    }
}

impl SharedRunState {
    pub fn new(initial: RunState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    pub fn get(&self) -> RunState {
        RunState::from_raw(self.0.load(Ordering::SeqCst))
    }

    pub fn is_stopped(&self) -> bool {
        self.get() == RunState::Stopped
    }

    pub fn stop(&self) {
        self.0.store(RunState::Stopped as u8, Ordering::SeqCst);
    }

    /// Returns `false` if the state was already `Stopped`.
    pub fn pause(&self) -> bool {
        self.transition(RunState::Paused)
    }

    /// Returns `false` if the state was already `Stopped`.
    pub fn run(&self) -> bool {
        self.transition(RunState::Running)
    }

    /// `Paused -> Running` only. Used to finish a load without clobbering a
    /// stop that arrived while the load was in flight.
    pub fn resume_from_pause(&self) -> bool {
        self.0
            .compare_exchange(
                RunState::Paused as u8,
                RunState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    fn transition(&self, to: RunState) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                (cur != RunState::Stopped as u8).then_some(to as u8)
            })
            .is_ok()
    }
}
