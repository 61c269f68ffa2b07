use thiserror::Error;

/// Failures surfaced by the [`Driver`](crate::driver::Driver) handle.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to spawn driver thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("driver has stopped")]
    Stopped,
    #[error("driver thread panicked")]
    Panicked,
    #[error("a ROM load is already in progress")]
    Busy,
    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("cannot allocate {bytes} byte frame buffer")]
    Allocation { bytes: usize },
    #[error("frame is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Audio output could not be brought up. Never fatal: the driver logs it
/// and runs without sound.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("unsupported output configuration: {0}")]
    Unsupported(String),
    #[error("audio stream error: {0}")]
    Stream(String),
}
