use tandem_core::error::{DriverError, HandoffError};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("SDL: {0}")]
    Sdl(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
    #[error("unknown machine `{name}` (available: {available})")]
    UnknownMachine { name: String, available: String },
}

impl FrontendError {
    /// SDL reports failures as plain strings or assorted error types.
    pub fn sdl(err: impl ToString) -> Self {
        FrontendError::Sdl(err.to_string())
    }
}
