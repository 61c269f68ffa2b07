//! User configuration, read once at startup from a TOML file.
//!
//! ```toml
//! [emulation]
//! direct_boot = true
//! limit_fps = true
//!
//! [audio]
//! enabled = true
//!
//! [video]
//! scale = 2
//!
//! [keys]
//! A = "X"
//! Start = "Return"
//! ```
//!
//! Key names are SDL scancode names. Slots left out of `[keys]` keep their
//! default binding.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sdl2::keyboard::Scancode;
use serde::Deserialize;
use tandem_core::input::KeyBindings;
use thiserror::Error;
use tracing::{debug, info};

use crate::input::{default_key_bindings, is_reserved};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown input slot `{0}` in [keys]")]
    UnknownSlot(String),
    #[error("unknown key `{key}` bound to slot {slot}")]
    UnknownKey { slot: String, key: String },
    #[error("key `{key}` is reserved for the UI and cannot be bound to slot {slot}")]
    ReservedKey { slot: String, key: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub emulation: EmulationConfig,
    pub audio: AudioConfig,
    pub video: VideoConfig,
    /// Slot name to SDL scancode name.
    pub keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmulationConfig {
    pub direct_boot: bool,
    pub limit_fps: bool,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            direct_boot: true,
            limit_fps: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioConfig {
    pub enabled: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    pub scale: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self { scale: 2 }
    }
}

impl Config {
    /// `<config dir>/tandem/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tandem").join("config.toml"))
    }

    /// Load from `path`, or from [`default_path`](Self::default_path) when
    /// `None`. A missing default file means defaults; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Default bindings with the `[keys]` overrides applied.
    pub fn key_bindings(&self) -> Result<KeyBindings, ConfigError> {
        let mut bindings = default_key_bindings();
        for (slot_name, key) in &self.keys {
            let slot = KeyBindings::slot_index(slot_name)
                .ok_or_else(|| ConfigError::UnknownSlot(slot_name.clone()))?;
            let scancode = Scancode::from_name(key).ok_or_else(|| ConfigError::UnknownKey {
                slot: slot_name.clone(),
                key: key.clone(),
            })?;
            if is_reserved(scancode) {
                return Err(ConfigError::ReservedKey {
                    slot: slot_name.clone(),
                    key: key.clone(),
                });
            }
            bindings.bind(slot, scancode as u32);
        }
        Ok(bindings)
    }
}
