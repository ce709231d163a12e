use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::loader::DEFAULT_STREAM_CHUNK_BYTES;

/// Resource manager settings. Services are injected separately.
///
/// ```ron
/// (
///     location_root: "assets",
///     simulation_on_editor: true,
///     auto_release_interval_secs: 30.0,
/// )
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ResourceConfig {
    /// Root every location is relative to; the source tree in simulation mode.
    pub location_root: PathBuf,
    /// Load source files directly instead of going through bundles.
    pub simulation_on_editor: bool,
    /// `<= 0` disables the automatic sweep; call `release` manually then.
    pub auto_release_interval_secs: f32,
    pub stream_chunk_bytes: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            location_root: PathBuf::from("."),
            simulation_on_editor: false,
            auto_release_interval_secs: 0.0,
            stream_chunk_bytes: DEFAULT_STREAM_CHUNK_BYTES,
        }
    }
}

impl ResourceConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }
}
