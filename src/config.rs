//! Reader configuration: pointer behavior settings and display viewports.
//!
//! The configuration is persisted as TOML under the user config directory and
//! is read-only from the mapper core's perspective; reconfiguration commands
//! carry a snapshot of it together with the changed categories.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mapper::transform::{RectF, Rotation};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("No config directory available on this system")]
    NoConfigDir,
}

/// One logical display the reader knows about.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DisplayViewport {
    pub display_id: i32,
    pub bounds: RectF,
    pub rotation: Rotation,
}

impl Default for DisplayViewport {
    fn default() -> Self {
        Self {
            display_id: 0,
            bounds: RectF::new(0.0, 0.0, 1920.0, 1080.0),
            rotation: Rotation::Deg0,
        }
    }
}

/// Pointer behavior settings.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PointerSettings {
    /// User speed setting, -7 (slowest) to 7 (fastest).
    pub speed: i32,
    /// Selects the curved ballistics profile instead of the legacy linear
    /// ramp. Fixed per mapper lifetime; evaluated at construction.
    pub curved_ballistics: bool,
    /// Pointer Capture: relative-only output decoupled from the cursor.
    pub capture: bool,
    /// Speed (px/s) below which no acceleration applies.
    pub gain_low_speed: f32,
    /// Speed (px/s) at which full acceleration applies.
    pub gain_high_speed: f32,
    /// Gain factor at full acceleration.
    pub acceleration: f32,
    /// Scroll wheel scale per tick.
    pub wheel_scale: f32,
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            speed: 0,
            curved_ballistics: false,
            capture: false,
            gain_low_speed: 500.0,
            gain_high_speed: 3000.0,
            acceleration: 3.0,
            wheel_scale: 1.0,
        }
    }
}

/// Complete reader configuration consumed by device mappers.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct ReaderConfig {
    #[serde(default)]
    pub pointer: PointerSettings,
    #[serde(default = "default_displays")]
    pub displays: Vec<DisplayViewport>,
    /// Display that cursor devices attach to. None means the device has no
    /// target and motion output is suppressed.
    #[serde(default)]
    pub default_display: Option<i32>,
}

fn default_displays() -> Vec<DisplayViewport> {
    vec![DisplayViewport::default()]
}

impl ReaderConfig {
    pub fn with_defaults() -> Self {
        Self {
            pointer: PointerSettings::default(),
            displays: default_displays(),
            default_display: Some(0),
        }
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("cursormap");
        path.push("config.toml");
        Ok(path)
    }

    /// Writes the default configuration if none exists yet.
    pub fn ensure_default_config() -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(&Self::with_defaults())?;
        fs::write(&path, rendered)?;
        info!("Wrote default configuration to {:?}", path);
        Ok(())
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        let raw = fs::read_to_string(&path)?;
        let config: ReaderConfig = toml::from_str(&raw)?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Loads the persisted configuration, falling back to defaults.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Using default configuration: {}", e);
                Self::with_defaults()
            }
        }
    }

    /// Resolves the viewport for a display id, or the reader's default
    /// display when none is given.
    pub fn viewport(&self, display_id: Option<i32>) -> Option<&DisplayViewport> {
        let wanted = display_id.or(self.default_display)?;
        self.displays.iter().find(|v| v.display_id == wanted)
    }
}
