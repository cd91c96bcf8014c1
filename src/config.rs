//! Configuration for the simulator front end.
//!
//! Loaded from a TOML file; every section and field is optional and falls back to
//! the factory behaviour of the amplifier.

use crate::input::{DEFAULT_BUTTON_DEBOUNCE_MS, DEFAULT_ENCODER_DEBOUNCE_MS};
use crate::UpdateMode;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Baud rates the amplifier's RS-232 port can be set to.
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub serial: SerialConfig,
    pub panel: PanelConfig,
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path such as `/dev/ttyUSB0` or `COM3`.
    pub port: Option<String>,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115200,
        }
    }
}

/// Timing of the simulated front panel, in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub button_debounce_ms: u64,
    pub encoder_debounce_ms: u64,
    /// How long a simulated gesture holds its pin low.
    pub hold_ms: u64,
    /// Control loop period.
    pub tick_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            button_debounce_ms: DEFAULT_BUTTON_DEBOUNCE_MS,
            encoder_debounce_ms: DEFAULT_ENCODER_DEBOUNCE_MS,
            hold_ms: 60,
            tick_ms: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Feedback mode at power-up.
    pub update_mode: UpdateMode,
}

impl SimulatorConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(ConfigError::Invalid(format!(
                "unsupported baud rate {} (expected one of {:?})",
                self.serial.baud_rate, SUPPORTED_BAUD_RATES
            )));
        }
        if self.panel.tick_ms == 0 {
            return Err(ConfigError::Invalid(String::from("panel.tick_ms must be non-zero")));
        }
        let window = self.panel.button_debounce_ms.max(self.panel.encoder_debounce_ms);
        if self.panel.hold_ms <= window {
            return Err(ConfigError::Invalid(format!(
                "panel.hold_ms ({}) must exceed the debounce windows ({} ms)",
                self.panel.hold_ms, window
            )));
        }
        Ok(())
    }
}
