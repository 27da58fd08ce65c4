//! Scanner configuration.
//!
//! Every section has sensible defaults so a partial TOML file is valid.

use crate::geometry::Resolution;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Camera feature switches used when negotiating parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Use autofocus at all.
    pub auto_focus: bool,
    /// Prefer plain auto focus over continuous modes.
    pub disable_continuous_focus: bool,
    /// Apply a negative color effect to scan inverted codes.
    pub invert_scan: bool,
    /// Request the barcode scene mode.
    pub barcode_scene_mode: bool,
    /// Center metering and focus areas on the frame.
    pub metering: bool,
    /// Tune exposure compensation to the torch state.
    pub best_exposure: bool,
    /// Initial torch state.
    pub torch: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            auto_focus: true,
            disable_continuous_focus: false,
            invert_scan: false,
            barcode_scene_mode: false,
            metering: false,
            best_exposure: false,
            torch: false,
        }
    }
}

/// Camera selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera id to open; the provider's default when absent.
    pub requested_id: Option<u32>,
}

/// Display the scan region is drawn on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Screen width in pixels.
    pub width: u32,
    /// Screen height in pixels.
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

impl DisplayConfig {
    /// Screen size as a [`Resolution`].
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Auto-focus timer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Delay between focus triggers in milliseconds.
    pub interval_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

impl FocusConfig {
    /// Auto-focus trigger period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A display dimension is zero.
    #[error("invalid display dimensions {0}x{1}")]
    InvalidDisplay(u32, u32),
    /// The auto-focus interval is zero.
    #[error("auto-focus interval must be non-zero")]
    InvalidFocusInterval,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Camera selection.
    #[serde(default)]
    pub camera: CameraConfig,
    /// Display the preview is shown on.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Scan behavior flags.
    #[serde(default)]
    pub scan: ScanSettings,
    /// Auto-focus timing.
    #[serde(default)]
    pub focus: FocusConfig,
}

impl ScannerConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::InvalidDisplay(
                self.display.width,
                self.display.height,
            ));
        }
        if self.focus.interval_ms == 0 {
            return Err(ConfigError::InvalidFocusInterval);
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScannerConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml_str(&content)
    }
}
