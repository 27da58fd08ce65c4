//! Raw camera parameter map.
//!
//! Devices exchange parameters as string key/value pairs. The flattened
//! `key=value;key=value` form is what gets snapshotted before negotiation
//! and restored if the device rejects the new set.

use crate::geometry::Resolution;
use std::collections::BTreeMap;
use std::fmt;

/// Active preview size, `WxH`.
pub const KEY_PREVIEW_SIZE: &str = "preview-size";
/// Supported preview sizes.
pub const KEY_PREVIEW_SIZE_VALUES: &str = "preview-size-values";
/// Active focus mode.
pub const KEY_FOCUS_MODE: &str = "focus-mode";
/// Supported focus modes.
pub const KEY_FOCUS_MODE_VALUES: &str = "focus-mode-values";
/// Active flash mode.
pub const KEY_FLASH_MODE: &str = "flash-mode";
/// Supported flash modes.
pub const KEY_FLASH_MODE_VALUES: &str = "flash-mode-values";
/// Active scene mode.
pub const KEY_SCENE_MODE: &str = "scene-mode";
/// Supported scene modes.
pub const KEY_SCENE_MODE_VALUES: &str = "scene-mode-values";
/// Active color effect.
pub const KEY_EFFECT: &str = "effect";
/// Supported color effects.
pub const KEY_EFFECT_VALUES: &str = "effect-values";
/// Exposure compensation index.
pub const KEY_EXPOSURE_COMPENSATION: &str = "exposure-compensation";
/// Lowest exposure compensation index.
pub const KEY_MIN_EXPOSURE_COMPENSATION: &str = "min-exposure-compensation";
/// Highest exposure compensation index.
pub const KEY_MAX_EXPOSURE_COMPENSATION: &str = "max-exposure-compensation";
/// EV per exposure compensation index.
pub const KEY_EXPOSURE_COMPENSATION_STEP: &str = "exposure-compensation-step";
/// Metering areas the device accepts.
pub const KEY_MAX_NUM_METERING_AREAS: &str = "max-num-metering-areas";
/// Metering areas.
pub const KEY_METERING_AREAS: &str = "metering-areas";
/// Focus areas the device accepts.
pub const KEY_MAX_NUM_FOCUS_AREAS: &str = "max-num-focus-areas";
/// Focus areas.
pub const KEY_FOCUS_AREAS: &str = "focus-areas";

/// Flash mode that keeps the LED lit.
pub const FLASH_MODE_TORCH: &str = "torch";
/// Flash disabled.
pub const FLASH_MODE_OFF: &str = "off";

/// String-keyed camera parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraParameters {
    values: BTreeMap<String, String>,
}

impl CameraParameters {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a flattened parameter string.
    pub fn from_flattened(flat: &str) -> Self {
        let mut params = Self::new();
        params.unflatten(flat);
        params
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Sets `key` to `value`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Removes `key`, returning its old value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Value of `key` parsed as an integer.
    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key)?.trim().parse().ok()
    }

    /// Value of `key` parsed as a float.
    pub fn get_float(&self, key: &str) -> Option<f32> {
        self.get(key)?.trim().parse().ok()
    }

    /// Splits a comma-separated `*-values` entry.
    pub fn supported_values(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Returns true if `value` is listed under the `*-values` key.
    pub fn supports(&self, values_key: &str, value: &str) -> bool {
        self.supported_values(values_key).contains(&value)
    }

    /// Active preview size.
    pub fn preview_size(&self) -> Option<Resolution> {
        Resolution::parse(self.get(KEY_PREVIEW_SIZE)?)
    }

    /// Requests a preview size.
    pub fn set_preview_size(&mut self, size: Resolution) {
        self.set(KEY_PREVIEW_SIZE, size.to_string());
    }

    /// Preview sizes the device advertises.
    pub fn supported_preview_sizes(&self) -> Vec<Resolution> {
        self.supported_values(KEY_PREVIEW_SIZE_VALUES)
            .into_iter()
            .filter_map(Resolution::parse)
            .collect()
    }

    /// Active flash mode.
    pub fn flash_mode(&self) -> Option<&str> {
        self.get(KEY_FLASH_MODE)
    }

    /// Active focus mode.
    pub fn focus_mode(&self) -> Option<&str> {
        self.get(KEY_FOCUS_MODE)
    }

    /// Serializes to the `key=value;key=value` form.
    pub fn flatten(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Replaces every entry with those parsed from `flat`.
    ///
    /// Malformed entries without `=` are skipped.
    pub fn unflatten(&mut self, flat: &str) {
        self.values.clear();
        for entry in flat.split(';') {
            if let Some((key, value)) = entry.split_once('=') {
                if !key.is_empty() {
                    self.values.insert(key.to_string(), value.to_string());
                }
            }
        }
    }
}

impl fmt::Display for CameraParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flatten())
    }
}
