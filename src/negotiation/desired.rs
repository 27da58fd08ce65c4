//! Desired parameter derivation.

use crate::config::ScanSettings;
use crate::device::params::*;
use crate::geometry::Resolution;
use std::fmt;

/// Exposure compensation target in EV with the torch off.
const MAX_EXPOSURE_COMPENSATION: f32 = 1.5;
/// Exposure compensation target in EV with the torch on.
const MIN_EXPOSURE_COMPENSATION: f32 = 0.0;
/// Half-size of the centered metering area, in the -1000..1000 space.
const METERING_AREA_PER_1000: i32 = 400;

const SCENE_MODE_BARCODE: &str = "barcode";
const EFFECT_NEGATIVE: &str = "negative";

/// Focus modes the negotiator may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusMode {
    /// Single focus pass per trigger.
    Auto,
    /// Single close-up focus pass per trigger.
    Macro,
    /// Continuous focus tuned for stills.
    ContinuousPicture,
    /// Continuous focus tuned for video.
    ContinuousVideo,
}

impl FocusMode {
    /// Parameter value for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusMode::Auto => "auto",
            FocusMode::Macro => "macro",
            FocusMode::ContinuousPicture => "continuous-picture",
            FocusMode::ContinuousVideo => "continuous-video",
        }
    }

    /// Parses a parameter value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(FocusMode::Auto),
            "macro" => Some(FocusMode::Macro),
            "continuous-picture" => Some(FocusMode::ContinuousPicture),
            "continuous-video" => Some(FocusMode::ContinuousVideo),
            _ => None,
        }
    }

    /// Returns true if the mode only focuses when explicitly triggered.
    pub fn needs_trigger(&self) -> bool {
        matches!(self, FocusMode::Auto | FocusMode::Macro)
    }
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter set derived for one negotiation attempt.
///
/// Fields are `None` when the device does not support the value or when
/// safe mode leaves the setting untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredParameters {
    /// Reduced set: only focus, torch and preview size.
    pub safe_mode: bool,
    /// Preview size to request.
    pub preview_size: Option<Resolution>,
    /// Focus mode to request.
    pub focus_mode: Option<FocusMode>,
    /// Requested torch state; `None` if the device has no torch.
    pub torch: Option<bool>,
    /// Scene mode to request.
    pub scene_mode: Option<String>,
    /// Color effect to request.
    pub color_effect: Option<String>,
    /// Whether to center metering and focus areas.
    pub metering: bool,
    /// Exposure compensation index to request.
    pub exposure_compensation: Option<i32>,
}

impl DesiredParameters {
    /// Derives the set from `settings` and the device's advertised values.
    pub fn derive(
        settings: &ScanSettings,
        current: &CameraParameters,
        preview_size: Option<Resolution>,
        torch: bool,
        safe_mode: bool,
    ) -> Self {
        let focus_mode = if settings.auto_focus {
            select_focus_mode(current, safe_mode || settings.disable_continuous_focus, safe_mode)
        } else {
            None
        };

        let torch_supported = current.supports(KEY_FLASH_MODE_VALUES, FLASH_MODE_TORCH)
            && current.supports(KEY_FLASH_MODE_VALUES, FLASH_MODE_OFF);

        let mut desired = Self {
            safe_mode,
            preview_size,
            focus_mode,
            torch: torch_supported.then_some(torch),
            scene_mode: None,
            color_effect: None,
            metering: false,
            exposure_compensation: None,
        };

        if safe_mode {
            return desired;
        }

        if settings.invert_scan && current.supports(KEY_EFFECT_VALUES, EFFECT_NEGATIVE) {
            desired.color_effect = Some(EFFECT_NEGATIVE.to_string());
        }
        if settings.barcode_scene_mode && current.supports(KEY_SCENE_MODE_VALUES, SCENE_MODE_BARCODE)
        {
            desired.scene_mode = Some(SCENE_MODE_BARCODE.to_string());
        }
        if settings.metering {
            desired.metering = current.get_int(KEY_MAX_NUM_METERING_AREAS).unwrap_or(0) > 0;
        }
        if settings.best_exposure {
            desired.exposure_compensation = exposure_for_torch(current, torch);
        }
        desired
    }

    /// Writes the set into `params`.
    pub fn apply(&self, params: &mut CameraParameters) {
        if let Some(size) = self.preview_size {
            params.set_preview_size(size);
        }
        if let Some(mode) = self.focus_mode {
            params.set(KEY_FOCUS_MODE, mode.as_str());
        }
        if let Some(on) = self.torch {
            params.set(KEY_FLASH_MODE, flash_value(on));
        }
        if let Some(scene) = &self.scene_mode {
            params.set(KEY_SCENE_MODE, scene.as_str());
        }
        if let Some(effect) = &self.color_effect {
            params.set(KEY_EFFECT, effect.as_str());
        }
        if self.metering {
            let area = middle_area(METERING_AREA_PER_1000);
            params.set(KEY_METERING_AREAS, area.clone());
            if params.get_int(KEY_MAX_NUM_FOCUS_AREAS).unwrap_or(0) > 0 {
                params.set(KEY_FOCUS_AREAS, area);
            }
        }
        if let Some(index) = self.exposure_compensation {
            params.set(KEY_EXPOSURE_COMPENSATION, index.to_string());
        }
    }
}

/// Flash-mode value for a torch state.
pub fn flash_value(on: bool) -> &'static str {
    if on {
        FLASH_MODE_TORCH
    } else {
        FLASH_MODE_OFF
    }
}

fn select_focus_mode(
    params: &CameraParameters,
    plain_auto: bool,
    safe_mode: bool,
) -> Option<FocusMode> {
    let mut candidates = if plain_auto {
        vec![FocusMode::Auto]
    } else {
        vec![
            FocusMode::ContinuousPicture,
            FocusMode::ContinuousVideo,
            FocusMode::Auto,
        ]
    };
    if !safe_mode {
        candidates.push(FocusMode::Macro);
    }
    candidates
        .into_iter()
        .find(|mode| params.supports(KEY_FOCUS_MODE_VALUES, mode.as_str()))
}

/// Exposure compensation index for the torch state, clamped to the
/// device range. `None` if the device has no compensation range.
pub fn exposure_for_torch(params: &CameraParameters, torch: bool) -> Option<i32> {
    let min = params.get_int(KEY_MIN_EXPOSURE_COMPENSATION)?;
    let max = params.get_int(KEY_MAX_EXPOSURE_COMPENSATION)?;
    let step = params.get_float(KEY_EXPOSURE_COMPENSATION_STEP)?;
    if (min == 0 && max == 0) || step <= 0.0 {
        return None;
    }
    let target = if torch {
        MIN_EXPOSURE_COMPENSATION
    } else {
        MAX_EXPOSURE_COMPENSATION
    };
    let index = (target / step).round() as i32;
    Some(index.clamp(min, max))
}

fn middle_area(per_1000: i32) -> String {
    format!("(-{per_1000},-{per_1000},{per_1000},{per_1000},1)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::default_parameters;

    #[test]
    fn test_prefers_continuous_focus() {
        let desired = DesiredParameters::derive(
            &ScanSettings::default(),
            &default_parameters(),
            None,
            false,
            false,
        );
        assert_eq!(desired.focus_mode, Some(FocusMode::ContinuousPicture));
        assert_eq!(desired.torch, Some(false));
    }

    #[test]
    fn test_safe_mode_uses_auto_and_skips_extras() {
        let settings = ScanSettings {
            invert_scan: true,
            barcode_scene_mode: true,
            metering: true,
            best_exposure: true,
            ..Default::default()
        };
        let full = DesiredParameters::derive(&settings, &default_parameters(), None, false, false);
        assert_eq!(full.scene_mode.as_deref(), Some("barcode"));
        assert_eq!(full.color_effect.as_deref(), Some("negative"));
        assert!(full.metering);
        assert_eq!(full.exposure_compensation, Some(3));

        let safe = DesiredParameters::derive(&settings, &default_parameters(), None, false, true);
        assert_eq!(safe.focus_mode, Some(FocusMode::Auto));
        assert!(safe.scene_mode.is_none());
        assert!(safe.color_effect.is_none());
        assert!(!safe.metering);
        assert!(safe.exposure_compensation.is_none());
    }

    #[test]
    fn test_macro_fallback_only_outside_safe_mode() {
        let mut params = default_parameters();
        params.set(KEY_FOCUS_MODE_VALUES, "macro,fixed");
        let settings = ScanSettings::default();
        assert_eq!(
            DesiredParameters::derive(&settings, &params, None, false, false).focus_mode,
            Some(FocusMode::Macro)
        );
        assert_eq!(
            DesiredParameters::derive(&settings, &params, None, false, true).focus_mode,
            None
        );
    }

    #[test]
    fn test_no_torch_without_flash_support() {
        let mut params = default_parameters();
        params.remove(KEY_FLASH_MODE_VALUES);
        let desired = DesiredParameters::derive(&ScanSettings::default(), &params, None, true, false);
        assert_eq!(desired.torch, None);
    }

    #[test]
    fn test_apply_writes_values() {
        let settings = ScanSettings {
            metering: true,
            ..Default::default()
        };
        let mut params = default_parameters();
        let desired = DesiredParameters::derive(
            &settings,
            &params,
            Some(Resolution::new(1280, 720)),
            true,
            false,
        );
        desired.apply(&mut params);
        assert_eq!(params.preview_size(), Some(Resolution::new(1280, 720)));
        assert_eq!(params.flash_mode(), Some("torch"));
        assert_eq!(params.focus_mode(), Some("continuous-picture"));
        assert_eq!(params.get(KEY_METERING_AREAS), Some("(-400,-400,400,400,1)"));
        assert_eq!(params.get(KEY_FOCUS_AREAS), Some("(-400,-400,400,400,1)"));
    }

    #[test]
    fn test_exposure_clamped_to_range() {
        let mut params = default_parameters();
        params.set(KEY_EXPOSURE_COMPENSATION_STEP, "0.1");
        // 1.5 / 0.1 = 15, clamped to max 4
        assert_eq!(exposure_for_torch(&params, false), Some(4));
        assert_eq!(exposure_for_torch(&params, true), Some(0));
    }
}
