//! Camera parameter negotiation.
//!
//! Programs the device with the best parameters it advertises. When the
//! hardware rejects the full set, the pre-attempt snapshot is restored and
//! a reduced safe-mode set is tried instead.

mod desired;
mod preview_size;

pub use desired::{exposure_for_torch, flash_value, DesiredParameters, FocusMode};
pub use preview_size::select_preview_size;

use crate::config::ScanSettings;
use crate::device::params::{
    CameraParameters, FLASH_MODE_OFF, FLASH_MODE_TORCH, KEY_EXPOSURE_COMPENSATION,
    KEY_FLASH_MODE, KEY_FLASH_MODE_VALUES,
};
use crate::device::{DeviceError, DeviceHandle};
use crate::geometry::Resolution;
use thiserror::Error;

/// Errors raised while programming camera parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    /// The full parameter set was refused.
    #[error("camera rejected desired parameters: {0}")]
    Rejected(#[source] DeviceError),
    /// The safe-mode set was refused as well.
    #[error("camera rejected safe-mode parameters: {0}")]
    SafeModeRejected(#[source] DeviceError),
    /// Reading parameters from the device failed.
    #[error("camera parameters unavailable: {0}")]
    Device(#[from] DeviceError),
}

/// Derives, applies and tracks camera parameters for one session.
#[derive(Debug)]
pub struct ConfigurationNegotiator {
    settings: ScanSettings,
    display: Resolution,
    screen_resolution: Option<Resolution>,
    best_preview_size: Option<Resolution>,
    camera_resolution: Option<Resolution>,
    focus_mode: Option<FocusMode>,
    torch_on: Option<bool>,
    torch_request: bool,
    safe_mode: bool,
}

impl ConfigurationNegotiator {
    /// Negotiator for `display` driven by `settings`.
    pub fn new(settings: ScanSettings, display: Resolution) -> Self {
        let torch_request = settings.torch;
        Self {
            settings,
            display,
            screen_resolution: None,
            best_preview_size: None,
            camera_resolution: None,
            focus_mode: None,
            torch_on: None,
            torch_request,
            safe_mode: false,
        }
    }

    /// Scan settings in effect.
    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Screen resolution, known once a device has been initialized.
    pub fn screen_resolution(&self) -> Option<Resolution> {
        self.screen_resolution
    }

    /// Preview resolution the device is actually streaming at.
    pub fn camera_resolution(&self) -> Option<Resolution> {
        self.camera_resolution
    }

    /// Focus mode active after the last negotiation.
    pub fn focus_mode(&self) -> Option<FocusMode> {
        self.focus_mode
    }

    /// Reads capabilities from a freshly acquired device.
    ///
    /// The screen resolution is recorded even when the device cannot be
    /// queried, so the on-screen rect stays available.
    pub fn init_from_device<D: DeviceHandle>(&mut self, device: &D) -> Result<(), NegotiationError> {
        self.screen_resolution = Some(self.display);
        self.torch_on = None;
        self.focus_mode = None;
        let params = device.parameters()?;
        self.best_preview_size = select_preview_size(&params, self.display);
        self.camera_resolution = self.best_preview_size;
        tracing::info!(
            device = device.id(),
            screen = %self.display,
            preview = ?self.best_preview_size,
            "Initialized from camera parameters"
        );
        Ok(())
    }

    /// Applies the desired parameter set, or its safe-mode subset.
    pub fn set_desired_parameters<D: DeviceHandle>(
        &mut self,
        device: &mut D,
        safe_mode: bool,
    ) -> Result<DesiredParameters, NegotiationError> {
        let mut params = device.parameters()?;
        if safe_mode {
            tracing::warn!("In camera config safe mode, most settings will not be honored");
        }
        let desired = DesiredParameters::derive(
            &self.settings,
            &params,
            self.best_preview_size,
            self.torch_request,
            safe_mode,
        );
        desired.apply(&mut params);
        device.set_parameters(&params).map_err(|e| {
            if safe_mode {
                NegotiationError::SafeModeRejected(e)
            } else {
                NegotiationError::Rejected(e)
            }
        })?;
        self.safe_mode = safe_mode;
        tracing::debug!(?desired, "Applied camera parameters");
        Ok(desired)
    }

    /// Applies the desired set with a snapshot-restore-and-retry fallback.
    ///
    /// On rejection the raw parameters captured before the attempt are
    /// restored and the safe-mode subset is applied on top. The error of
    /// the last failed step is returned if nothing could be applied.
    pub fn negotiate<D: DeviceHandle>(
        &mut self,
        device: &mut D,
    ) -> Result<DesiredParameters, NegotiationError> {
        let snapshot = device.parameters().ok().map(|params| params.flatten());
        let err = match self.set_desired_parameters(device, false) {
            Ok(desired) => return Ok(desired),
            Err(err) => err,
        };
        tracing::warn!(error = %err, "Camera rejected parameters. Setting only minimal safe-mode parameters");

        let Some(snapshot) = snapshot else {
            return Err(err);
        };
        tracing::info!(saved = %snapshot, "Resetting to saved camera params");
        let mut params = device.parameters()?;
        params.unflatten(&snapshot);
        device.set_parameters(&params)?;
        self.set_desired_parameters(device, true)
    }

    /// Re-reads the active parameters after negotiation.
    ///
    /// The device may silently pick a different preview size than the
    /// one requested; the actual size wins.
    pub fn sync_from_device<D: DeviceHandle>(&mut self, device: &D) -> Result<(), NegotiationError> {
        let params = device.parameters()?;
        if let Some(actual) = params.preview_size() {
            if let Some(best) = self.best_preview_size.filter(|best| *best != actual) {
                tracing::warn!(
                    requested = %best,
                    actual = %actual,
                    "Camera said it supported preview size, but after setting it preview size is different"
                );
            }
            self.camera_resolution = Some(actual);
        }
        self.torch_on = Some(read_torch(&params));
        self.focus_mode = params.focus_mode().and_then(FocusMode::parse);
        Ok(())
    }

    /// Returns whether the torch is lit, reading the device only when the
    /// state is not cached.
    pub fn torch_state<D: DeviceHandle>(&mut self, device: &D) -> bool {
        if let Some(on) = self.torch_on {
            return on;
        }
        match device.parameters() {
            Ok(params) => {
                let on = read_torch(&params);
                self.torch_on = Some(on);
                on
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read torch state");
                false
            }
        }
    }

    /// Switches the torch; a no-op on devices without one.
    pub fn set_torch<D: DeviceHandle>(
        &mut self,
        device: &mut D,
        on: bool,
    ) -> Result<(), NegotiationError> {
        let mut params = device.parameters()?;
        if !supports_torch(&params) {
            tracing::debug!("Torch not supported by camera");
            return Ok(());
        }
        params.set(KEY_FLASH_MODE, flash_value(on));
        if self.settings.best_exposure && !self.safe_mode {
            if let Some(index) = exposure_for_torch(&params, on) {
                params.set(KEY_EXPOSURE_COMPENSATION, index.to_string());
            }
        }
        device
            .set_parameters(&params)
            .map_err(NegotiationError::Rejected)?;
        self.torch_on = Some(on);
        self.torch_request = on;
        tracing::info!(on, "Torch switched");
        Ok(())
    }
}

fn supports_torch(params: &CameraParameters) -> bool {
    params.supports(KEY_FLASH_MODE_VALUES, FLASH_MODE_TORCH)
        && params.supports(KEY_FLASH_MODE_VALUES, FLASH_MODE_OFF)
}

fn read_torch(params: &CameraParameters) -> bool {
    params.flash_mode() == Some(FLASH_MODE_TORCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::params::KEY_SCENE_MODE;
    use crate::device::MockDevice;

    fn negotiator(settings: ScanSettings) -> ConfigurationNegotiator {
        ConfigurationNegotiator::new(settings, Resolution::new(1080, 1920))
    }

    #[test]
    fn test_full_parameters_accepted() {
        let mut device = MockDevice::new(0);
        let probe = device.probe();
        let mut neg = negotiator(ScanSettings::default());
        neg.init_from_device(&device).unwrap();

        let desired = neg.negotiate(&mut device).unwrap();
        assert!(!desired.safe_mode);
        assert_eq!(probe.calls().set_parameters, 1);
        assert_eq!(probe.parameters().preview_size(), Some(Resolution::new(1920, 1080)));
    }

    #[test]
    fn test_safe_mode_after_rejection() {
        let mut device = MockDevice::new(0);
        let probe = device.probe();
        probe.reject(KEY_SCENE_MODE, "barcode");
        let mut neg = negotiator(ScanSettings {
            barcode_scene_mode: true,
            ..Default::default()
        });
        neg.init_from_device(&device).unwrap();

        let desired = neg.negotiate(&mut device).unwrap();
        assert!(desired.safe_mode);
        // full attempt, restore, safe attempt
        assert_eq!(probe.calls().set_parameters, 3);
        assert_eq!(probe.parameters().get(KEY_SCENE_MODE), Some("auto"));
        assert_eq!(probe.parameters().focus_mode(), Some("auto"));
    }

    #[test]
    fn test_both_attempts_rejected() {
        let mut device = MockDevice::new(0);
        let probe = device.probe();
        probe.reject("preview-size", "1920x1080");
        let mut neg = negotiator(ScanSettings::default());
        neg.init_from_device(&device).unwrap();

        let result = neg.negotiate(&mut device);
        assert!(matches!(result, Err(NegotiationError::SafeModeRejected(_))));
        // The restored snapshot is still in place.
        assert_eq!(probe.parameters().preview_size(), Some(Resolution::new(640, 480)));

        neg.sync_from_device(&device).unwrap();
        assert_eq!(neg.camera_resolution(), Some(Resolution::new(640, 480)));
    }

    #[test]
    fn test_torch_state_is_cached() {
        let mut device = MockDevice::new(0);
        let probe = device.probe();
        let mut neg = negotiator(ScanSettings::default());
        neg.init_from_device(&device).unwrap();
        neg.negotiate(&mut device).unwrap();
        neg.sync_from_device(&device).unwrap();

        probe.reset_calls();
        assert!(!neg.torch_state(&device));
        assert_eq!(probe.calls().total(), 0);

        neg.set_torch(&mut device, true).unwrap();
        assert!(probe.torch_on());
        assert!(neg.torch_state(&device));
    }

    #[test]
    fn test_torch_unsupported_is_noop() {
        let mut params = crate::device::default_parameters();
        params.remove(KEY_FLASH_MODE_VALUES);
        let mut device = MockDevice::with_parameters(0, params);
        let probe = device.probe();
        let mut neg = negotiator(ScanSettings::default());

        neg.set_torch(&mut device, true).unwrap();
        assert_eq!(probe.calls().set_parameters, 0);
        assert!(!probe.torch_on());
    }
}
