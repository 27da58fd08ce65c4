//! In-memory camera device for tests and demos.
//!
//! Every [`MockDevice`] clone shares one state block, so a test can hand
//! the device to a session and keep a [`MockProbe`] to inspect hardware
//! calls, reject parameter values and push frames.

use super::frame::{FrameCallback, PreviewFrame};
use super::handle::{DeviceError, DeviceHandle, DeviceProvider, FocusDriver, PreviewSurface};
use super::params::*;
use crate::geometry::Resolution;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-operation hardware call counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    /// `parameters` calls.
    pub get_parameters: u32,
    /// `set_parameters` calls.
    pub set_parameters: u32,
    /// `set_preview_surface` calls.
    pub set_surface: u32,
    /// `start_preview` calls.
    pub start_preview: u32,
    /// `stop_preview` calls.
    pub stop_preview: u32,
    /// `set_one_shot_callback` calls, including clears.
    pub set_callback: u32,
    /// Focus trigger calls.
    pub trigger_focus: u32,
    /// `release` calls.
    pub release: u32,
}

impl CallCounts {
    /// Total number of calls that reached the device.
    pub fn total(&self) -> u32 {
        self.get_parameters
            + self.set_parameters
            + self.set_surface
            + self.start_preview
            + self.stop_preview
            + self.set_callback
            + self.trigger_focus
            + self.release
    }
}

struct MockState {
    params: CameraParameters,
    rejected: Vec<(String, String)>,
    surface: Option<PreviewSurface>,
    fail_surface: bool,
    previewing: bool,
    callback: Option<FrameCallback>,
    calls: CallCounts,
    released: bool,
    sequence: u64,
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Parameters of a typical phone back camera.
pub fn default_parameters() -> CameraParameters {
    let mut params = CameraParameters::new();
    params.set(KEY_PREVIEW_SIZE, "640x480");
    params.set(KEY_PREVIEW_SIZE_VALUES, "1920x1080,1280x720,960x720,640x480,352x288");
    params.set(KEY_FOCUS_MODE, "auto");
    params.set(KEY_FOCUS_MODE_VALUES, "auto,macro,continuous-picture,continuous-video");
    params.set(KEY_FLASH_MODE, FLASH_MODE_OFF);
    params.set(KEY_FLASH_MODE_VALUES, "off,auto,on,torch");
    params.set(KEY_SCENE_MODE, "auto");
    params.set(KEY_SCENE_MODE_VALUES, "auto,barcode,night");
    params.set(KEY_EFFECT, "none");
    params.set(KEY_EFFECT_VALUES, "none,mono,negative");
    params.set(KEY_EXPOSURE_COMPENSATION, "0");
    params.set(KEY_MIN_EXPOSURE_COMPENSATION, "-4");
    params.set(KEY_MAX_EXPOSURE_COMPENSATION, "4");
    params.set(KEY_EXPOSURE_COMPENSATION_STEP, "0.5");
    params.set(KEY_MAX_NUM_METERING_AREAS, "1");
    params.set(KEY_MAX_NUM_FOCUS_AREAS, "1");
    params
}

/// Mock camera backed by shared in-memory state.
#[derive(Clone)]
pub struct MockDevice {
    id: u32,
    autofocus: bool,
    state: SharedState,
}

impl MockDevice {
    /// Mock camera `id` with [`default_parameters`].
    pub fn new(id: u32) -> Self {
        Self::with_parameters(id, default_parameters())
    }

    /// Mock camera `id` advertising `params`.
    pub fn with_parameters(id: u32, params: CameraParameters) -> Self {
        Self {
            id,
            autofocus: true,
            state: Arc::new(Mutex::new(MockState {
                params,
                rejected: Vec::new(),
                surface: None,
                fail_surface: false,
                previewing: false,
                callback: None,
                calls: CallCounts::default(),
                released: false,
                sequence: 0,
            })),
        }
    }

    /// Removes the focus trigger, like a fixed-focus camera.
    pub fn without_autofocus(mut self) -> Self {
        self.autofocus = false;
        self
    }

    /// Makes surface binding fail.
    pub fn with_failing_surface(self) -> Self {
        lock(&self.state).fail_surface = true;
        self
    }

    /// Returns a probe sharing this device's state.
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("id", &self.id)
            .field("autofocus", &self.autofocus)
            .finish()
    }
}

impl DeviceHandle for MockDevice {
    fn id(&self) -> u32 {
        self.id
    }

    fn parameters(&self) -> Result<CameraParameters, DeviceError> {
        let mut state = lock(&self.state);
        state.calls.get_parameters += 1;
        if state.released {
            return Err(DeviceError::Released);
        }
        Ok(state.params.clone())
    }

    fn set_parameters(&mut self, params: &CameraParameters) -> Result<(), DeviceError> {
        let mut state = lock(&self.state);
        state.calls.set_parameters += 1;
        if state.released {
            return Err(DeviceError::Released);
        }
        if let Some((key, value)) = state
            .rejected
            .iter()
            .find(|(key, value)| params.get(key) == Some(value.as_str()))
        {
            return Err(DeviceError::ParametersRejected(format!("{key}={value}")));
        }
        if let Some(size) = params.preview_size() {
            let supported = params.supported_preview_sizes();
            if !supported.is_empty() && !supported.contains(&size) {
                return Err(DeviceError::ParametersRejected(format!(
                    "unsupported preview size {size}"
                )));
            }
        }
        state.params = params.clone();
        tracing::trace!(params = %params, "MockDevice parameters set");
        Ok(())
    }

    fn set_preview_surface(&mut self, surface: &PreviewSurface) -> Result<(), DeviceError> {
        let mut state = lock(&self.state);
        state.calls.set_surface += 1;
        if state.fail_surface {
            return Err(DeviceError::SurfaceFailed(surface.name().to_string()));
        }
        state.surface = Some(surface.clone());
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), DeviceError> {
        let mut state = lock(&self.state);
        state.calls.start_preview += 1;
        if state.released {
            return Err(DeviceError::Released);
        }
        state.previewing = true;
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), DeviceError> {
        let mut state = lock(&self.state);
        state.calls.stop_preview += 1;
        state.previewing = false;
        Ok(())
    }

    fn set_one_shot_callback(&mut self, callback: Option<FrameCallback>) {
        let mut state = lock(&self.state);
        state.calls.set_callback += 1;
        state.callback = callback;
    }

    fn focus_driver(&self) -> Option<Arc<dyn FocusDriver>> {
        if !self.autofocus {
            return None;
        }
        Some(Arc::new(MockFocus {
            state: Arc::clone(&self.state),
        }))
    }

    fn release(&mut self) {
        let mut state = lock(&self.state);
        state.calls.release += 1;
        state.released = true;
        state.previewing = false;
        state.callback = None;
        state.surface = None;
        tracing::info!(id = self.id, "MockDevice released");
    }
}

struct MockFocus {
    state: SharedState,
}

impl FocusDriver for MockFocus {
    fn trigger_focus(&self) -> Result<(), DeviceError> {
        let mut state = lock(&self.state);
        state.calls.trigger_focus += 1;
        if state.released {
            return Err(DeviceError::Released);
        }
        Ok(())
    }
}

/// Test-side view of a [`MockDevice`]'s state.
#[derive(Clone)]
pub struct MockProbe {
    state: SharedState,
}

impl MockProbe {
    /// Snapshot of the call counters.
    pub fn calls(&self) -> CallCounts {
        lock(&self.state).calls
    }

    /// Zeroes the call counters.
    pub fn reset_calls(&self) {
        lock(&self.state).calls = CallCounts::default();
    }

    /// Current parameters, read without counting as a hardware call.
    pub fn parameters(&self) -> CameraParameters {
        lock(&self.state).params.clone()
    }

    /// Rejects any parameter set containing `key=value`.
    pub fn reject(&self, key: &str, value: &str) {
        lock(&self.state)
            .rejected
            .push((key.to_string(), value.to_string()));
    }

    /// Accepts every value again.
    pub fn clear_rejections(&self) {
        lock(&self.state).rejected.clear();
    }

    /// Whether the device is streaming.
    pub fn is_previewing(&self) -> bool {
        lock(&self.state).previewing
    }

    /// Whether a one-shot callback is armed.
    pub fn has_callback(&self) -> bool {
        lock(&self.state).callback.is_some()
    }

    /// The bound preview surface, if any.
    pub fn surface(&self) -> Option<PreviewSurface> {
        lock(&self.state).surface.clone()
    }

    /// Whether the device has been released.
    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }

    /// Whether the active flash mode is `torch`.
    pub fn torch_on(&self) -> bool {
        lock(&self.state).params.flash_mode() == Some(FLASH_MODE_TORCH)
    }

    /// Delivers a synthetic frame at the current preview size.
    ///
    /// Returns false if no callback was pending or the device is not
    /// streaming.
    pub fn deliver_frame(&self) -> bool {
        let size = lock(&self.state)
            .params
            .preview_size()
            .unwrap_or(Resolution::new(640, 480));
        let sequence = lock(&self.state).sequence;
        self.deliver(synthetic_nv21(size, sequence))
    }

    /// Delivers `data` as a frame at the current preview size.
    pub fn deliver(&self, data: Vec<u8>) -> bool {
        let (callback, frame) = {
            let mut state = lock(&self.state);
            if !state.previewing {
                return false;
            }
            let Some(callback) = state.callback.take() else {
                return false;
            };
            state.sequence += 1;
            let size = state
                .params
                .preview_size()
                .unwrap_or(Resolution::new(640, 480));
            (
                callback,
                PreviewFrame::new(data, size.width, size.height, state.sequence),
            )
        };
        // Invoked outside the lock so the callback may call back into the session.
        callback(frame);
        true
    }
}

fn synthetic_nv21(size: Resolution, sequence: u64) -> Vec<u8> {
    let (w, h) = (size.width as usize, size.height as usize);
    let mut data = Vec::with_capacity(w * h * 3 / 2);
    for y in 0..h {
        for x in 0..w {
            data.push(((x + y + sequence as usize) % 256) as u8);
        }
    }
    data.resize(w * h * 3 / 2, 128);
    data
}

/// Provider handing out clones of a fixed set of mock devices.
#[derive(Debug, Default)]
pub struct MockProvider {
    devices: Vec<MockDevice>,
    acquisitions: u32,
}

impl MockProvider {
    /// Provider handing out `devices`.
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            acquisitions: 0,
        }
    }

    /// Provider with no cameras attached.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of successful acquisitions.
    pub fn acquisitions(&self) -> u32 {
        self.acquisitions
    }
}

impl DeviceProvider for MockProvider {
    type Device = MockDevice;

    fn acquire(&mut self, requested_id: Option<u32>) -> Option<MockDevice> {
        let device = match requested_id {
            Some(id) => self.devices.iter().find(|d| d.id == id),
            None => self.devices.first(),
        }?
        .clone();
        lock(&device.state).released = false;
        self.acquisitions += 1;
        tracing::info!(id = device.id, "MockDevice acquired");
        Some(device)
    }
}
