//! Camera device abstraction.
//!
//! The real driver sits behind these traits so that the session logic can
//! run against hardware or against [`MockDevice`](super::MockDevice).

use super::frame::FrameCallback;
use super::params::CameraParameters;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by camera hardware.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The device refused a parameter set.
    #[error("camera rejected parameters: {0}")]
    ParametersRejected(String),
    /// The device could not report its parameters.
    #[error("failed to read camera parameters: {0}")]
    ParametersUnavailable(String),
    /// The preview surface could not be attached.
    #[error("failed to bind preview surface: {0}")]
    SurfaceFailed(String),
    /// Starting or stopping the stream failed.
    #[error("preview control failed: {0}")]
    PreviewFailed(String),
    /// The device was already released.
    #[error("camera device released")]
    Released,
}

/// Opaque output target the device renders preview frames into.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreviewSurface {
    name: String,
}

impl PreviewSurface {
    /// Creates a surface identified by `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Surface identifier.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Triggers one autofocus cycle on the device.
///
/// Shared with the auto-focus worker thread, hence `Send + Sync`.
pub trait FocusDriver: Send + Sync {
    /// Runs one focus pass.
    fn trigger_focus(&self) -> Result<(), DeviceError>;
}

/// A single opened camera.
pub trait DeviceHandle: Send {
    /// Identifier the device was acquired under.
    fn id(&self) -> u32;

    /// Reads the current parameter set.
    fn parameters(&self) -> Result<CameraParameters, DeviceError>;

    /// Applies a full parameter set.
    fn set_parameters(&mut self, params: &CameraParameters) -> Result<(), DeviceError>;

    /// Binds the preview output surface.
    fn set_preview_surface(&mut self, surface: &PreviewSurface) -> Result<(), DeviceError>;

    /// Starts streaming preview frames.
    fn start_preview(&mut self) -> Result<(), DeviceError>;

    /// Stops streaming.
    fn stop_preview(&mut self) -> Result<(), DeviceError>;

    /// Replaces the one-shot frame callback; `None` clears it.
    fn set_one_shot_callback(&mut self, callback: Option<FrameCallback>);

    /// Returns the focus trigger, if the device supports autofocus.
    fn focus_driver(&self) -> Option<Arc<dyn FocusDriver>>;

    /// Releases the hardware. The handle must not be used afterwards.
    fn release(&mut self);
}

/// Source of camera devices.
///
/// The selection policy when no id is requested is up to the provider.
pub trait DeviceProvider {
    /// Handle type this provider opens.
    type Device: DeviceHandle;

    /// Opens the requested camera, or a default one for `None`.
    fn acquire(&mut self, requested_id: Option<u32>) -> Option<Self::Device>;
}
