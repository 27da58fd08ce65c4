//! Session errors.

use crate::device::DeviceError;
use thiserror::Error;

/// Errors surfaced by [`CameraSession`](super::CameraSession) operations.
///
/// Parameter negotiation failures never appear here; they are recovered
/// inside `open`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No device matched the requested id.
    #[error("camera driver returned no device (requested id {0:?})")]
    DeviceUnavailable(Option<u32>),
    /// The preview surface could not be bound.
    #[error("failed to bind preview surface: {0}")]
    SurfaceBinding(#[source] DeviceError),
    /// The device refused to start streaming.
    #[error("failed to start preview: {0}")]
    Preview(#[source] DeviceError),
}
