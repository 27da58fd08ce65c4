//! Camera hardware boundary.
//!
//! The session only talks to hardware through [`DeviceHandle`] and
//! acquires devices through a [`DeviceProvider`]. Parameters travel as a
//! raw [`CameraParameters`] map so they can be snapshotted and restored
//! verbatim.

mod frame;
mod handle;
mod mock;
pub mod params;

pub use frame::{FrameCallback, PreviewFrame};
pub use handle::{DeviceError, DeviceHandle, DeviceProvider, FocusDriver, PreviewSurface};
pub use mock::{default_parameters, CallCounts, MockDevice, MockProbe, MockProvider};
pub use params::CameraParameters;
