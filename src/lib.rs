//! Camera Session and Scan Region Library
//!
//! Drives a camera for barcode scanning: opens and configures the device,
//! runs preview with auto-focus, and computes where in each preview frame
//! the scan region lies.
//!
//! # Architecture
//!
//! ```text
//! device ← negotiation ← session → focus
//!                          ↓
//!                      geometry (screen rect → preview rect → luminance crop)
//! ```
//!
//! # Design Principles
//!
//! - **Single owner**: one [`CameraSession`] owns the device; every
//!   operation on it is serialized through `&mut self`
//! - **Degrade, don't fail**: rejected parameters fall back to a safe-mode
//!   set and never abort `open`
//! - **Not ready is not an error**: geometry queries return `None` until
//!   the device and resolutions are known
//!
//! # Example
//!
//! ```no_run
//! use scan_camera::{
//!     config::ScannerConfig,
//!     device::{MockDevice, MockProvider, PreviewSurface},
//!     session::CameraSession,
//! };
//!
//! let device = MockDevice::new(0);
//! let probe = device.probe();
//! let mut session = CameraSession::new(MockProvider::new(vec![device]), &ScannerConfig::default());
//!
//! session.open(&PreviewSurface::new("viewfinder")).unwrap();
//! session.start_preview().unwrap();
//!
//! let (tx, rx) = std::sync::mpsc::channel();
//! session.request_preview_frame(move |frame| {
//!     let _ = tx.send(frame);
//! });
//! probe.deliver_frame();
//!
//! let frame = rx.recv().unwrap();
//! if let Some(region) = session.build_luminance_region(frame.data(), frame.width(), frame.height()) {
//!     println!("scan region {:?}", region.descriptor());
//! }
//!
//! session.stop_preview();
//! session.close_driver();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod device;
pub mod focus;
pub mod geometry;
pub mod negotiation;
pub mod session;

// Re-export commonly used types at crate root
pub use config::{ScanSettings, ScannerConfig};
pub use device::{CameraParameters, DeviceError, DeviceHandle, DeviceProvider, PreviewFrame, PreviewSurface};
pub use focus::{AutoFocusController, AutoFocusFactory, IntervalAutoFocus};
pub use geometry::{FrameRegionCalculator, LuminanceRegion, Rect, Resolution};
pub use negotiation::{ConfigurationNegotiator, DesiredParameters, NegotiationError};
pub use session::{CameraSession, SessionError, SharedSession};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
