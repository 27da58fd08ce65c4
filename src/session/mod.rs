//! Camera session management.
//!
//! [`CameraSession`] is the single owner of the camera. It sequences
//! acquisition, parameter negotiation, preview and auto-focus, and answers
//! scan-region queries against the device it currently holds.

mod error;
mod manager;

pub use error::SessionError;
pub use manager::{CameraSession, SharedSession};
