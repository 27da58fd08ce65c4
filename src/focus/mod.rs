//! Auto-focus control during preview.
//!
//! The session creates a fresh controller whenever preview starts and
//! always stops it before discarding it.

mod interval;

pub use interval::IntervalAutoFocus;

use crate::device::FocusDriver;
use crate::negotiation::FocusMode;
use std::sync::Arc;
use std::time::Duration;

/// Keeps the camera focused while preview runs.
pub trait AutoFocusController: Send {
    /// Starts focusing.
    fn start(&mut self);

    /// Stops focusing. Must be idempotent.
    fn stop(&mut self);
}

/// Builds controllers bound to a live device.
pub trait AutoFocusFactory: Send {
    /// Returns `None` when the focus mode needs no explicit triggering.
    fn create(
        &self,
        driver: Arc<dyn FocusDriver>,
        mode: Option<FocusMode>,
    ) -> Option<Box<dyn AutoFocusController>>;
}

/// Creates [`IntervalAutoFocus`] controllers for triggered focus modes.
#[derive(Debug, Clone)]
pub struct IntervalFocusFactory {
    interval: Duration,
}

impl IntervalFocusFactory {
    /// Factory for controllers firing every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl AutoFocusFactory for IntervalFocusFactory {
    fn create(
        &self,
        driver: Arc<dyn FocusDriver>,
        mode: Option<FocusMode>,
    ) -> Option<Box<dyn AutoFocusController>> {
        let mode = mode?;
        if !mode.needs_trigger() {
            tracing::debug!(%mode, "Focus mode is continuous, no auto-focus timer");
            return None;
        }
        Some(Box::new(IntervalAutoFocus::new(driver, self.interval)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceHandle, MockDevice};

    #[test]
    fn test_factory_only_for_triggered_modes() {
        let factory = IntervalFocusFactory::new(Duration::from_millis(10));
        let device = MockDevice::new(0);
        let driver = device.focus_driver().unwrap();

        assert!(factory.create(driver.clone(), Some(FocusMode::Auto)).is_some());
        assert!(factory.create(driver.clone(), Some(FocusMode::Macro)).is_some());
        assert!(factory
            .create(driver.clone(), Some(FocusMode::ContinuousPicture))
            .is_none());
        assert!(factory.create(driver, None).is_none());
    }
}
