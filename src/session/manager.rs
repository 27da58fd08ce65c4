//! Camera session state machine.

use super::SessionError;
use crate::config::ScannerConfig;
use crate::device::{DeviceHandle, DeviceProvider, PreviewFrame, PreviewSurface};
use crate::focus::{AutoFocusController, AutoFocusFactory, IntervalFocusFactory};
use crate::geometry::{FrameRegionCalculator, LuminanceRegion, Rect, RegionInputs, Resolution};
use crate::negotiation::ConfigurationNegotiator;
use std::sync::{Arc, Mutex};

/// A session shared between the UI thread and frame callbacks.
pub type SharedSession<P> = Arc<Mutex<CameraSession<P>>>;

/// Owns one camera and everything derived from it.
///
/// Lifecycle: `open` acquires and configures the device, `start_preview`
/// streams frames, `stop_preview` halts streaming, `close_driver` releases
/// the device. Every operation takes `&mut self`, so calls against one
/// session are serialized; wrap it in a [`SharedSession`] to use it from
/// several threads.
pub struct CameraSession<P: DeviceProvider> {
    provider: P,
    negotiator: ConfigurationNegotiator,
    regions: FrameRegionCalculator,
    focus_factory: Box<dyn AutoFocusFactory>,
    device: Option<P::Device>,
    auto_focus: Option<Box<dyn AutoFocusController>>,
    initialized: bool,
    previewing: bool,
    requested_device_id: Option<u32>,
    requested_region: Option<Resolution>,
    generation: u64,
}

impl<P: DeviceProvider> CameraSession<P> {
    /// Creates a closed session from `config`.
    pub fn new(provider: P, config: &ScannerConfig) -> Self {
        Self {
            provider,
            negotiator: ConfigurationNegotiator::new(
                config.scan.clone(),
                config.display.resolution(),
            ),
            regions: FrameRegionCalculator::new(),
            focus_factory: Box::new(IntervalFocusFactory::new(config.focus.interval())),
            device: None,
            auto_focus: None,
            initialized: false,
            previewing: false,
            requested_device_id: config.camera.requested_id,
            requested_region: None,
            generation: 0,
        }
    }

    /// Replaces the auto-focus controller factory.
    pub fn with_focus_factory(mut self, factory: impl AutoFocusFactory + 'static) -> Self {
        self.focus_factory = Box::new(factory);
        self
    }

    /// Wraps the session for cross-thread use.
    pub fn into_shared(self) -> SharedSession<P> {
        Arc::new(Mutex::new(self))
    }

    /// Opens the camera driver and programs the hardware.
    ///
    /// Parameter rejections are recovered internally; only a missing
    /// device or a failed surface binding is reported.
    pub fn open(&mut self, surface: &PreviewSurface) -> Result<(), SessionError> {
        if self.device.is_none() {
            let device = self
                .provider
                .acquire(self.requested_device_id)
                .ok_or(SessionError::DeviceUnavailable(self.requested_device_id))?;
            self.generation += 1;
            if let Err(e) = self.negotiator.init_from_device(&device) {
                tracing::warn!(error = %e, "Could not read camera capabilities");
            }
            tracing::info!(
                device = device.id(),
                generation = self.generation,
                "Camera device acquired"
            );
            self.device = Some(device);
            self.sync_region_inputs();
        }

        if !self.initialized {
            self.initialized = true;
            if let Some(request) = self.requested_region.take() {
                if request.width > 0 && request.height > 0 {
                    self.set_manual_framing_rect(request.width, request.height);
                } else {
                    tracing::debug!(%request, "Ignoring empty pending framing rect");
                }
            }
        }

        let Some(device) = self.device.as_mut() else {
            return Err(SessionError::DeviceUnavailable(self.requested_device_id));
        };
        match self.negotiator.negotiate(device) {
            Ok(desired) => tracing::info!(safe_mode = desired.safe_mode, "Camera configured"),
            Err(e) => tracing::warn!(
                error = %e,
                "Camera rejected even safe-mode parameters! No configuration"
            ),
        }
        if let Err(e) = self.negotiator.sync_from_device(&*device) {
            tracing::warn!(error = %e, "Could not read back camera parameters");
        }
        let bound = device.set_preview_surface(surface);
        self.sync_region_inputs();
        bound.map_err(SessionError::SurfaceBinding)
    }

    /// Returns true while a device is held.
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Returns true while frames are streaming.
    pub fn is_previewing(&self) -> bool {
        self.previewing
    }

    /// Returns true once a device has been opened at least once.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of devices acquired over the session's lifetime.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Active camera preview size.
    pub fn camera_resolution(&self) -> Option<Resolution> {
        self.negotiator.camera_resolution()
    }

    /// Screen size the scan rect is laid out on.
    pub fn screen_resolution(&self) -> Option<Resolution> {
        self.negotiator.screen_resolution()
    }

    /// Parameter negotiator for the held device.
    pub fn negotiator(&self) -> &ConfigurationNegotiator {
        &self.negotiator
    }

    /// Closes the camera driver if still in use.
    ///
    /// Both scan rects are forgotten, including a manual size set before
    /// the close.
    pub fn close_driver(&mut self) {
        self.stop_preview();
        if let Some(mut device) = self.device.take() {
            device.release();
            self.regions.invalidate();
            tracing::info!(device = device.id(), "Camera driver closed");
        }
    }

    /// Asks the camera to begin streaming preview frames.
    pub fn start_preview(&mut self) -> Result<(), SessionError> {
        if self.previewing {
            return Ok(());
        }
        let Some(device) = self.device.as_mut() else {
            tracing::debug!("start_preview ignored, no camera open");
            return Ok(());
        };
        device.start_preview().map_err(SessionError::Preview)?;
        self.previewing = true;
        self.auto_focus = self.create_auto_focus();
        tracing::info!("Preview started");
        Ok(())
    }

    /// Tells the camera to stop streaming preview frames.
    ///
    /// Any pending one-shot callback is cleared first so nothing fires
    /// after teardown.
    pub fn stop_preview(&mut self) {
        self.stop_auto_focus();
        if !self.previewing {
            return;
        }
        if let Some(device) = self.device.as_mut() {
            device.set_one_shot_callback(None);
            if let Err(e) = device.stop_preview() {
                tracing::warn!(error = %e, "Camera failed to stop preview");
            }
        }
        self.previewing = false;
        tracing::info!("Preview stopped");
    }

    /// Returns whether the torch is lit.
    pub fn torch_enabled(&mut self) -> bool {
        match self.device.as_ref() {
            Some(device) => self.negotiator.torch_state(device),
            None => false,
        }
    }

    /// Turns the torch on or off.
    ///
    /// Auto-focus is halted around the change and restarted afterwards if
    /// it was running.
    pub fn set_torch(&mut self, on: bool) {
        let Some(device) = self.device.as_mut() else {
            return;
        };
        if self.negotiator.torch_state(&*device) == on {
            return;
        }
        let had_focus = match self.auto_focus.take() {
            Some(mut focus) => {
                focus.stop();
                true
            }
            None => false,
        };
        if let Err(e) = self.negotiator.set_torch(device, on) {
            tracing::warn!(error = %e, on, "Camera rejected torch change");
        }
        if had_focus {
            self.auto_focus = self.create_auto_focus();
        }
    }

    /// Registers a callback for the next preview frame.
    ///
    /// Supersedes any unfired registration. Ignored unless previewing;
    /// returns whether the callback was registered.
    pub fn request_preview_frame<F>(&mut self, callback: F) -> bool
    where
        F: FnOnce(PreviewFrame) + Send + 'static,
    {
        match self.device.as_mut() {
            Some(device) if self.previewing => {
                device.set_one_shot_callback(Some(Box::new(callback)));
                true
            }
            _ => {
                tracing::debug!("Preview frame request ignored, not previewing");
                false
            }
        }
    }

    /// Selects the camera to open next, `None` for the default.
    pub fn set_manual_camera_id(&mut self, id: Option<u32>) {
        self.requested_device_id = id;
    }

    /// Sets the scan rect size instead of deriving it from the screen.
    ///
    /// Before the first open the request is kept and applied then. A size
    /// set while the driver is closed carries over to the next open.
    pub fn set_manual_framing_rect(&mut self, width: u32, height: u32) {
        if self.initialized {
            if self.regions.set_manual(width, height).is_none() {
                tracing::warn!(width, height, "Manual framing rect dropped, screen size unknown");
            }
        } else {
            self.requested_region = Some(Resolution::new(width, height));
        }
    }

    /// Returns the on-screen scan rect, or `None` until a device is open
    /// and the screen resolution is known.
    pub fn framing_rect(&mut self) -> Option<Rect> {
        self.device.as_ref()?;
        self.regions.framing_rect()
    }

    /// Returns the scan rect in preview coordinates, or `None` while not
    /// ready.
    pub fn framing_rect_in_preview(&mut self) -> Option<Rect> {
        self.device.as_ref()?;
        self.regions.framing_rect_in_preview()
    }

    /// Returns true if the preview rect is cached.
    pub fn has_cached_preview_rect(&self) -> bool {
        self.regions.has_preview_rect()
    }

    /// Crops a preview frame to the scan region.
    pub fn build_luminance_region<'a>(
        &mut self,
        data: &'a [u8],
        width: u32,
        height: u32,
    ) -> Option<LuminanceRegion<'a>> {
        let rect = self.framing_rect_in_preview()?;
        match LuminanceRegion::new(data, width, height, rect) {
            Ok(region) => Some(region),
            Err(e) => {
                tracing::warn!(error = %e, "Scan region does not fit preview frame");
                None
            }
        }
    }

    fn sync_region_inputs(&mut self) {
        self.regions.update_inputs(RegionInputs {
            screen: self.negotiator.screen_resolution(),
            camera: self.negotiator.camera_resolution(),
            generation: self.generation,
        });
    }

    fn create_auto_focus(&self) -> Option<Box<dyn AutoFocusController>> {
        let driver = self.device.as_ref()?.focus_driver()?;
        let mut focus = self
            .focus_factory
            .create(driver, self.negotiator.focus_mode())?;
        focus.start();
        Some(focus)
    }

    fn stop_auto_focus(&mut self) {
        if let Some(mut focus) = self.auto_focus.take() {
            focus.stop();
        }
    }
}

impl<P: DeviceProvider> Drop for CameraSession<P> {
    fn drop(&mut self) {
        self.close_driver();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceError, FocusDriver, MockDevice, MockProbe, MockProvider};
    use crate::negotiation::FocusMode;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Records controller lifecycle calls.
    #[derive(Clone, Default)]
    struct FocusLog {
        created: Arc<AtomicU32>,
        started: Arc<AtomicU32>,
        stopped: Arc<AtomicU32>,
    }

    struct LoggedFocus(FocusLog);

    impl AutoFocusController for LoggedFocus {
        fn start(&mut self) {
            self.0.started.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&mut self) {
            self.0.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl AutoFocusFactory for FocusLog {
        fn create(
            &self,
            _driver: Arc<dyn FocusDriver>,
            _mode: Option<FocusMode>,
        ) -> Option<Box<dyn AutoFocusController>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Some(Box::new(LoggedFocus(self.clone())))
        }
    }

    fn session() -> (CameraSession<MockProvider>, MockProbe, FocusLog) {
        let device = MockDevice::new(0);
        let probe = device.probe();
        let log = FocusLog::default();
        let session = CameraSession::new(MockProvider::new(vec![device]), &ScannerConfig::default())
            .with_focus_factory(log.clone());
        (session, probe, log)
    }

    fn surface() -> PreviewSurface {
        PreviewSurface::new("test")
    }

    #[test]
    fn test_open_fails_without_device() {
        let mut session =
            CameraSession::new(MockProvider::empty(), &ScannerConfig::default());
        assert_eq!(
            session.open(&surface()),
            Err(SessionError::DeviceUnavailable(None))
        );
        assert!(!session.is_open());
        assert!(session.framing_rect().is_none());
    }

    #[test]
    fn test_requested_camera_id() {
        let mut session = CameraSession::new(
            MockProvider::new(vec![MockDevice::new(0), MockDevice::new(3)]),
            &ScannerConfig::default(),
        );
        session.set_manual_camera_id(Some(5));
        assert_eq!(
            session.open(&surface()),
            Err(SessionError::DeviceUnavailable(Some(5)))
        );
        session.set_manual_camera_id(Some(3));
        assert!(session.open(&surface()).is_ok());
    }

    #[test]
    fn test_open_binds_surface_and_configures() {
        let (mut session, probe, _) = session();
        session.open(&surface()).unwrap();

        assert!(session.is_open());
        assert!(session.is_initialized());
        assert_eq!(probe.surface(), Some(surface()));
        assert_eq!(session.camera_resolution(), Some(Resolution::new(1920, 1080)));
        assert_eq!(session.screen_resolution(), Some(Resolution::new(1080, 1920)));
    }

    #[test]
    fn test_surface_failure_is_reported() {
        let device = MockDevice::new(0).with_failing_surface();
        let mut session =
            CameraSession::new(MockProvider::new(vec![device]), &ScannerConfig::default());
        assert!(matches!(
            session.open(&surface()),
            Err(SessionError::SurfaceBinding(DeviceError::SurfaceFailed(_)))
        ));
    }

    #[test]
    fn test_preview_lifecycle_drives_auto_focus() {
        let (mut session, probe, log) = session();
        session.open(&surface()).unwrap();
        session.start_preview().unwrap();
        session.start_preview().unwrap();

        assert!(session.is_previewing());
        assert!(probe.is_previewing());
        assert_eq!(probe.calls().start_preview, 1);
        assert_eq!(log.created.load(Ordering::SeqCst), 1);
        assert_eq!(log.started.load(Ordering::SeqCst), 1);

        session.stop_preview();
        assert!(!probe.is_previewing());
        assert_eq!(log.stopped.load(Ordering::SeqCst), 1);

        let calls = probe.calls();
        session.stop_preview();
        assert_eq!(probe.calls(), calls);
        assert_eq!(log.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_preview_without_device_is_noop() {
        let (mut session, probe, log) = session();
        assert!(session.start_preview().is_ok());
        assert!(!session.is_previewing());
        session.stop_preview();
        session.set_torch(true);
        assert!(!session.request_preview_frame(|_| {}));
        assert_eq!(probe.calls().total(), 0);
        assert_eq!(log.created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_preview_clears_pending_callback() {
        let (mut session, probe, _) = session();
        session.open(&surface()).unwrap();
        assert!(!session.request_preview_frame(|_| {}));

        session.start_preview().unwrap();
        assert!(session.request_preview_frame(|_| {}));
        assert!(probe.has_callback());

        session.stop_preview();
        assert!(!probe.has_callback());
    }

    #[test]
    fn test_torch_restarts_auto_focus() {
        let (mut session, probe, log) = session();
        session.open(&surface()).unwrap();
        session.start_preview().unwrap();

        session.set_torch(true);
        assert!(probe.torch_on());
        assert!(session.torch_enabled());
        assert_eq!(log.created.load(Ordering::SeqCst), 2);
        assert_eq!(log.started.load(Ordering::SeqCst), 2);
        assert_eq!(log.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unchanged_torch_touches_nothing() {
        let (mut session, probe, log) = session();
        session.open(&surface()).unwrap();
        session.start_preview().unwrap();
        probe.reset_calls();

        session.set_torch(false);
        assert_eq!(probe.calls().total(), 0);
        assert_eq!(log.stopped.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_torch_without_preview_does_not_start_focus() {
        let (mut session, probe, log) = session();
        session.open(&surface()).unwrap();
        session.set_torch(true);
        assert!(probe.torch_on());
        assert_eq!(log.created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_close_releases_and_forgets_rects() {
        let (mut session, probe, log) = session();
        session.open(&surface()).unwrap();
        session.start_preview().unwrap();
        session.set_manual_framing_rect(400, 300);
        assert_eq!(session.framing_rect().unwrap().width(), 400);

        session.close_driver();
        assert!(!session.is_open());
        assert!(!session.is_previewing());
        assert!(probe.is_released());
        assert_eq!(log.stopped.load(Ordering::SeqCst), 1);
        assert!(session.framing_rect().is_none());

        session.open(&surface()).unwrap();
        assert_eq!(session.generation(), 2);
        assert_eq!(session.framing_rect().unwrap().width(), 675);
    }

    #[test]
    fn test_manual_rect_set_while_closed_survives_reopen() {
        let (mut session, _, _) = session();
        session.open(&surface()).unwrap();
        session.close_driver();

        session.set_manual_framing_rect(400, 300);
        assert!(session.requested_region.is_none());
        session.open(&surface()).unwrap();
        assert_eq!(session.generation(), 2);
        assert_eq!(session.framing_rect(), Some(Rect::new(340, 810, 740, 1110)));
        assert_eq!(
            session.framing_rect_in_preview(),
            Some(Rect::new(340, 810, 740, 1110))
        );
    }

    #[test]
    fn test_empty_pending_manual_rect_is_ignored() {
        let (mut session, _, _) = session();
        session.set_manual_framing_rect(0, 300);
        session.open(&surface()).unwrap();
        assert_eq!(session.framing_rect(), Some(Rect::new(202, 622, 877, 1297)));
    }

    #[test]
    fn test_pending_manual_rect_applied_on_first_open() {
        let (mut session, _, _) = session();
        session.set_manual_framing_rect(500, 2500);
        assert!(session.framing_rect().is_none());

        session.open(&surface()).unwrap();
        assert_eq!(session.framing_rect(), Some(Rect::new(290, 0, 790, 1920)));
    }

    #[test]
    fn test_manual_rect_invalidates_preview_rect() {
        let (mut session, _, _) = session();
        session.open(&surface()).unwrap();
        assert!(session.framing_rect_in_preview().is_some());
        assert!(session.has_cached_preview_rect());

        session.set_manual_framing_rect(300, 300);
        assert!(!session.has_cached_preview_rect());
        assert_eq!(
            session.framing_rect_in_preview(),
            Some(Rect::new(390, 810, 690, 1110))
        );
    }
}
