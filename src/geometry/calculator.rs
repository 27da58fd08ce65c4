//! Framing rectangle computation in screen and preview space.

use super::rect::{Rect, Resolution};

/// Smallest side of the on-screen scan region.
pub const MIN_FRAME_DIM: i32 = 240;
/// Largest side of the on-screen scan region.
pub const MAX_FRAME_DIM: i32 = 1200;

/// Inputs the cached rectangles depend on.
///
/// Any change to one of these marks the dependent caches dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionInputs {
    /// Screen resolution, once known.
    pub screen: Option<Resolution>,
    /// Active camera preview resolution, once known.
    pub camera: Option<Resolution>,
    /// Incremented every time a new device is acquired.
    pub generation: u64,
}

/// Computes and caches the scan region in both coordinate systems.
///
/// The screen rect is derived from the screen resolution alone; the
/// preview rect additionally depends on the camera resolution and is
/// rescaled with truncating integer arithmetic so that crops line up
/// with what the decoder expects.
#[derive(Debug, Default)]
pub struct FrameRegionCalculator {
    inputs: RegionInputs,
    framing: Option<Rect>,
    framing_dirty: bool,
    manual: bool,
    preview: Option<Rect>,
    preview_dirty: bool,
}

impl FrameRegionCalculator {
    /// Calculator with nothing cached.
    pub fn new() -> Self {
        Self {
            framing_dirty: true,
            preview_dirty: true,
            ..Default::default()
        }
    }

    /// Returns the inputs the caches are currently keyed by.
    pub fn inputs(&self) -> RegionInputs {
        self.inputs
    }

    /// Replaces the cache key, dirtying whatever depends on changed inputs.
    ///
    /// A manual screen rect survives a new device generation as long as
    /// the screen is unchanged; only its preview projection is dropped.
    pub fn update_inputs(&mut self, inputs: RegionInputs) {
        if inputs.screen != self.inputs.screen {
            self.manual = false;
            self.framing_dirty = true;
            self.preview_dirty = true;
        } else if inputs.generation != self.inputs.generation {
            if !self.manual {
                self.framing_dirty = true;
            }
            self.preview_dirty = true;
        } else if inputs.camera != self.inputs.camera {
            self.preview_dirty = true;
        }
        self.inputs = inputs;
    }

    /// Drops both cached rectangles, including a manual override.
    pub fn invalidate(&mut self) {
        self.framing = None;
        self.preview = None;
        self.manual = false;
        self.framing_dirty = true;
        self.preview_dirty = true;
    }

    /// Returns true if the screen rect was sized manually.
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// Returns true if the screen rect is cached and clean.
    pub fn has_framing_rect(&self) -> bool {
        !self.framing_dirty && self.framing.is_some()
    }

    /// Returns true if the preview rect is cached and clean.
    pub fn has_preview_rect(&self) -> bool {
        !self.preview_dirty && self.preview.is_some()
    }

    /// Returns the on-screen scan rectangle, or `None` until the screen
    /// resolution is known.
    pub fn framing_rect(&mut self) -> Option<Rect> {
        if self.framing_dirty {
            let screen = self.inputs.screen?;
            // Forced square: the height reuses the width-derived side.
            let dim = find_desired_dimension_in_range(screen.width, MIN_FRAME_DIM, MAX_FRAME_DIM);
            let rect = Rect::centered(screen, dim, dim);
            tracing::debug!(%screen, rect = %rect, "Computed framing rect");
            self.framing = Some(rect);
            self.framing_dirty = false;
        }
        self.framing
    }

    /// Overrides the screen rect with a manually sized, centered one.
    ///
    /// The requested size is clamped to the screen. Returns `None` when the
    /// screen resolution is not yet known.
    pub fn set_manual(&mut self, width: u32, height: u32) -> Option<Rect> {
        let screen = self.inputs.screen?;
        let width = width.min(screen.width) as i32;
        let height = height.min(screen.height) as i32;
        let rect = Rect::centered(screen, width, height);
        tracing::debug!(rect = %rect, "Calculated manual framing rect");
        self.framing = Some(rect);
        self.framing_dirty = false;
        self.manual = true;
        self.preview = None;
        self.preview_dirty = true;
        Some(rect)
    }

    /// Returns the scan rectangle in preview (sensor) coordinates.
    pub fn framing_rect_in_preview(&mut self) -> Option<Rect> {
        if self.preview_dirty {
            let framing = self.framing_rect()?;
            let screen = self.inputs.screen?;
            let camera = self.inputs.camera?;
            let rect = scale_to_preview(framing, screen, camera);
            tracing::debug!(%screen, %camera, rect = %rect, "Computed preview rect");
            self.preview = Some(rect);
            self.preview_dirty = false;
        }
        self.preview
    }
}

/// Targets 5/8 of `resolution`, clamped to `[hard_min, hard_max]`.
pub fn find_desired_dimension_in_range(resolution: u32, hard_min: i32, hard_max: i32) -> i32 {
    let dim = (5 * i64::from(resolution) / 8) as i32;
    if dim < hard_min {
        return hard_min;
    }
    dim.min(hard_max)
}

/// Rescales a screen rectangle into preview coordinates.
///
/// The sensor's native orientation is landscape, so on a portrait screen
/// the axes are cross-mapped: screen x follows the camera height and
/// screen y follows the camera width.
pub fn scale_to_preview(rect: Rect, screen: Resolution, camera: Resolution) -> Rect {
    let (x_num, y_num) = if screen.is_portrait() {
        (camera.height, camera.width)
    } else {
        (camera.width, camera.height)
    };
    let sx = |v: i32| scale(v, x_num, screen.width);
    let sy = |v: i32| scale(v, y_num, screen.height);
    Rect::new(sx(rect.left), sy(rect.top), sx(rect.right), sy(rect.bottom))
}

#[inline]
fn scale(value: i32, num: u32, den: u32) -> i32 {
    if den == 0 {
        return 0;
    }
    (i64::from(value) * i64::from(num) / i64::from(den)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator(screen: Resolution, camera: Resolution) -> FrameRegionCalculator {
        let mut calc = FrameRegionCalculator::new();
        calc.update_inputs(RegionInputs {
            screen: Some(screen),
            camera: Some(camera),
            generation: 1,
        });
        calc
    }

    #[test]
    fn test_not_ready_without_screen() {
        let mut calc = FrameRegionCalculator::new();
        assert!(calc.framing_rect().is_none());
        assert!(calc.framing_rect_in_preview().is_none());
    }

    #[test]
    fn test_preview_not_ready_without_camera() {
        let mut calc = FrameRegionCalculator::new();
        calc.update_inputs(RegionInputs {
            screen: Some(Resolution::new(1080, 1920)),
            camera: None,
            generation: 1,
        });
        assert!(calc.framing_rect().is_some());
        assert!(calc.framing_rect_in_preview().is_none());
    }

    #[test]
    fn test_portrait_framing_rect_is_square_and_centered() {
        let mut calc = calculator(Resolution::new(1080, 1920), Resolution::new(1920, 1080));
        let rect = calc.framing_rect().unwrap();
        // 5 * 1080 / 8 = 675
        assert_eq!(rect, Rect::new(202, 622, 877, 1297));
        assert_eq!(rect.width(), rect.height());
    }

    #[test]
    fn test_small_screen_uses_minimum() {
        let mut calc = calculator(Resolution::new(320, 240), Resolution::new(640, 480));
        let rect = calc.framing_rect().unwrap();
        assert_eq!(rect, Rect::new(40, 0, 280, 240));
    }

    #[test]
    fn test_large_screen_uses_maximum() {
        let mut calc = calculator(Resolution::new(2560, 1440), Resolution::new(1920, 1080));
        let rect = calc.framing_rect().unwrap();
        assert_eq!(rect.width(), MAX_FRAME_DIM);
        assert_eq!(rect.height(), MAX_FRAME_DIM);
        assert_eq!(rect.left, (2560 - 1200) / 2);
        assert_eq!(rect.top, (1440 - 1200) / 2);
    }

    #[test]
    fn test_portrait_scaling_cross_maps_axes() {
        let rect = Rect::new(100, 200, 700, 900);
        let scaled = scale_to_preview(
            rect,
            Resolution::new(1080, 1920),
            Resolution::new(1280, 720),
        );
        assert_eq!(scaled.left, 100 * 720 / 1080);
        assert_eq!(scaled.right, 700 * 720 / 1080);
        assert_eq!(scaled.top, 200 * 1280 / 1920);
        assert_eq!(scaled.bottom, 900 * 1280 / 1920);
    }

    #[test]
    fn test_matching_resolutions_scale_to_identity() {
        let rect = Rect::new(100, 200, 700, 900);
        let camera = Resolution::new(1920, 1080);
        assert_eq!(
            scale_to_preview(rect, Resolution::new(1080, 1920), camera),
            rect
        );
        assert_eq!(
            scale_to_preview(rect, Resolution::new(1920, 1080), camera),
            rect
        );
    }

    #[test]
    fn test_landscape_scaling() {
        let rect = Rect::new(100, 200, 700, 900);
        let scaled = scale_to_preview(
            rect,
            Resolution::new(1920, 1080),
            Resolution::new(1280, 720),
        );
        assert_eq!(scaled, Rect::new(66, 133, 466, 600));
    }

    #[test]
    fn test_manual_rect_clamps_and_invalidates_preview() {
        let mut calc = calculator(Resolution::new(1080, 1920), Resolution::new(1920, 1080));
        calc.framing_rect_in_preview().unwrap();
        assert!(calc.has_preview_rect());

        let rect = calc.set_manual(5000, 400).unwrap();
        assert_eq!(rect, Rect::new(0, 760, 1080, 1160));
        assert!(!calc.has_preview_rect());
        assert!(calc.has_framing_rect());
    }

    #[test]
    fn test_camera_change_only_dirties_preview() {
        let mut calc = calculator(Resolution::new(1080, 1920), Resolution::new(1920, 1080));
        calc.framing_rect_in_preview().unwrap();

        calc.update_inputs(RegionInputs {
            camera: Some(Resolution::new(1280, 720)),
            ..calc.inputs()
        });
        assert!(calc.has_framing_rect());
        assert!(!calc.has_preview_rect());
    }

    #[test]
    fn test_generation_change_dirties_both() {
        let mut calc = calculator(Resolution::new(1080, 1920), Resolution::new(1920, 1080));
        calc.framing_rect_in_preview().unwrap();
        calc.update_inputs(RegionInputs {
            generation: 2,
            ..calc.inputs()
        });
        assert!(!calc.has_framing_rect());
        assert!(!calc.has_preview_rect());
        assert_eq!(calc.framing_rect().unwrap().width(), 675);
    }

    #[test]
    fn test_manual_rect_survives_generation_change() {
        let mut calc = calculator(Resolution::new(1080, 1920), Resolution::new(1920, 1080));
        calc.invalidate();
        calc.set_manual(400, 300).unwrap();
        calc.update_inputs(RegionInputs {
            camera: Some(Resolution::new(1280, 720)),
            generation: 2,
            ..calc.inputs()
        });
        assert!(calc.is_manual());
        assert!(calc.has_framing_rect());
        assert!(!calc.has_preview_rect());
        assert_eq!(calc.framing_rect(), Some(Rect::new(340, 810, 740, 1110)));
    }

    #[test]
    fn test_screen_change_drops_manual_rect() {
        let mut calc = calculator(Resolution::new(1080, 1920), Resolution::new(1920, 1080));
        calc.set_manual(400, 300).unwrap();
        calc.update_inputs(RegionInputs {
            screen: Some(Resolution::new(1920, 1080)),
            ..calc.inputs()
        });
        assert!(!calc.is_manual());
        assert_eq!(calc.framing_rect().unwrap().width(), 1200);
    }

    #[test]
    fn test_invalidate_forgets_manual_rect() {
        let mut calc = calculator(Resolution::new(1080, 1920), Resolution::new(1920, 1080));
        calc.set_manual(400, 300).unwrap();
        calc.invalidate();
        assert!(!calc.is_manual());
        assert_eq!(calc.framing_rect().unwrap().width(), 675);
    }
}
