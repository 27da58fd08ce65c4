//! Preview size selection.

use crate::device::CameraParameters;
use crate::geometry::Resolution;

/// Sizes below this are too coarse to decode from.
const MIN_PREVIEW_PIXELS: usize = 480 * 320;
/// Largest tolerated relative difference between preview and screen aspect.
const MAX_ASPECT_DISTORTION: f64 = 0.15;

/// Picks the supported preview size that best fits `screen`.
///
/// Both sides are compared in landscape orientation since the sensor
/// streams landscape frames. An exact screen match wins, then the
/// largest acceptable size; the device's current size is the fallback.
pub fn select_preview_size(params: &CameraParameters, screen: Resolution) -> Option<Resolution> {
    let current = params.preview_size();
    let mut sizes = params.supported_preview_sizes();
    if sizes.is_empty() || screen.width == 0 || screen.height == 0 {
        tracing::debug!(?current, "No supported preview sizes advertised");
        return current;
    }

    let screen = screen.landscape();
    let screen_aspect = f64::from(screen.width) / f64::from(screen.height);

    sizes.sort_by(|a, b| b.pixel_count().cmp(&a.pixel_count()));
    let acceptable: Vec<Resolution> = sizes
        .into_iter()
        .filter(|size| size.pixel_count() >= MIN_PREVIEW_PIXELS)
        .filter(|size| {
            let size = size.landscape();
            let aspect = f64::from(size.width) / f64::from(size.height);
            (aspect - screen_aspect).abs() / screen_aspect <= MAX_ASPECT_DISTORTION
        })
        .collect();

    if let Some(exact) = acceptable.iter().find(|size| size.landscape() == screen) {
        tracing::debug!(size = %exact, "Found preview size exactly matching screen");
        return Some(*exact);
    }
    if let Some(largest) = acceptable.first() {
        tracing::debug!(size = %largest, "Using largest suitable preview size");
        return Some(*largest);
    }
    tracing::debug!(?current, "No suitable preview sizes, using default");
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::default_parameters;

    #[test]
    fn test_exact_match_for_portrait_screen() {
        let size = select_preview_size(&default_parameters(), Resolution::new(1080, 1920));
        assert_eq!(size, Some(Resolution::new(1920, 1080)));
    }

    #[test]
    fn test_largest_with_matching_aspect() {
        // 4:3 screen: 960x720 and 640x480 qualify, 352x288 is too small
        let size = select_preview_size(&default_parameters(), Resolution::new(1024, 768));
        assert_eq!(size, Some(Resolution::new(960, 720)));
    }

    #[test]
    fn test_falls_back_to_current() {
        // 2340/1080 is far from every advertised aspect ratio
        let size = select_preview_size(&default_parameters(), Resolution::new(1080, 2340));
        assert_eq!(size, Some(Resolution::new(640, 480)));
    }

    #[test]
    fn test_without_supported_sizes() {
        let mut params = CameraParameters::new();
        params.set("preview-size", "800x600");
        let size = select_preview_size(&params, Resolution::new(1080, 1920));
        assert_eq!(size, Some(Resolution::new(800, 600)));
    }
}
