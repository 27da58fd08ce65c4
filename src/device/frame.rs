//! Preview frame delivered to one-shot callbacks.

use crate::geometry::Resolution;
use std::time::Instant;

/// A single preview frame from the device.
///
/// The buffer starts with a full-resolution luma plane; formats such as
/// NV21 append chroma after it, which region cropping ignores.
#[derive(Clone)]
pub struct PreviewFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    timestamp: Instant,
    sequence: u64,
}

impl PreviewFrame {
    /// Wraps a raw NV21 buffer, stamped with the current time.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Raw frame bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Frame width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frame size as a [`Resolution`].
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// When the frame was captured.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Monotonic per-device sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns true if the buffer holds at least a full luma plane.
    pub fn has_luma_plane(&self) -> bool {
        self.data.len() >= self.resolution().pixel_count()
    }
}

impl std::fmt::Debug for PreviewFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Callback receiving exactly one preview frame.
pub type FrameCallback = Box<dyn FnOnce(PreviewFrame) + Send + 'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nv21_buffer_has_luma_plane() {
        let frame = PreviewFrame::new(vec![0u8; 640 * 480 * 3 / 2], 640, 480, 1);
        assert!(frame.has_luma_plane());
        assert_eq!(frame.resolution(), Resolution::new(640, 480));
    }

    #[test]
    fn test_truncated_buffer() {
        let frame = PreviewFrame::new(vec![0u8; 100], 640, 480, 1);
        assert!(!frame.has_luma_plane());
    }
}
