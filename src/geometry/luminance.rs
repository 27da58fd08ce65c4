//! Cropped luminance views over raw preview frames.

use super::rect::{Rect, Resolution};
use thiserror::Error;

/// Errors raised when a crop does not fit the frame it describes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    /// The crop is empty or leaves the frame.
    #[error("crop {crop} does not fit inside a {frame} frame")]
    CropOutOfBounds {
        /// Requested crop.
        crop: Rect,
        /// Frame the crop was applied to.
        frame: Resolution,
    },
    /// The buffer is shorter than the luma plane.
    #[error("frame buffer holds {actual} bytes, expected at least {expected}")]
    BufferTooSmall {
        /// Bytes in a full luma plane.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
}

/// A single-channel crop over a caller-owned frame buffer.
///
/// The buffer is row-major with a stride equal to the frame width and
/// its first `width * height` bytes are the luma plane; any chroma planes
/// after it are ignored.
#[derive(Clone, Copy)]
pub struct LuminanceRegion<'a> {
    data: &'a [u8],
    data_width: usize,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
}

impl<'a> LuminanceRegion<'a> {
    /// Describes `crop` over a `frame_width` x `frame_height` luma plane.
    pub fn new(
        data: &'a [u8],
        frame_width: u32,
        frame_height: u32,
        crop: Rect,
    ) -> Result<Self, RegionError> {
        let frame = Resolution::new(frame_width, frame_height);
        let fits = crop.left >= 0
            && crop.top >= 0
            && crop.width() > 0
            && crop.height() > 0
            && i64::from(crop.right) <= i64::from(frame_width)
            && i64::from(crop.bottom) <= i64::from(frame_height);
        if !fits {
            return Err(RegionError::CropOutOfBounds { crop, frame });
        }
        let expected = frame.pixel_count();
        if data.len() < expected {
            return Err(RegionError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            data_width: frame_width as usize,
            left: crop.left as usize,
            top: crop.top as usize,
            width: crop.width() as usize,
            height: crop.height() as usize,
        })
    }

    /// Crop left edge in frame pixels.
    #[inline]
    pub fn left(&self) -> usize {
        self.left
    }

    /// Crop top edge in frame pixels.
    #[inline]
    pub fn top(&self) -> usize {
        self.top
    }

    /// Width of the crop in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the crop in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the crop descriptor `(left, top, width, height)`.
    pub fn descriptor(&self) -> (usize, usize, usize, usize) {
        (self.left, self.top, self.width, self.height)
    }

    /// Returns row `y` of the crop, or `None` past the last row.
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = (self.top + y) * self.data_width + self.left;
        Some(&self.data[start..start + self.width])
    }

    /// Returns the luma value at crop-relative `(x, y)`.
    pub fn luminance_at(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width {
            return None;
        }
        self.row(y).map(|row| row[x])
    }

    /// Copies the crop into a tightly packed buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            if let Some(row) = self.row(y) {
                out.extend_from_slice(row);
            }
        }
        out
    }

    /// Mean luma across the crop.
    pub fn mean_luminance(&self) -> f64 {
        let count = self.width * self.height;
        if count == 0 {
            return 0.0;
        }
        let sum: u64 = (0..self.height)
            .filter_map(|y| self.row(y))
            .flat_map(|row| row.iter().map(|&v| u64::from(v)))
            .sum();
        sum as f64 / count as f64
    }
}

impl std::fmt::Debug for LuminanceRegion<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuminanceRegion")
            .field("left", &self.left)
            .field("top", &self.top)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data_width", &self.data_width)
            .finish()
    }
}

/// Rotates a `width` x `height` luma plane 90 degrees clockwise.
///
/// A landscape sensor frame becomes a portrait plane of
/// `height` x `width`, which the cross-mapped portrait preview rect
/// addresses directly.
pub fn rotate_clockwise(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RegionError> {
    let (w, h) = (width as usize, height as usize);
    let expected = w * h;
    if data.len() < expected {
        return Err(RegionError::BufferTooSmall {
            expected,
            actual: data.len(),
        });
    }
    let mut rotated = vec![0u8; expected];
    for y in 0..h {
        for x in 0..w {
            rotated[x * h + (h - y - 1)] = data[y * w + x];
        }
    }
    Ok(rotated)
}
