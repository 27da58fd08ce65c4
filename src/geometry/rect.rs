//! Resolution and rectangle primitives.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pixel resolution (screen or camera preview).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Horizontal pixel count.
    pub width: u32,
    /// Vertical pixel count.
    pub height: u32,
}

impl Resolution {
    /// Creates a `width` x `height` resolution.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if the resolution is taller than it is wide.
    #[inline]
    pub fn is_portrait(&self) -> bool {
        self.width < self.height
    }

    /// Returns the total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns the same resolution with the longer side first.
    pub fn landscape(&self) -> Self {
        if self.is_portrait() {
            Self::new(self.height, self.width)
        } else {
            *self
        }
    }

    /// Parses the `WIDTHxHEIGHT` notation used by camera parameters.
    pub fn parse(text: &str) -> Option<Self> {
        let (w, h) = text.trim().split_once('x')?;
        Some(Self::new(w.trim().parse().ok()?, h.trim().parse().ok()?))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle; `right` and `bottom` are exclusive.
///
/// Coordinates are signed: a frame narrower than the minimum scan side
/// yields a centered rectangle with negative offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge, inclusive.
    pub left: i32,
    /// Top edge, inclusive.
    pub top: i32,
    /// Right edge, exclusive.
    pub right: i32,
    /// Bottom edge, exclusive.
    pub bottom: i32,
}

impl Rect {
    /// Creates a rect from its edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Builds a `width` x `height` rectangle centered within `bounds`.
    pub fn centered(bounds: Resolution, width: i32, height: i32) -> Self {
        let left = (bounds.width as i32 - width) / 2;
        let top = (bounds.height as i32 - height) / 2;
        Self::new(left, top, left + width, top + height)
    }

    /// Horizontal extent.
    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Vertical extent.
    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({}, {} - {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}
