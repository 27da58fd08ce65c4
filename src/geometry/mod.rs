//! Scan-region geometry.
//!
//! The scan region lives in two coordinate systems: screen pixels, where
//! the UI draws the viewfinder, and preview pixels, where the decoder
//! crops the sensor frame. This module computes both and builds the
//! cropped luminance view handed to the decoder.

mod calculator;
mod luminance;
mod rect;

pub use calculator::{
    find_desired_dimension_in_range, scale_to_preview, FrameRegionCalculator, RegionInputs,
    MAX_FRAME_DIM, MIN_FRAME_DIM,
};
pub use luminance::{rotate_clockwise, LuminanceRegion, RegionError};
pub use rect::{Rect, Resolution};
