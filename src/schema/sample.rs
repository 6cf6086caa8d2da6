//! Dataset sample types.
//!
//! A sample pairs slope geometry and a pixel coordinate with the coverage
//! value the hardware produced there. The loader supplying samples is an
//! external collaborator; the core only requires an iterable collection.

use serde::{Deserialize, Serialize};

use crate::compute::slope::{AA_RANGE, Slope};

/// One captured hardware measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Pixel X coordinate, relative to the slope origin.
    pub x: i32,
    /// Pixel Y coordinate (scanline), relative to the slope origin.
    pub y: i32,
    /// Horizontal extent of the slope under test.
    pub width: i32,
    /// Vertical extent of the slope under test.
    pub height: i32,
    /// Expected coverage value, typically 0..=31.
    pub coverage: i32,
}

/// A sample annotated with its precomputed slope and orientation, built once
/// per search run. The slope inside never mutates afterwards.
#[derive(Debug, Clone)]
pub struct ExtendedSample {
    pub sample: Sample,
    /// Slope configured from the sample's extents alone, not screen position.
    pub slope: Slope,
    /// The edge sits on the left side of its polygon.
    pub left: bool,
    /// X increases with Y (the slope is not negative).
    pub positive: bool,
    /// Upper bound on the coverage a formula may produce for this sample;
    /// predictions are clamped to it before error accumulation.
    pub bound: i32,
}

impl ExtendedSample {
    /// Annotate a sample. Positive slopes run `(0,0)-(w,h)`, negative ones
    /// `(w,0)-(0,h)`.
    pub fn new(sample: Sample, left: bool, positive: bool) -> Self {
        let slope = if positive {
            Slope::setup(0, 0, sample.width, sample.height, left)
        } else {
            Slope::setup(sample.width, 0, 0, sample.height, left)
        };
        Self {
            sample,
            slope,
            left,
            positive,
            bound: AA_RANGE - 1,
        }
    }
}
