// THEORY:
// The `ChangeRegion` module is the data model of the spatial grouping layer. A
// `ChangeRegion` represents one contiguous patch of changed ground between the two
// captures: a new building footprint, a cleared plot, a flooded field.
//
// Key architectural principles:
// 1.  **Spatial Cohesion**: a region is a maximal set of changed pixels that are
//     8-connected to each other in the `ChangeMask`.
// 2.  **Data Aggregation**: instead of thousands of individual pixels, callers
//     work with one summary per region (area, centroid, bounding box, intensity).
// 3.  **Stateless Data Container**: a `ChangeRegion` is produced once per analysis
//     and never updated afterwards.

use serde::{Deserialize, Serialize};

/// A pixel coordinate in the analyzed (normalized and aligned) image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Inclusive axis-aligned box: both corners belong to the region's extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max.x - self.min.x + 1
    }

    pub fn height(&self) -> u32 {
        self.max.y - self.min.y + 1
    }
}

/// Represents a single connected patch of change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRegion {
    /// Sequential id in row-major discovery order, starting at 1. Stable for a given mask.
    pub id: u64,
    /// Number of pixels in the region.
    pub area: usize,
    /// Mean pixel coordinate (x, y).
    pub centroid: (f64, f64),
    pub bounding_box: BoundingBox,
    /// Mean `DifferenceMap` score over the region's pixels.
    pub mean_intensity: f64,
}
