// THEORY:
// The `classifier` decides, pixel by pixel, whether the dissimilarity it is given
// amounts to a change. It is the only stage that turns continuous scores into a
// binary verdict, so it also owns the noise cleanup that follows that verdict.
//
// Key architectural principles:
// 1.  **Configured or Adaptive**: a configured threshold is used as-is. Without
//     one, the cut-off is learned from the map itself as `mean + 2 * std_dev`,
//     which flags the statistical outliers of this particular pair. The same map
//     always yields the same cut-off.
// 2.  **Zero Is Never Change**: a score must be at least the threshold and also
//     strictly positive. Identical pixels stay unchanged even with a threshold of 0.
// 3.  **Morphological Cleanup**: opening removes isolated specks, closing then
//     fills small gaps inside real regions.

use crate::core_modules::difference::statistics;
use crate::core_modules::grid::{ChangeMask, DifferenceMap};
use crate::core_modules::morphology;
use tracing::debug;

/// Number of standard deviations above the mean used by the adaptive threshold.
pub const ADAPTIVE_THRESHOLD_STD_DEVS: f64 = 2.0;

/// The binary verdict plus the cut-off that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub mask: ChangeMask,
    /// The threshold actually applied, configured or adaptive.
    pub threshold: f64,
    pub adaptive: bool,
}

/// Derives a cut-off from the map's own statistics.
pub fn adaptive_threshold(map: &DifferenceMap) -> f64 {
    let stats = statistics(map);
    stats.mean + ADAPTIVE_THRESHOLD_STD_DEVS * stats.std_dev
}

/// Marks every pixel whose score reaches `threshold`. Zero scores never count.
pub fn threshold_map(map: &DifferenceMap, threshold: f64) -> ChangeMask {
    map.map(|&score| score > 0.0 && score as f64 >= threshold)
}

/// Thresholds the map and cleans the result with the given odd kernel size.
pub fn classify(map: &DifferenceMap, threshold: Option<f64>, kernel_size: u32) -> Classification {
    let (threshold, adaptive) = match threshold {
        Some(t) => (t, false),
        None => (adaptive_threshold(map), true),
    };

    let raw = threshold_map(map, threshold);
    let mask = morphology::clean(&raw, kernel_size);

    debug!(
        threshold,
        adaptive,
        kernel_size,
        raw_changed = raw.count_set(),
        changed = mask.count_set(),
        "classified difference map"
    );

    Classification {
        mask,
        threshold,
        adaptive,
    }
}
