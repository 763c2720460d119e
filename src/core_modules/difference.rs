// THEORY:
// The difference computer turns an aligned pair of images into a `DifferenceMap`:
// one non-negative dissimilarity score per pixel. It is the bridge between the
// two images and the single-image analyses (thresholding, labeling) that follow.
//
// - Per-pixel mode asks a `SmartPixel` lens for the score of each co-located pair.
// - Block mode computes the same per-pixel scores and then pools them through
//   `chunk::pool`, trading spatial precision for robustness to isolated noise.
//
// Both modes are deterministic and always return a map with the pair's exact
// dimensions.

use crate::config::DifferenceMode;
use crate::core_modules::chunk::chunk;
use crate::core_modules::grid::{DifferenceMap, Grid};
use crate::core_modules::normalizer::NormalizedPair;
use crate::core_modules::smart_pixel::smart_pixel::SmartPixel;
use tracing::debug;

/// Summary statistics of a difference map.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DifferenceStats {
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
}

/// Builds the dissimilarity map of an aligned pair.
pub fn compute_difference(pair: &NormalizedPair, mode: DifferenceMode) -> DifferenceMap {
    let (width, height) = (pair.width(), pair.height());
    let color_space = pair.before.color_space();

    let map = Grid::from_fn(width, height, |x, y| {
        let a = SmartPixel::new(pair.before.pixel(x, y), color_space);
        let b = SmartPixel::new(pair.after.pixel(x, y), color_space);
        a.dissimilarity(&b)
    });

    let map = match mode {
        DifferenceMode::Pixel => map,
        DifferenceMode::Block { size } => chunk::pool(&map, size),
    };

    debug!(width, height, ?mode, ?color_space, "computed difference map");
    map
}

/// Population mean, standard deviation and maximum of the map.
pub fn statistics(map: &DifferenceMap) -> DifferenceStats {
    let values = map.as_slice();
    if values.is_empty() {
        return DifferenceStats::default();
    }
    let count = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / count;
    let max = values.iter().fold(0.0f64, |m, &v| m.max(v as f64));
    DifferenceStats {
        mean,
        std_dev: variance.sqrt(),
        max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorSpace;
    use crate::core_modules::raster::Image;

    fn gray_pair(width: u32, height: u32, before: &[u8], after: &[u8]) -> NormalizedPair {
        NormalizedPair {
            before: Image::from_gray_u8(width, height, before).unwrap(),
            after: Image::from_gray_u8(width, height, after).unwrap(),
        }
    }

    #[test]
    fn zeros_against_full_intensity_is_uniform_one() {
        let pair = gray_pair(4, 4, &[0; 16], &[255; 16]);
        let map = compute_difference(&pair, DifferenceMode::Pixel);
        assert_eq!((map.width(), map.height()), (4, 4));
        assert!(map.as_slice().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn identical_pair_is_all_zero() {
        let bytes: Vec<u8> = (0..30).map(|v| (v * 8) as u8).collect();
        let rgb = Image::from_rgb_u8(5, 2, &bytes).unwrap();
        for space in [ColorSpace::Rgb, ColorSpace::Hsv, ColorSpace::Lab] {
            let converted = rgb.convert(space);
            let pair = NormalizedPair {
                before: converted.clone(),
                after: converted,
            };
            for mode in [DifferenceMode::Pixel, DifferenceMode::Block { size: 2 }] {
                let map = compute_difference(&pair, mode);
                assert!(map.as_slice().iter().all(|&v| v == 0.0));
            }
        }
    }

    #[test]
    fn scores_land_on_their_own_pixel() {
        let mut after = [0u8; 6];
        after[5] = 255;
        let pair = gray_pair(3, 2, &[0; 6], &after);
        let map = compute_difference(&pair, DifferenceMode::Pixel);
        assert_eq!(map.len(), 6);
        assert_eq!(*map.get(2, 1), 1.0);
        assert_eq!(map.as_slice().iter().filter(|&&v| v > 0.0).count(), 1);
    }

    #[test]
    fn block_mode_keeps_dimensions_and_smooths() {
        let mut after = [0u8; 15];
        after[0] = 255;
        let pair = gray_pair(5, 3, &[0; 15], &after);
        let map = compute_difference(&pair, DifferenceMode::Block { size: 2 });
        assert_eq!((map.width(), map.height()), (5, 3));
        assert_eq!(*map.get(0, 0), 0.25);
        assert_eq!(*map.get(1, 1), 0.25);
        assert_eq!(*map.get(2, 0), 0.0);
    }

    #[test]
    fn statistics_of_a_known_map() {
        let map = Grid::from_vec(4, 1, vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let stats = statistics(&map);
        assert!((stats.mean - 0.5).abs() < 1e-12);
        assert!((stats.std_dev - 0.5).abs() < 1e-12);
        assert_eq!(stats.max, 1.0);
    }
}
