// THEORY:
// The `visualizer` renders the two pictures a person looks at to understand a
// change analysis. It is simple compositing, but it is kept inside the engine so
// that what is drawn is guaranteed to match what was measured.
//
// 1.  **Heatmap**: every `DifferenceMap` score, clamped to [0, 1], is mapped
//     linearly along a blue -> yellow -> red gradient. Cold areas are stable,
//     hot areas changed the most.
// 2.  **Overlay**: changed pixels of the `ChangeMask` are blended with a marker
//     color at a configured opacity onto one of the source images. Unchanged
//     pixels are copied untouched.
// 3.  **Region Boxes**: optionally, the bounding box of every retained region is
//     outlined in the marker color.
//
// Both artifacts are new `RgbImage`s with the analyzed dimensions.

use crate::config::VisualizationConfig;
use crate::core_modules::change_region::ChangeRegion;
use crate::core_modules::grid::{ChangeMask, DifferenceMap};
use crate::core_modules::raster::Image;
use image::{Rgb, RgbImage};

/// The rendered outputs of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationArtifact {
    pub heatmap: RgbImage,
    pub overlay: RgbImage,
}

/// Maps a score in [0, 1] onto the blue -> yellow -> red gradient.
pub fn heat_color(score: f32) -> Rgb<u8> {
    let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
    let (r, g, b) = if score <= 0.5 {
        let ratio = score / 0.5;
        (0.0, 255.0 * ratio, 255.0 * (1.0 - ratio))
    } else {
        let ratio = (score - 0.5) / 0.5;
        (255.0 * ratio, 255.0 * (1.0 - ratio), 0.0)
    };
    Rgb([r.round() as u8, g.round() as u8, b.round() as u8])
}

pub fn render_heatmap(map: &DifferenceMap) -> RgbImage {
    RgbImage::from_fn(map.width(), map.height(), |x, y| heat_color(*map.get(x, y)))
}

/// Blends `mask` onto `source`. `source` must have the mask's dimensions.
pub fn render_overlay(
    source: &Image,
    mask: &ChangeMask,
    regions: &[ChangeRegion],
    config: &VisualizationConfig,
) -> RgbImage {
    let mut overlay = source.to_rgb8();
    let alpha = config.overlay_opacity;
    let color = config.overlay_color;

    for (x, y, pixel) in overlay.enumerate_pixels_mut() {
        if !*mask.get(x, y) {
            continue;
        }
        for channel in 0..3 {
            let blended = pixel[channel] as f32 * (1.0 - alpha) + color[channel] as f32 * alpha;
            pixel[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }

    if config.draw_region_boxes {
        for region in regions {
            outline(&mut overlay, region, Rgb(color));
        }
    }

    overlay
}

fn outline(image: &mut RgbImage, region: &ChangeRegion, color: Rgb<u8>) {
    let (min, max) = (region.bounding_box.min, region.bounding_box.max);
    for x in min.x..=max.x {
        image.put_pixel(x, min.y, color);
        image.put_pixel(x, max.y, color);
    }
    for y in min.y..=max.y {
        image.put_pixel(min.x, y, color);
        image.put_pixel(max.x, y, color);
    }
}

pub fn render(
    map: &DifferenceMap,
    mask: &ChangeMask,
    source: &Image,
    regions: &[ChangeRegion],
    config: &VisualizationConfig,
) -> VisualizationArtifact {
    VisualizationArtifact {
        heatmap: render_heatmap(map),
        overlay: render_overlay(source, mask, regions, config),
    }
}
