// THEORY:
// The `normalizer` is the first stage of the engine. Two images of the same
// footprint rarely arrive in the same shape: one survey may be higher resolution,
// one may be grayscale. Its job is to make the pair directly comparable.
//
// Steps, in order:
// 1.  **Validation**: an image with zero width or height is a `Dimension` error.
// 2.  **Common Resolution**: both images are brought to the smaller extent along
//     each axis. Downsampling only, never upsampling, so no interpolated detail is
//     invented. An image already at the target size is passed through untouched.
// 3.  **Common Color Space**: both images are converted into the configured space.
//     Resampling happens before conversion so hue and Lab channels are never
//     interpolated directly.
// 4.  **Intensity Normalization**: every `Image` already stores samples in [0, 1],
//     so after conversion the pair shares one intensity scale.

use crate::config::ColorSpace;
use crate::core_modules::raster::Image;
use crate::error::{AnalysisError, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Rgb};
use tracing::debug;

/// The pair after normalization: identical dimensions and color space.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPair {
    pub before: Image,
    pub after: Image,
}

impl NormalizedPair {
    pub fn width(&self) -> u32 {
        self.before.width()
    }

    pub fn height(&self) -> u32 {
        self.before.height()
    }
}

/// Fails with a `Dimension` error when either image has no pixels.
pub fn check_extent(before: &Image, after: &Image) -> Result<()> {
    for (name, image) in [("first", before), ("second", after)] {
        if image.is_empty() {
            return Err(AnalysisError::Dimension(format!(
                "{name} image has zero extent ({}x{})",
                image.width(),
                image.height()
            )));
        }
    }
    Ok(())
}

/// The resolution both images are reduced to.
pub fn common_resolution(before: &Image, after: &Image) -> (u32, u32) {
    (
        before.width().min(after.width()),
        before.height().min(after.height()),
    )
}

/// Resizes both images to a common resolution and converts them to `color_space`.
pub fn normalize_pair(before: &Image, after: &Image, color_space: ColorSpace) -> Result<NormalizedPair> {
    check_extent(before, after)?;
    let (width, height) = common_resolution(before, after);
    debug!(
        before_w = before.width(),
        before_h = before.height(),
        after_w = after.width(),
        after_h = after.height(),
        width,
        height,
        ?color_space,
        "normalizing image pair"
    );

    Ok(NormalizedPair {
        before: resize_to(before, width, height)?.convert(color_space),
        after: resize_to(after, width, height)?.convert(color_space),
    })
}

/// Resamples an image to `width x height` in its own color space (HSV and Lab
/// inputs are resampled through RGB). Returns a copy when no resampling is needed.
pub fn resize_to(image: &Image, width: u32, height: u32) -> Result<Image> {
    if image.width() == width && image.height() == height {
        return Ok(image.clone());
    }

    match image.color_space() {
        ColorSpace::Grayscale => {
            let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
                ImageBuffer::from_raw(image.width(), image.height(), image.samples().to_vec())
                    .ok_or_else(|| AnalysisError::Dimension("grayscale buffer does not match its shape".into()))?;
            let resized = imageops::resize(&buffer, width, height, FilterType::Triangle);
            Image::from_f32(width, height, ColorSpace::Grayscale, clamp_unit(resized.into_raw()))
        }
        _ => {
            let rgb = image.convert(ColorSpace::Rgb);
            let buffer: ImageBuffer<Rgb<f32>, Vec<f32>> =
                ImageBuffer::from_raw(rgb.width(), rgb.height(), rgb.samples().to_vec())
                    .ok_or_else(|| AnalysisError::Dimension("rgb buffer does not match its shape".into()))?;
            let resized = imageops::resize(&buffer, width, height, FilterType::Triangle);
            let resized = Image::from_f32(width, height, ColorSpace::Rgb, clamp_unit(resized.into_raw()))?;
            Ok(resized.convert(image.color_space()))
        }
    }
}

fn clamp_unit(samples: Vec<f32>) -> Vec<f32> {
    samples.into_iter().map(|v| v.clamp(0.0, 1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_extent_is_a_dimension_error() {
        let empty = Image::from_gray_u8(0, 4, &[]).unwrap();
        let full = Image::from_gray_u8(2, 2, &[0; 4]).unwrap();
        assert!(matches!(
            normalize_pair(&empty, &full, ColorSpace::Grayscale),
            Err(AnalysisError::Dimension(_))
        ));
        assert!(matches!(
            normalize_pair(&full, &empty, ColorSpace::Grayscale),
            Err(AnalysisError::Dimension(_))
        ));
    }

    #[test]
    fn uses_smaller_extent_per_axis() {
        let wide = Image::from_gray_u8(8, 2, &[100; 16]).unwrap();
        let tall = Image::from_gray_u8(4, 6, &[100; 24]).unwrap();
        let pair = normalize_pair(&wide, &tall, ColorSpace::Grayscale).unwrap();
        assert_eq!((pair.width(), pair.height()), (4, 2));
        assert_eq!((pair.after.width(), pair.after.height()), (4, 2));
    }

    #[test]
    fn resampling_a_flat_image_keeps_its_value() {
        let flat = Image::from_rgb_u8(6, 6, &[200; 108]).unwrap();
        let small = resize_to(&flat, 3, 3).unwrap();
        for v in small.samples() {
            assert!((v - 200.0 / 255.0).abs() < 1e-4);
        }
    }

    #[test]
    fn same_size_pair_is_only_converted() {
        let a = Image::from_rgb_u8(2, 1, &[255, 0, 0, 0, 255, 0]).unwrap();
        let b = a.clone();
        let pair = normalize_pair(&a, &b, ColorSpace::Rgb).unwrap();
        assert_eq!(pair.before, a);
        assert_eq!(pair.after, b);
    }

    #[test]
    fn mixed_channel_counts_end_up_matching() {
        let gray = Image::from_gray_u8(2, 2, &[10; 4]).unwrap();
        let rgb = Image::from_rgb_u8(2, 2, &[10; 12]).unwrap();
        let pair = normalize_pair(&gray, &rgb, ColorSpace::Hsv).unwrap();
        assert_eq!(pair.before.channels(), 3);
        assert_eq!(pair.after.channels(), 3);
        assert_eq!(pair.before.color_space(), ColorSpace::Hsv);
    }
}
