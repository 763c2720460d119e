// THEORY:
// The `raster` module defines `Image`, the engine's only multi-channel pixel
// container. An `Image` is a decoded raster already in memory: the engine never
// parses file bytes, it only receives samples from its caller.
//
// Key architectural principles:
// 1.  **Normalized Storage**: samples are `f32` in [0, 1] regardless of whether
//     they arrived as 8-bit bytes or floats. Every stage can then compare images
//     without caring where they came from.
// 2.  **Self-Describing**: an `Image` knows the color space of its samples, and
//     therefore its channel count (1 for grayscale, 3 otherwise).
// 3.  **Immutable**: there is no mutating API. Conversion, cropping and rendering
//     all return new values, so the caller's images are never altered in place.

use crate::config::ColorSpace;
use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{AnalysisError, Result};
use image::{DynamicImage, RgbImage};

/// A decoded, normalized raster with 1 or 3 channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    data: Vec<f32>,
}

impl Image {
    /// Wraps normalized samples in row-major, channel-interleaved order. Every
    /// sample must be finite and lie in [0, 1], whatever the color space.
    pub fn from_f32(width: u32, height: u32, color_space: ColorSpace, data: Vec<f32>) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * color_space.channels();
        if data.len() != expected {
            return Err(AnalysisError::Dimension(format!(
                "{width}x{height} {color_space:?} image needs {expected} samples, got {}",
                data.len()
            )));
        }
        if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
            return Err(AnalysisError::Dimension(format!("non-finite sample {bad}")));
        }
        if let Some(bad) = data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(AnalysisError::Dimension(format!("sample {bad} is outside [0, 1]")));
        }
        Ok(Self {
            width,
            height,
            color_space,
            data,
        })
    }

    /// Single-channel 8-bit samples, scaled to [0, 1].
    pub fn from_gray_u8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        Self::from_f32(width, height, ColorSpace::Grayscale, bytes_to_unit(bytes))
    }

    /// Interleaved 8-bit RGB samples, scaled to [0, 1].
    pub fn from_rgb_u8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        Self::from_f32(width, height, ColorSpace::Rgb, bytes_to_unit(bytes))
    }

    /// Converts a decoded `image` crate buffer. Luma images stay single-channel,
    /// everything else is taken as RGB (alpha is dropped).
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => Self {
                width,
                height,
                color_space: ColorSpace::Grayscale,
                data: image
                    .to_luma32f()
                    .into_raw()
                    .into_iter()
                    .map(|v| v.clamp(0.0, 1.0))
                    .collect(),
            },
            _ => Self {
                width,
                height,
                color_space: ColorSpace::Rgb,
                data: image
                    .to_rgb32f()
                    .into_raw()
                    .into_iter()
                    .map(|v| v.clamp(0.0, 1.0))
                    .collect(),
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.color_space.channels()
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The channel samples of one pixel.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let channels = self.channels();
        let start = ((y as usize) * (self.width as usize) + x as usize) * channels;
        &self.data[start..start + channels]
    }

    /// The pixel at (x, y) rendered back to normalized sRGB.
    pub fn rgb_pixel(&self, x: u32, y: u32) -> Pixel {
        to_rgb(self.color_space, self.pixel(x, y))
    }

    /// Converts every pixel into `target`. Returns a clone when already there.
    pub fn convert(&self, target: ColorSpace) -> Image {
        if target == self.color_space {
            return self.clone();
        }
        let channels = self.channels();
        let mut data = Vec::with_capacity((self.width as usize) * (self.height as usize) * target.channels());
        for samples in self.data.chunks_exact(channels) {
            let rgb = to_rgb(self.color_space, samples);
            match target {
                ColorSpace::Grayscale => data.push(rgb.luminance()),
                ColorSpace::Rgb => data.extend_from_slice(&[rgb.red, rgb.green, rgb.blue]),
                ColorSpace::Hsv => data.extend_from_slice(&rgb.to_hsv()),
                ColorSpace::Lab => data.extend_from_slice(&rgb.to_lab()),
            }
        }
        Image {
            width: self.width,
            height: self.height,
            color_space: target,
            data,
        }
    }

    /// Copies the `width x height` window whose top-left corner is (x, y).
    /// The window must lie inside the image.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Image {
        debug_assert!(x + width <= self.width && y + height <= self.height);
        let channels = self.channels();
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * channels);
        for row in y..y + height {
            let start = ((row as usize) * (self.width as usize) + x as usize) * channels;
            data.extend_from_slice(&self.data[start..start + (width as usize) * channels]);
        }
        Image {
            width,
            height,
            color_space: self.color_space,
            data,
        }
    }

    /// Renders the image as 8-bit RGB.
    pub fn to_rgb8(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            image::Rgb(self.rgb_pixel(x, y).to_bytes())
        })
    }
}

fn bytes_to_unit(bytes: &[u8]) -> Vec<f32> {
    bytes.iter().map(|&b| b as f32 / 255.0).collect()
}

fn to_rgb(color_space: ColorSpace, samples: &[f32]) -> Pixel {
    match color_space {
        ColorSpace::Grayscale => Pixel::gray(samples[0]),
        ColorSpace::Rgb => Pixel::new(samples[0], samples[1], samples[2]),
        ColorSpace::Hsv => Pixel::from_hsv([samples[0], samples[1], samples[2]]),
        ColorSpace::Lab => Pixel::from_lab([samples[0], samples[1], samples[2]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let err = Image::from_rgb_u8(2, 2, &[0u8; 11]).unwrap_err();
        assert!(matches!(err, AnalysisError::Dimension(_)));
    }

    #[test]
    fn rejects_samples_outside_the_unit_range() {
        for bad in [2.0f32, -0.5, 1.0001] {
            let err = Image::from_f32(2, 1, ColorSpace::Grayscale, vec![0.5, bad]).unwrap_err();
            assert!(matches!(err, AnalysisError::Dimension(_)), "{bad}");
        }
        let err = Image::from_f32(1, 1, ColorSpace::Lab, vec![0.5, 0.5, 1.5]).unwrap_err();
        assert!(matches!(err, AnalysisError::Dimension(_)));
        assert!(Image::from_f32(2, 1, ColorSpace::Grayscale, vec![0.0, 1.0]).is_ok());
    }

    #[test]
    fn bytes_are_scaled_to_unit_range() {
        let image = Image::from_gray_u8(2, 1, &[0, 255]).unwrap();
        assert_eq!(image.samples(), &[0.0, 1.0]);
    }

    #[test]
    fn zero_extent_image_can_be_constructed() {
        let image = Image::from_gray_u8(0, 5, &[]).unwrap();
        assert!(image.is_empty());
    }

    #[test]
    fn convert_rgb_to_gray_uses_luminance() {
        let image = Image::from_rgb_u8(1, 1, &[255, 255, 255]).unwrap();
        let gray = image.convert(ColorSpace::Grayscale);
        assert_eq!(gray.channels(), 1);
        assert!((gray.samples()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn gray_is_replicated_for_rgb() {
        let image = Image::from_gray_u8(1, 1, &[51]).unwrap();
        let rgb = image.convert(ColorSpace::Rgb);
        assert_eq!(rgb.samples(), &[0.2, 0.2, 0.2]);
    }

    #[test]
    fn crop_takes_the_window() {
        let bytes: Vec<u8> = (0..12).collect();
        let image = Image::from_gray_u8(4, 3, &bytes).unwrap();
        let window = image.crop(1, 1, 2, 2);
        let expected: Vec<f32> = [5u8, 6, 9, 10].iter().map(|&b| b as f32 / 255.0).collect();
        assert_eq!(window.samples(), expected.as_slice());
    }

    #[test]
    fn dynamic_luma_stays_single_channel() {
        let luma = image::GrayImage::from_pixel(3, 2, image::Luma([128]));
        let image = Image::from_dynamic(&DynamicImage::ImageLuma8(luma));
        assert_eq!(image.color_space(), ColorSpace::Grayscale);
        assert_eq!(image.samples().len(), 6);
    }

    #[test]
    fn to_rgb8_round_trips_bytes() {
        let bytes = [10u8, 20, 30, 200, 100, 0];
        let image = Image::from_rgb_u8(2, 1, &bytes).unwrap();
        assert_eq!(image.to_rgb8().into_raw(), bytes.to_vec());
    }
}
