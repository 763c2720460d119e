// THEORY:
// The `SmartPixel` module provides the pairwise "lenses" of the engine. Where
// `Pixel` only knows about itself, a `SmartPixel` exists to compare one sample of
// the first image with the co-located sample of the second and say how different
// they are.
//
// Key architectural principles:
// 1.  **Comparative Analysis**: every method takes the other pixel as input.
// 2.  **One Lens per Color Space**: the meaning of "different" depends on what the
//     channels hold.
//     - Grayscale: absolute intensity difference.
//     - RGB: Euclidean distance, divided by sqrt(3) so the result stays in [0, 1].
//     - HSV: Euclidean distance with hue treated as an angle (red at 0.99 and red
//       at 0.01 are neighbours), also divided by sqrt(3).
//     - Lab: a weighted channel difference, 0.5 |dL| + 0.25 |da| + 0.25 |db|,
//       favouring lightness changes over shifts in hue.
// 3.  **Exact Zero**: identical samples always score exactly 0.0, which is what
//     lets the classifier guarantee that "no difference" is never "changed".

pub mod smart_pixel {
    use crate::config::ColorSpace;

    pub type Dissimilarity = f32;

    const INV_SQRT_3: f32 = 0.577_350_26;

    /// An analytical wrapper that compares the samples of one pixel against another.
    pub struct SmartPixel<'a> {
        /// The raw channel samples this `SmartPixel` is analyzing.
        pub samples: &'a [f32],
        /// How to interpret the samples.
        color_space: ColorSpace,
    }

    impl<'a> SmartPixel<'a> {
        pub fn new(samples: &'a [f32], color_space: ColorSpace) -> Self {
            Self {
                samples,
                color_space,
            }
        }

        /// The normalized dissimilarity to `other`, in [0, 1].
        pub fn dissimilarity(&self, other: &SmartPixel) -> Dissimilarity {
            if self.samples == other.samples {
                return 0.0;
            }
            match self.color_space {
                ColorSpace::Grayscale => self.delta_intensity(other),
                ColorSpace::Rgb => self.euclidean(other) * INV_SQRT_3,
                ColorSpace::Hsv => self.hsv_distance(other) * INV_SQRT_3,
                ColorSpace::Lab => self.weighted_lab(other),
            }
        }

        pub fn delta_intensity(&self, other: &SmartPixel) -> Dissimilarity {
            (self.samples[0] - other.samples[0]).abs()
        }

        pub fn euclidean(&self, other: &SmartPixel) -> Dissimilarity {
            self.samples
                .iter()
                .zip(other.samples)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt()
        }

        pub fn hsv_distance(&self, other: &SmartPixel) -> Dissimilarity {
            let raw_hue = (self.samples[0] - other.samples[0]).abs();
            let hue = 2.0 * raw_hue.min(1.0 - raw_hue);
            let saturation = self.samples[1] - other.samples[1];
            let value = self.samples[2] - other.samples[2];
            (hue * hue + saturation * saturation + value * value).sqrt()
        }

        pub fn weighted_lab(&self, other: &SmartPixel) -> Dissimilarity {
            0.5 * (self.samples[0] - other.samples[0]).abs()
                + 0.25 * (self.samples[1] - other.samples[1]).abs()
                + 0.25 * (self.samples[2] - other.samples[2]).abs()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::smart_pixel::SmartPixel;
    use crate::config::ColorSpace;

    fn score(a: &[f32], b: &[f32], space: ColorSpace) -> f32 {
        SmartPixel::new(a, space).dissimilarity(&SmartPixel::new(b, space))
    }

    #[test]
    fn identical_samples_score_zero_in_every_space() {
        let sample = [0.3, 0.6, 0.9];
        for space in [ColorSpace::Rgb, ColorSpace::Hsv, ColorSpace::Lab] {
            assert_eq!(score(&sample, &sample, space), 0.0);
        }
        assert_eq!(score(&[0.4], &[0.4], ColorSpace::Grayscale), 0.0);
    }

    #[test]
    fn grayscale_extremes_score_one() {
        assert_eq!(score(&[0.0], &[1.0], ColorSpace::Grayscale), 1.0);
    }

    #[test]
    fn rgb_black_to_white_is_normalized() {
        let d = score(&[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0], ColorSpace::Rgb);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn hsv_hue_wraps_around() {
        let near = score(&[0.99, 1.0, 1.0], &[0.01, 1.0, 1.0], ColorSpace::Hsv);
        let far = score(&[0.5, 1.0, 1.0], &[0.01, 1.0, 1.0], ColorSpace::Hsv);
        assert!(near < 0.05);
        assert!(far > near);
        let opposite = score(&[0.0, 0.0, 0.0], &[0.5, 1.0, 1.0], ColorSpace::Hsv);
        assert!(opposite <= 1.0 + 1e-6);
    }

    #[test]
    fn lab_weights_lightness_double() {
        let lightness = score(&[0.0, 0.5, 0.5], &[1.0, 0.5, 0.5], ColorSpace::Lab);
        let chroma = score(&[0.5, 0.0, 0.5], &[0.5, 1.0, 0.5], ColorSpace::Lab);
        assert!((lightness - 0.5).abs() < 1e-6);
        assert!((chroma - 0.25).abs() < 1e-6);
    }
}
