// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the engine. It is a "dumb"
// data container for a single RGB sample plus the single-pixel color transforms
// the normalizer needs: metrics computed from this pixel alone, with no knowledge
// of neighbours in space or of the other image in the pair. Anything that needs a
// second pixel (dissimilarity scores) lives in `smart_pixel`.
//
// Channel forms:
// - normalized (0..1 sRGB): the form every `Image` stores, still gamma-encoded
// - linearized (0..1 linear light): needed for colorimetry (XYZ, L*a*b*)
//
// Transforms offered here:
// - Luminance (Rec. 601 luma), used for grayscale conversion
// - HSV, with hue stored as a fraction of a full turn so all three channels are in [0, 1]
// - CIE L*a*b* (D65), rescaled so all three channels are in [0, 1]
// - The inverse of each, so any stored color space can be rendered back to RGB
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbours.
// 2) Every output channel lies in [0, 1], so downstream distances stay normalized.

pub mod pixel {
    use palette::{FromColor, IntoColor, Lab, LinSrgb, Srgb};

    pub type NormalizedChannel = f32;
    pub type Luminance = f32;

    /// A "dumb" data container representing a single normalized RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Pixel {
        /// The red channel value (0.0-1.0).
        pub red: NormalizedChannel,
        /// The green channel value (0.0-1.0).
        pub green: NormalizedChannel,
        /// The blue channel value (0.0-1.0).
        pub blue: NormalizedChannel,
    }

    impl Pixel {
        pub fn new(red: NormalizedChannel, green: NormalizedChannel, blue: NormalizedChannel) -> Self {
            Self { red, green, blue }
        }

        pub fn gray(value: NormalizedChannel) -> Self {
            Self::new(value, value, value)
        }

        pub fn from_bytes(red: u8, green: u8, blue: u8) -> Self {
            Self::new(
                red as f32 / 255.0,
                green as f32 / 255.0,
                blue as f32 / 255.0,
            )
        }

        pub fn to_bytes(&self) -> [u8; 3] {
            [
                to_byte(self.red),
                to_byte(self.green),
                to_byte(self.blue),
            ]
        }

        /// Luminance estimate (Rec. 601 luma) on the normalized channels.
        pub fn luminance(&self) -> Luminance {
            0.299 * self.red + 0.587 * self.green + 0.114 * self.blue
        }

        /// HSV triple as (hue / 360, saturation, value).
        pub fn to_hsv(&self) -> [NormalizedChannel; 3] {
            let maximum_channel = self.red.max(self.green.max(self.blue));
            let minimum_channel = self.red.min(self.green.min(self.blue));
            let chroma = maximum_channel - minimum_channel;

            let hue_degrees = if chroma <= 1e-6 {
                0.0
            } else {
                let (base_difference, sector_offset) = if maximum_channel == self.red {
                    (self.green - self.blue, 0.0)
                } else if maximum_channel == self.green {
                    (self.blue - self.red, 2.0)
                } else {
                    (self.red - self.green, 4.0)
                };
                let mut degrees = (base_difference / chroma + sector_offset) * 60.0;
                if degrees < 0.0 {
                    degrees += 360.0;
                }
                degrees
            };

            let saturation = if maximum_channel <= 1e-6 {
                0.0
            } else {
                chroma / maximum_channel
            };

            [(hue_degrees / 360.0).clamp(0.0, 1.0), saturation, maximum_channel]
        }

        pub fn from_hsv(hsv: [NormalizedChannel; 3]) -> Self {
            let [hue, saturation, value] = hsv;
            let chroma = value * saturation;
            let sector = (hue * 6.0).rem_euclid(6.0);
            let x = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
            let (r, g, b) = match sector as u32 {
                0 => (chroma, x, 0.0),
                1 => (x, chroma, 0.0),
                2 => (0.0, chroma, x),
                3 => (0.0, x, chroma),
                4 => (x, 0.0, chroma),
                _ => (chroma, 0.0, x),
            };
            let m = value - chroma;
            Self::new(r + m, g + m, b + m)
        }

        /// CIE L*a*b* (D65) rescaled as (L / 100, (a + 128) / 255, (b + 128) / 255).
        pub fn to_lab(&self) -> [NormalizedChannel; 3] {
            let linear: LinSrgb<f32> = Srgb::new(self.red, self.green, self.blue).into_linear();
            let lab: Lab = Lab::from_color(linear);
            [
                (lab.l / 100.0).clamp(0.0, 1.0),
                ((lab.a + 128.0) / 255.0).clamp(0.0, 1.0),
                ((lab.b + 128.0) / 255.0).clamp(0.0, 1.0),
            ]
        }

        pub fn from_lab(lab: [NormalizedChannel; 3]) -> Self {
            let lab: Lab = Lab::new(lab[0] * 100.0, lab[1] * 255.0 - 128.0, lab[2] * 255.0 - 128.0);
            let linear: LinSrgb<f32> = lab.into_color();
            let srgb: Srgb<f32> = Srgb::from_linear(linear);
            Self::new(
                srgb.red.clamp(0.0, 1.0),
                srgb.green.clamp(0.0, 1.0),
                srgb.blue.clamp(0.0, 1.0),
            )
        }
    }

    fn to_byte(value: NormalizedChannel) -> u8 {
        (value.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::Pixel;

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn luminance_uses_rec601_weights() {
        let pixel = Pixel::from_bytes(255, 0, 0);
        assert!(close(pixel.luminance(), 0.299, 1e-6));
        assert!(close(Pixel::gray(1.0).luminance(), 1.0, 1e-6));
    }

    #[test]
    fn hsv_of_primaries() {
        let red = Pixel::new(1.0, 0.0, 0.0).to_hsv();
        assert_eq!(red, [0.0, 1.0, 1.0]);
        let green = Pixel::new(0.0, 1.0, 0.0).to_hsv();
        assert!(close(green[0], 1.0 / 3.0, 1e-6));
        let gray = Pixel::gray(0.5).to_hsv();
        assert_eq!(gray, [0.0, 0.0, 0.5]);
    }

    #[test]
    fn hsv_inverse_recovers_pixel() {
        let pixel = Pixel::from_bytes(30, 140, 200);
        let restored = Pixel::from_hsv(pixel.to_hsv());
        assert_eq!(pixel.to_bytes(), restored.to_bytes());
    }

    #[test]
    fn lab_of_white_and_black() {
        let white = Pixel::gray(1.0).to_lab();
        assert!(close(white[0], 1.0, 1e-3));
        assert!(close(white[1], 128.0 / 255.0, 1e-3));
        assert!(close(white[2], 128.0 / 255.0, 1e-3));
        let black = Pixel::gray(0.0).to_lab();
        assert!(close(black[0], 0.0, 1e-6));
    }

    #[test]
    fn lab_inverse_recovers_pixel() {
        let pixel = Pixel::from_bytes(120, 60, 10);
        let restored = Pixel::from_lab(pixel.to_lab());
        let (a, b) = (pixel.to_bytes(), restored.to_bytes());
        for channel in 0..3 {
            assert!((a[channel] as i32 - b[channel] as i32).abs() <= 1);
        }
    }
}
