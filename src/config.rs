// THEORY:
// The `config` module holds the typed, validated configuration of a single
// analysis. The surrounding application works with loose, dynamic settings; the
// engine only ever sees an `AnalysisConfig` that has passed `validate()` once at
// the entry point.
//
// Key architectural principles:
// 1.  **Explicit Defaults**: `Default` is tuned for aerial land-use surveys (Lab
//     color space, a 30/255 cut-off, a 5x5 cleanup kernel). There is no
//     module-level state: two analyses with different configs never interfere.
// 2.  **Fail Fast**: out-of-range values are rejected, never clamped, so that a
//     report is never produced from a silently altered configuration.
// 3.  **Serializable**: the config round-trips through JSON so the persistence and
//     presentation collaborators can record exactly what produced a report.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Color space both images are converted into before differencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    /// Single luminance channel (Rec. 601 weights).
    Grayscale,
    /// Red, green, blue.
    Rgb,
    /// Hue (as a fraction of a turn), saturation, value.
    Hsv,
    /// CIE L*a*b* (D65), rescaled to [0, 1] per channel.
    #[default]
    Lab,
}

impl ColorSpace {
    pub fn channels(&self) -> usize {
        match self {
            ColorSpace::Grayscale => 1,
            ColorSpace::Rgb | ColorSpace::Hsv | ColorSpace::Lab => 3,
        }
    }
}

/// Granularity of the dissimilarity map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DifferenceMode {
    /// One score per pixel.
    #[default]
    Pixel,
    /// Scores averaged over `size x size` blocks, then spread back over the block.
    Block { size: u32 },
}

/// Which source image the overlay is composited onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlaySource {
    Before,
    #[default]
    After,
}

/// Rendering options for the overlay artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// The RGB color painted over changed pixels.
    pub overlay_color: [u8; 3],
    /// Blend weight of `overlay_color` over the source pixel, in [0, 1].
    pub overlay_opacity: f32,
    pub overlay_source: OverlaySource,
    /// Outline the bounding box of every retained region in `overlay_color` at
    /// full opacity. The outline is drawn over whatever lies under it, so it
    /// also paints pixels the mask marks as unchanged.
    pub draw_region_boxes: bool,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            overlay_color: [255, 0, 0],
            overlay_opacity: 0.5,
            overlay_source: OverlaySource::After,
            draw_region_boxes: false,
        }
    }
}

/// Configuration for a single change analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fixed cut-off on the normalized dissimilarity, in [0, 1].
    /// `None` derives the cut-off from the difference map itself.
    pub threshold: Option<f64>,
    /// Regions with fewer pixels than this are discarded from the report.
    pub min_region_area: usize,
    /// Largest translation, in pixels along each axis, the aligner will try.
    pub alignment_max_shift: u32,
    pub color_space: ColorSpace,
    /// Side of the square opening/closing kernel. Must be odd; 1 disables cleanup.
    pub morphology_kernel_size: u32,
    pub difference_mode: DifferenceMode,
    pub visualization: VisualizationConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold: Some(30.0 / 255.0),
            min_region_area: 0,
            alignment_max_shift: 4,
            color_space: ColorSpace::Lab,
            morphology_kernel_size: 5,
            difference_mode: DifferenceMode::Pixel,
            visualization: VisualizationConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parses a (possibly partial) JSON document; missing fields take their defaults.
    /// The result is validated before it is returned.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(text)
            .map_err(|e| AnalysisError::config("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every tunable against its legal range.
    pub fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
                return Err(AnalysisError::config(
                    "threshold",
                    format!("{threshold} is outside [0, 1]"),
                ));
            }
        }

        if self.morphology_kernel_size < 1 || self.morphology_kernel_size % 2 == 0 {
            return Err(AnalysisError::config(
                "morphology_kernel_size",
                format!("{} must be an odd integer >= 1", self.morphology_kernel_size),
            ));
        }

        if let DifferenceMode::Block { size } = self.difference_mode {
            if size == 0 {
                return Err(AnalysisError::config(
                    "difference_mode.size",
                    "block size must be at least 1",
                ));
            }
        }

        let opacity = self.visualization.overlay_opacity;
        if !opacity.is_finite() || !(0.0..=1.0).contains(&opacity) {
            return Err(AnalysisError::config(
                "visualization.overlay_opacity",
                format!("{opacity} is outside [0, 1]"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn even_kernel_is_rejected() {
        let config = AnalysisConfig {
            morphology_kernel_size: 2,
            ..Default::default()
        };
        match config.validate() {
            Err(AnalysisError::Config { field, .. }) => assert_eq!(field, "morphology_kernel_size"),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_kernel_is_rejected() {
        let config = AnalysisConfig {
            morphology_kernel_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_out_of_range_is_rejected_not_clamped() {
        for bad in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            let config = AnalysisConfig {
                threshold: Some(bad),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "threshold {bad} should fail");
        }
        let edges = [0.0, 1.0];
        for ok in edges {
            let config = AnalysisConfig {
                threshold: Some(ok),
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let config = AnalysisConfig {
            difference_mode: DifferenceMode::Block { size: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn opacity_out_of_range_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.visualization.overlay_opacity = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = AnalysisConfig::from_json(
            r#"{ "threshold": null, "color_space": "hsv", "difference_mode": { "mode": "block", "size": 8 } }"#,
        )
        .unwrap();
        assert_eq!(config.threshold, None);
        assert_eq!(config.color_space, ColorSpace::Hsv);
        assert_eq!(config.difference_mode, DifferenceMode::Block { size: 8 });
        assert_eq!(config.morphology_kernel_size, 5);
    }

    #[test]
    fn negative_area_in_json_is_rejected() {
        let err = AnalysisConfig::from_json(r#"{ "min_region_area": -3 }"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Config { .. }));
    }

    #[test]
    fn json_with_bad_kernel_is_rejected() {
        let err = AnalysisConfig::from_json(r#"{ "morphology_kernel_size": 4 }"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Config { field: "morphology_kernel_size", .. }));
    }
}
