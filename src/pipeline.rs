// THEORY:
// The `pipeline` module is the top-level API of the change detection engine. It
// chains the stages into one call and is the only place that knows their order:
//
//   Normalizer -> Aligner -> Difference Computer -> Change Classifier
//              -> Region Detector -> Report Builder
//
// with the Visualizer drawing from the difference map, the mask and one of the
// aligned source images next to the report builder.
//
// Key architectural principles:
// 1.  **Validate First**: the configuration is checked before any pixel is read.
// 2.  **All or Nothing**: every stage error propagates with `?`; a partial report
//     is never returned.
// 3.  **Pure Invocation**: a `ChangePipeline` holds only its configuration. Every
//     buffer is allocated per call, so one pipeline can serve concurrent callers.
// 4.  **Inspectable**: each stage is also exposed on its own, and `run` returns all
//     intermediate products for callers that want more than the report.

use crate::config::{AnalysisConfig, OverlaySource};
use crate::core_modules::aligner::{self, Alignment};
use crate::core_modules::classifier::{self, Classification};
use crate::core_modules::difference;
use crate::core_modules::grid::{ChangeMask, DifferenceMap};
use crate::core_modules::normalizer::{self, NormalizedPair};
use crate::core_modules::raster::Image;
use crate::core_modules::region_detector::region_detector;
use crate::core_modules::report::{self, ReportContext};
use crate::core_modules::visualizer;
use crate::error::Result;
use chrono::{DateTime, Utc};
use tracing::info;

// Re-export key data structures for the public API.
pub use crate::core_modules::change_region::{BoundingBox, ChangeRegion, Point};
pub use crate::core_modules::report::ChangeReport;
pub use crate::core_modules::visualizer::VisualizationArtifact;

/// Every product of one analysis, intermediates included.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: ChangeReport,
    pub artifact: VisualizationArtifact,
    /// The normalized, aligned pair the measurements were taken on.
    pub aligned: NormalizedPair,
    pub difference_map: DifferenceMap,
    pub mask: ChangeMask,
}

/// The main, top-level struct of the engine.
#[derive(Debug, Clone)]
pub struct ChangePipeline {
    config: AnalysisConfig,
}

impl ChangePipeline {
    /// Validates `config` and builds a pipeline around it.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    // Stage 1: common resolution and color space.
    pub fn normalize(&self, before: &Image, after: &Image) -> Result<NormalizedPair> {
        normalizer::normalize_pair(before, after, self.config.color_space)
    }

    // Stage 2: translational alignment.
    pub fn align(&self, pair: &NormalizedPair) -> Result<(NormalizedPair, Alignment)> {
        aligner::align_pair(pair, self.config.alignment_max_shift)
    }

    // Stage 3: dissimilarity map.
    pub fn difference(&self, pair: &NormalizedPair) -> DifferenceMap {
        difference::compute_difference(pair, self.config.difference_mode)
    }

    // Stage 4: threshold and cleanup.
    pub fn classify(&self, map: &DifferenceMap) -> Classification {
        classifier::classify(map, self.config.threshold, self.config.morphology_kernel_size)
    }

    // Stage 5: connected regions.
    pub fn aggregate(&self, mask: &ChangeMask, map: &DifferenceMap) -> Vec<ChangeRegion> {
        region_detector::find_regions(mask, map, self.config.min_region_area)
    }

    /// Runs every stage and keeps the intermediates.
    pub fn run(&self, before: &Image, after: &Image, timestamp: DateTime<Utc>) -> Result<Analysis> {
        let normalized = self.normalize(before, after)?;
        let (aligned, alignment) = self.align(&normalized)?;
        let difference_map = self.difference(&aligned);
        let stats = difference::statistics(&difference_map);
        let classification = self.classify(&difference_map);
        let regions = self.aggregate(&classification.mask, &difference_map);

        let source = self.overlay_source(before, after, alignment)?;
        let artifact = visualizer::render(
            &difference_map,
            &classification.mask,
            &source,
            &regions,
            &self.config.visualization,
        );

        let report = report::build_report(
            regions,
            ReportContext {
                width: aligned.width(),
                height: aligned.height(),
                config: self.config.clone(),
                alignment,
                threshold_used: classification.threshold,
                difference: stats,
                timestamp,
            },
        );

        info!(
            width = report.width,
            height = report.height,
            regions = report.region_count(),
            changed = report.total_changed_pixels,
            percent = report.percent_changed,
            "change analysis complete"
        );

        Ok(Analysis {
            report,
            artifact,
            aligned,
            difference_map,
            mask: classification.mask,
        })
    }

    /// Runs the analysis and returns the report and its visualization.
    pub fn generate_report(
        &self,
        before: &Image,
        after: &Image,
        timestamp: DateTime<Utc>,
    ) -> Result<(ChangeReport, VisualizationArtifact)> {
        let analysis = self.run(before, after, timestamp)?;
        Ok((analysis.report, analysis.artifact))
    }

    /// The chosen source image at the analyzed resolution, cropped to the aligned overlap.
    fn overlay_source(&self, before: &Image, after: &Image, alignment: Alignment) -> Result<Image> {
        let (width, height) = normalizer::common_resolution(before, after);
        let source = match self.config.visualization.overlay_source {
            OverlaySource::Before => alignment.crop_before(&normalizer::resize_to(before, width, height)?),
            OverlaySource::After => alignment.crop_after(&normalizer::resize_to(after, width, height)?),
        };
        Ok(source)
    }
}

/// Compares two captures of the same area and reports where they differ.
pub fn analyze(
    before: &Image,
    after: &Image,
    config: &AnalysisConfig,
) -> Result<(ChangeReport, VisualizationArtifact)> {
    analyze_at(before, after, config, Utc::now())
}

/// Same as [`analyze`], with an explicit report timestamp.
pub fn analyze_at(
    before: &Image,
    after: &Image,
    config: &AnalysisConfig,
    timestamp: DateTime<Utc>,
) -> Result<(ChangeReport, VisualizationArtifact)> {
    ChangePipeline::new(config.clone())?.generate_report(before, after, timestamp)
}
