// THEORY:
// The report builder is the last step of the analytical chain. It takes the
// retained regions and turns them into the `ChangeReport` handed to the caller,
// adding the global figures a reader looks at first: how much of the area changed
// and in how many places.
//
// It is pure aggregation. An empty region list is a perfectly valid outcome (the
// ground did not change) and yields a report with zero regions and 0% change.

use crate::config::AnalysisConfig;
use crate::core_modules::aligner::Alignment;
use crate::core_modules::change_region::ChangeRegion;
use crate::core_modules::difference::DifferenceStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The quantified outcome of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    /// Retained regions, largest first; equal areas in ascending id order.
    pub regions: Vec<ChangeRegion>,
    /// Sum of the retained regions' areas.
    pub total_changed_pixels: usize,
    /// `total_changed_pixels / (width * height)`, in [0, 1].
    pub percent_changed: f64,
    /// Width of the analyzed (normalized and aligned) image.
    pub width: u32,
    /// Height of the analyzed (normalized and aligned) image.
    pub height: u32,
    pub config: AnalysisConfig,
    pub alignment: Alignment,
    /// The threshold that was applied, whether configured or adaptive.
    pub threshold_used: f64,
    pub mean_difference: f64,
    pub max_difference: f64,
    pub timestamp: DateTime<Utc>,
}

impl ChangeReport {
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Everything the report is assembled from, besides the regions themselves.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub width: u32,
    pub height: u32,
    pub config: AnalysisConfig,
    pub alignment: Alignment,
    pub threshold_used: f64,
    pub difference: DifferenceStats,
    pub timestamp: DateTime<Utc>,
}

/// Orders the regions and computes the global metrics.
pub fn build_report(mut regions: Vec<ChangeRegion>, context: ReportContext) -> ChangeReport {
    regions.sort_by(|a, b| b.area.cmp(&a.area).then(a.id.cmp(&b.id)));

    let total_changed_pixels: usize = regions.iter().map(|r| r.area).sum();
    let total_pixels = (context.width as u64) * (context.height as u64);
    let percent_changed = if total_pixels == 0 {
        0.0
    } else {
        (total_changed_pixels as f64 / total_pixels as f64).clamp(0.0, 1.0)
    };

    ChangeReport {
        regions,
        total_changed_pixels,
        percent_changed,
        width: context.width,
        height: context.height,
        config: context.config,
        alignment: context.alignment,
        threshold_used: context.threshold_used,
        mean_difference: context.difference.mean,
        max_difference: context.difference.max,
        timestamp: context.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::change_region::{BoundingBox, Point};

    fn region(id: u64, area: usize) -> ChangeRegion {
        ChangeRegion {
            id,
            area,
            centroid: (0.0, 0.0),
            bounding_box: BoundingBox {
                min: Point { x: 0, y: 0 },
                max: Point { x: 0, y: 0 },
            },
            mean_intensity: 1.0,
        }
    }

    fn context(width: u32, height: u32) -> ReportContext {
        ReportContext {
            width,
            height,
            config: AnalysisConfig::default(),
            alignment: Alignment::identity(),
            threshold_used: 0.5,
            difference: DifferenceStats::default(),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn regions_sorted_by_area_then_id() {
        let report = build_report(
            vec![region(1, 4), region(2, 9), region(3, 4), region(4, 1)],
            context(10, 10),
        );
        let order: Vec<u64> = report.regions.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![2, 1, 3, 4]);
        assert_eq!(report.total_changed_pixels, 18);
        assert!((report.percent_changed - 0.18).abs() < 1e-12);
    }

    #[test]
    fn empty_region_list_is_a_valid_report() {
        let report = build_report(Vec::new(), context(4, 4));
        assert_eq!(report.region_count(), 0);
        assert_eq!(report.total_changed_pixels, 0);
        assert_eq!(report.percent_changed, 0.0);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = build_report(vec![region(1, 2)], context(2, 2));
        let json = report.to_json().unwrap();
        let restored: ChangeReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.total_changed_pixels, 2);
        assert_eq!(restored.timestamp, report.timestamp);
    }
}
