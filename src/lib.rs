// THEORY:
// This file is the main entry point for the `terra_vision` library crate.
// It defines the public API exposed to consumers such as the `change_tester`
// binary or a batch job comparing survey archives.
//
// The primary goal is to export `analyze` and `ChangePipeline`, together with the
// data they exchange (`AnalysisConfig`, `ChangeReport`, `VisualizationArtifact`),
// as the high-level interface of the change detection engine. The individual
// stages under `core_modules` stay public for callers who want to inspect or
// reuse a single step, but nothing requires touching them.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{AnalysisConfig, ColorSpace, DifferenceMode, OverlaySource, VisualizationConfig};
pub use core_modules::aligner::Alignment;
pub use core_modules::raster::Image;
pub use error::{AnalysisError, Result};
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{
    analyze, analyze_at, Analysis, BoundingBox, ChangePipeline, ChangeRegion, ChangeReport, Point,
    VisualizationArtifact,
};
