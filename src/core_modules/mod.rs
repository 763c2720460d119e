// Each stage of the engine lives in its own module. They are listed in the
// order data flows through them, data types first.

pub mod pixel;
pub mod grid;
pub mod raster;
pub mod smart_pixel;
pub mod chunk;
pub mod change_region;

pub mod normalizer;
pub mod aligner;
pub mod difference;
pub mod morphology;
pub mod classifier;
pub mod region_detector;
pub mod report;
pub mod visualizer;
