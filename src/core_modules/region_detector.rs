// THEORY:
// The `RegionDetector` is the engine of the spatial grouping layer. It implements
// binary connected-component labeling over the `ChangeMask` and summarizes each
// component as a `ChangeRegion`.
//
// Key architectural principles & algorithm steps:
// 1.  **Deterministic Scan**: pixels are visited row-major, top-to-bottom,
//     left-to-right. The first unlabeled changed pixel found starts a new
//     component and receives the next sequential id (starting at 1). Running the
//     detector twice on the same mask therefore yields identical ids.
// 2.  **Region Growing**: each component is grown through its 8 neighbours
//     (diagonals count). Growth uses an explicit work-list stack rather than
//     recursion, so memory use does not turn into call-stack depth on large regions.
// 3.  **Data Aggregation**: while a component grows, its area, coordinate sums,
//     bounding box and difference-score sum are accumulated in one pass.
// 4.  **Area Filter**: components smaller than `min_region_area` are dropped from
//     the returned list. Ids are assigned before filtering, so a dropped component
//     still consumes its id. The mask itself is never modified.
// 5.  **Stateless Utility**: the detector keeps nothing between calls.

use crate::core_modules::change_region::{BoundingBox, ChangeRegion, Point};
use crate::core_modules::grid::{ChangeMask, DifferenceMap, Grid};

pub mod region_detector {
    use super::*;
    use tracing::debug;

    const NEIGHBOURS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    /// The full labeling of a mask: one label per pixel (0 = unchanged) and the
    /// number of components found.
    pub struct Labeling {
        pub labels: Grid<u64>,
        pub component_count: u64,
    }

    /// Labels every 8-connected component of `mask` in row-major discovery order.
    pub fn label_components(mask: &ChangeMask) -> Labeling {
        let mut labels = Grid::filled(mask.width(), mask.height(), 0u64);
        let mut next_id = 0u64;
        let mut stack: Vec<Point> = Vec::new();

        for y in 0..mask.height() {
            for x in 0..mask.width() {
                if !*mask.get(x, y) || *labels.get(x, y) != 0 {
                    continue;
                }
                next_id += 1;
                labels.set(x, y, next_id);
                stack.push(Point { x, y });
                while let Some(current) = stack.pop() {
                    for_each_neighbour(mask, current, |n| {
                        if *mask.get(n.x, n.y) && *labels.get(n.x, n.y) == 0 {
                            labels.set(n.x, n.y, next_id);
                            stack.push(n);
                        }
                    });
                }
            }
        }

        Labeling {
            labels,
            component_count: next_id,
        }
    }

    /// The main function of the spatial analysis layer.
    /// Finds every connected region of change and keeps those of at least
    /// `min_region_area` pixels, in id order.
    pub fn find_regions(
        mask: &ChangeMask,
        difference: &DifferenceMap,
        min_region_area: usize,
    ) -> Vec<ChangeRegion> {
        let labeling = label_components(mask);
        let mut accumulators: Vec<Accumulator> =
            (0..labeling.component_count).map(|_| Accumulator::new()).collect();

        for y in 0..mask.height() {
            for x in 0..mask.width() {
                let label = *labeling.labels.get(x, y);
                if label == 0 {
                    continue;
                }
                accumulators[(label - 1) as usize].add(x, y, *difference.get(x, y) as f64);
            }
        }

        let regions: Vec<ChangeRegion> = accumulators
            .into_iter()
            .enumerate()
            .filter(|(_, acc)| acc.area > 0 && acc.area >= min_region_area)
            .map(|(index, acc)| acc.finish(index as u64 + 1))
            .collect();

        debug!(
            components = labeling.component_count,
            retained = regions.len(),
            min_region_area,
            "labeled change regions"
        );
        regions
    }

    fn for_each_neighbour(mask: &ChangeMask, p: Point, mut f: impl FnMut(Point)) {
        let (width, height) = (mask.width() as i64, mask.height() as i64);
        for (dx, dy) in NEIGHBOURS {
            let nx = p.x as i64 + dx;
            let ny = p.y as i64 + dy;
            if nx >= 0 && nx < width && ny >= 0 && ny < height {
                f(Point {
                    x: nx as u32,
                    y: ny as u32,
                });
            }
        }
    }

    struct Accumulator {
        area: usize,
        sum_x: f64,
        sum_y: f64,
        sum_intensity: f64,
        min: Point,
        max: Point,
    }

    impl Accumulator {
        fn new() -> Self {
            Self {
                area: 0,
                sum_x: 0.0,
                sum_y: 0.0,
                sum_intensity: 0.0,
                min: Point {
                    x: u32::MAX,
                    y: u32::MAX,
                },
                max: Point { x: 0, y: 0 },
            }
        }

        fn add(&mut self, x: u32, y: u32, intensity: f64) {
            self.area += 1;
            self.sum_x += x as f64;
            self.sum_y += y as f64;
            self.sum_intensity += intensity;
            self.min.x = self.min.x.min(x);
            self.min.y = self.min.y.min(y);
            self.max.x = self.max.x.max(x);
            self.max.y = self.max.y.max(y);
        }

        fn finish(self, id: u64) -> ChangeRegion {
            let area = self.area as f64;
            ChangeRegion {
                id,
                area: self.area,
                centroid: (self.sum_x / area, self.sum_y / area),
                bounding_box: BoundingBox {
                    min: self.min,
                    max: self.max,
                },
                mean_intensity: self.sum_intensity / area,
            }
        }
    }
}
