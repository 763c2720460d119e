// THEORY:
// The `Chunk` module represents a spatial grouping of pixels. In block mode the
// difference computer does not trust single pixels: sensor noise, small
// registration residue and compression artifacts all produce isolated spikes.
// Pooling scores over a block cancels those spikes while keeping spatially
// coherent change (a new building, a cleared field) intact.
//
// Key architectural principles:
// 1.  **Spatial Pooling**: the grid is tiled with `size x size` blocks. Blocks on
//     the right and bottom edges may be partial; they average only what they cover.
// 2.  **Noise Reduction**: the core operation of a chunk is `average`.
// 3.  **Full Resolution Output**: after pooling, each block's mean is written back
//     to every pixel it covers (nearest-neighbour upsampling), so the map keeps the
//     exact dimensions of its input.

pub mod chunk {
    use crate::core_modules::grid::Grid;

    /// A rectangular block of the grid, in pixel coordinates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Chunk {
        pub x: u32,
        pub y: u32,
        /// The width of the chunk in pixels (smaller than the block size at the right edge).
        pub width: u32,
        /// The height of the chunk in pixels (smaller than the block size at the bottom edge).
        pub height: u32,
    }

    impl Chunk {
        /// Calculates the mean of `grid` over this chunk.
        pub fn average(&self, grid: &Grid<f32>) -> f32 {
            let count = (self.width as usize) * (self.height as usize);
            if count == 0 {
                return 0.0;
            }
            let mut sum = 0.0f64;
            for y in self.y..self.y + self.height {
                for x in self.x..self.x + self.width {
                    sum += *grid.get(x, y) as f64;
                }
            }
            (sum / count as f64) as f32
        }

        /// Writes `value` to every pixel of the chunk.
        pub fn fill(&self, grid: &mut Grid<f32>, value: f32) {
            for y in self.y..self.y + self.height {
                for x in self.x..self.x + self.width {
                    grid.set(x, y, value);
                }
            }
        }
    }

    /// Tiles a `width x height` grid with `size x size` chunks, row-major.
    pub fn tile(width: u32, height: u32, size: u32) -> Vec<Chunk> {
        let size = size.max(1);
        let mut chunks = Vec::new();
        for y in (0..height).step_by(size as usize) {
            for x in (0..width).step_by(size as usize) {
                chunks.push(Chunk {
                    x,
                    y,
                    width: size.min(width - x),
                    height: size.min(height - y),
                });
            }
        }
        chunks
    }

    /// Replaces every pixel by the mean of its block.
    pub fn pool(grid: &Grid<f32>, size: u32) -> Grid<f32> {
        let mut pooled = Grid::filled(grid.width(), grid.height(), 0.0f32);
        for chunk in tile(grid.width(), grid.height(), size) {
            let mean = chunk.average(grid);
            chunk.fill(&mut pooled, mean);
        }
        pooled
    }
}
