// THEORY:
// `Grid` is the single-channel 2D container shared by every per-pixel product of
// the engine: the `DifferenceMap` (one `f32` score per pixel) and the `ChangeMask`
// (one `bool` per pixel). Like `Pixel` and `Image`, it is a "dumb" container; the
// analysis lives in the stage modules that produce and consume grids.
//
// Data is stored flat in row-major order so the stages can scan top-to-bottom,
// left-to-right with plain index arithmetic.

/// A row-major, single-channel grid of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

/// Per-pixel dissimilarity scores, typically in [0, 1].
pub type DifferenceMap = Grid<f32>;

/// Per-pixel change flags: `true` means changed.
pub type ChangeMask = Grid<bool>;

impl<T: Clone> Grid<T> {
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; (width as usize) * (height as usize)],
        }
    }
}

impl<T> Grid<T> {
    /// Wraps an existing row-major buffer. Returns `None` if the length does not
    /// match `width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<T>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Builds a grid by evaluating `f(x, y)` for every cell in row-major order.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> T) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> &T {
        &self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let index = self.index(x, y);
        self.data[index] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl Grid<bool> {
    /// Number of `true` cells.
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Builds a mask from rows of 0/1 values. Handy for tests and fixtures.
    pub fn from_rows(rows: &[&[u8]]) -> Option<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map(|r| r.len()).unwrap_or(0) as u32;
        if rows.iter().any(|r| r.len() as u32 != width) {
            return None;
        }
        let data = rows.iter().flat_map(|r| r.iter().map(|&v| v != 0)).collect();
        Self::from_vec(width, height, data)
    }
}
