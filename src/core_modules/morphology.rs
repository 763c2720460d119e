// THEORY:
// Binary morphology over a `ChangeMask` with a square structuring element.
//
// - Erosion keeps a pixel only if every in-bounds neighbour under the kernel is set.
// - Dilation sets a pixel if any in-bounds neighbour under the kernel is set.
// - Opening (erode, then dilate) removes specks smaller than the kernel.
// - Closing (dilate, then erode) fills holes and gaps smaller than the kernel.
//
// Neighbours outside the grid are ignored rather than treated as background, so a
// change region touching the image border is not eaten away by erosion, and
// dilation never creates change out of the border.

use crate::core_modules::grid::ChangeMask;

fn filter(mask: &ChangeMask, kernel_size: u32, keep_if_all: bool) -> ChangeMask {
    let radius = (kernel_size / 2) as i64;
    let (width, height) = (mask.width() as i64, mask.height() as i64);
    let mut output = ChangeMask::filled(mask.width(), mask.height(), false);

    for y in 0..height {
        for x in 0..width {
            let y0 = (y - radius).max(0);
            let y1 = (y + radius).min(height - 1);
            let x0 = (x - radius).max(0);
            let x1 = (x + radius).min(width - 1);

            let mut result = keep_if_all;
            'window: for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let set = *mask.get(nx as u32, ny as u32);
                    if keep_if_all && !set {
                        result = false;
                        break 'window;
                    }
                    if !keep_if_all && set {
                        result = true;
                        break 'window;
                    }
                }
            }
            output.set(x as u32, y as u32, result);
        }
    }
    output
}

pub fn erode(mask: &ChangeMask, kernel_size: u32) -> ChangeMask {
    filter(mask, kernel_size, true)
}

pub fn dilate(mask: &ChangeMask, kernel_size: u32) -> ChangeMask {
    filter(mask, kernel_size, false)
}

pub fn opening(mask: &ChangeMask, kernel_size: u32) -> ChangeMask {
    dilate(&erode(mask, kernel_size), kernel_size)
}

pub fn closing(mask: &ChangeMask, kernel_size: u32) -> ChangeMask {
    erode(&dilate(mask, kernel_size), kernel_size)
}

/// Opening followed by closing. A kernel size of 1 returns the mask unchanged.
pub fn clean(mask: &ChangeMask, kernel_size: u32) -> ChangeMask {
    if kernel_size <= 1 {
        return mask.clone();
    }
    closing(&opening(mask, kernel_size), kernel_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_removes_isolated_pixel() {
        let mask = ChangeMask::from_rows(&[
            &[0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
            &[0, 0, 1, 0, 0],
            &[0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
        ])
        .unwrap();
        assert_eq!(opening(&mask, 3).count_set(), 0);
    }

    #[test]
    fn closing_fills_a_hole() {
        let mask = ChangeMask::from_rows(&[
            &[1, 1, 1, 1, 1],
            &[1, 1, 1, 1, 1],
            &[1, 1, 0, 1, 1],
            &[1, 1, 1, 1, 1],
            &[1, 1, 1, 1, 1],
        ])
        .unwrap();
        assert_eq!(closing(&mask, 3).count_set(), 25);
    }

    #[test]
    fn full_mask_survives_cleanup() {
        let mask = ChangeMask::filled(4, 4, true);
        assert_eq!(clean(&mask, 3), mask);
        assert_eq!(clean(&mask, 5), mask);
    }

    #[test]
    fn empty_mask_stays_empty() {
        let mask = ChangeMask::filled(6, 3, false);
        assert_eq!(clean(&mask, 5).count_set(), 0);
    }

    #[test]
    fn kernel_of_one_is_pass_through() {
        let mask = ChangeMask::from_rows(&[&[1, 0, 1], &[0, 1, 0]]).unwrap();
        assert_eq!(clean(&mask, 1), mask);
    }

    #[test]
    fn square_block_survives_opening() {
        let mask = ChangeMask::from_rows(&[
            &[0, 0, 0, 0, 0, 0],
            &[0, 1, 1, 1, 0, 0],
            &[0, 1, 1, 1, 0, 0],
            &[0, 1, 1, 1, 0, 1],
            &[0, 0, 0, 0, 0, 0],
        ])
        .unwrap();
        let opened = opening(&mask, 3);
        assert_eq!(opened.count_set(), 9);
        assert!(!*opened.get(5, 3));
    }
}
