// THEORY:
// The `aligner` corrects the small translational drift that remains between two
// captures of the same footprint. Without it, every edge in the scene (a road, a
// field boundary) shows up as a thin band of false change.
//
// Algorithm:
// 1.  **Exhaustive Search**: every integer shift (dx, dy) within the search radius
//     is scored. The radius is `max_shift`, limited to what the image can hold:
//     the scoring window must keep at least one pixel per axis. Candidates are
//     generated lazily, so a huge `max_shift` costs no more than the image allows.
// 2.  **Common Window**: every candidate is scored as the mean absolute difference
//     between the same central window of the first image (inset by the radius on
//     every side) and the displaced window of the second. Scoring over each shift's
//     own overlap would reward shifts that simply crop a changed area away.
// 3.  **Deterministic Ties**: equal scores prefer the smallest |dx| + |dy|, then
//     the smallest dx, then the smallest dy. Candidates are visited in exactly that
//     order and only a strictly better score replaces the current best. A
//     non-identity winner must also be `MIN_SHIFT_GAIN` times better than the
//     identity shift; localized change on a flat background does not clear that bar,
//     real drift on a textured scene does.
// 4.  **Cropping**: both images are cut down to their common overlap so they keep
//     identical dimensions.
//
// Convention: a shift (dx, dy) means `after(x + dx, y + dy)` shows the same ground
// point as `before(x, y)`.

use crate::core_modules::normalizer::NormalizedPair;
use crate::core_modules::raster::Image;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// The translation applied to the second image, and how well it fits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub dx: i32,
    pub dy: i32,
    /// Mean absolute difference over the common scoring window at this shift.
    pub score: f64,
}

impl Alignment {
    pub fn identity() -> Self {
        Self {
            dx: 0,
            dy: 0,
            score: 0.0,
        }
    }

    /// The overlap window as (before_x, before_y, after_x, after_y, width, height).
    pub fn overlap(&self, width: u32, height: u32) -> (u32, u32, u32, u32, u32, u32) {
        overlap_window(self.dx, self.dy, width, height)
    }

    /// Crops a `before`-side image to the overlap of this alignment.
    pub fn crop_before(&self, image: &Image) -> Image {
        let (bx, by, _, _, w, h) = self.overlap(image.width(), image.height());
        image.crop(bx, by, w, h)
    }

    /// Crops an `after`-side image to the overlap of this alignment.
    pub fn crop_after(&self, image: &Image) -> Image {
        let (_, _, ax, ay, w, h) = self.overlap(image.width(), image.height());
        image.crop(ax, ay, w, h)
    }
}

/// Aligns the second image of the pair onto the first within `max_shift` pixels.
///
/// With `max_shift == 0` the pair is returned unchanged.
pub fn align_pair(pair: &NormalizedPair, max_shift: u32) -> Result<(NormalizedPair, Alignment)> {
    if max_shift == 0 {
        return Ok((pair.clone(), Alignment::identity()));
    }

    let alignment = estimate_shift(&pair.before, &pair.after, max_shift);
    let (.., width, height) = alignment.overlap(pair.width(), pair.height());
    if width == 0 || height == 0 {
        return Err(AnalysisError::Alignment {
            dx: alignment.dx,
            dy: alignment.dy,
            width,
            height,
        });
    }

    debug!(dx = alignment.dx, dy = alignment.dy, score = alignment.score, width, height, "aligned pair");

    Ok((
        NormalizedPair {
            before: alignment.crop_before(&pair.before),
            after: alignment.crop_after(&pair.after),
        },
        alignment,
    ))
}

/// A translation is applied only when its score is at least this many times
/// lower than the score of the identity shift.
pub const MIN_SHIFT_GAIN: f64 = 4.0;

/// The search radius actually used: `max_shift`, limited so that the common
/// scoring window keeps at least one pixel along each axis.
pub fn search_radius(max_shift: u32, width: u32, height: u32) -> u32 {
    if width == 0 || height == 0 {
        return 0;
    }
    max_shift.min((width - 1) / 2).min((height - 1) / 2)
}

/// Finds the best shift in the search window. Every candidate is scored on the
/// same `before` pixels, so a shift cannot win by cropping a changed area away.
/// A non-identity winner must also beat the identity score by `MIN_SHIFT_GAIN`.
pub fn estimate_shift(before: &Image, after: &Image, max_shift: u32) -> Alignment {
    let width = before.width().min(after.width());
    let height = before.height().min(after.height());
    let radius = search_radius(max_shift, width, height);
    if radius == 0 {
        return Alignment::identity();
    }

    let identity = Alignment {
        dx: 0,
        dy: 0,
        score: window_score(before, after, radius, 0, 0, width, height),
    };
    let mut best = identity;
    for (dx, dy) in candidate_shifts(radius).skip(1) {
        let score = window_score(before, after, radius, dx, dy, width, height);
        trace!(dx, dy, score, "scored shift");
        if score < best.score {
            best = Alignment { dx, dy, score };
        }
    }

    if best.score * MIN_SHIFT_GAIN < identity.score {
        best
    } else {
        if best != identity {
            debug!(dx = best.dx, dy = best.dy, score = best.score, identity = identity.score, "shift gain too small, keeping identity");
        }
        identity
    }
}

/// All shifts within `radius`, lazily, ordered by |dx| + |dy|, then dx, then dy.
fn candidate_shifts(radius: u32) -> impl Iterator<Item = (i32, i32)> {
    let r = radius as i64;
    (0..=2 * r).flat_map(move |distance| {
        let reach = distance.min(r);
        (-reach..=reach).flat_map(move |dx| {
            let rest = distance - dx.abs();
            let dys = if rest < 0 || rest > r {
                [None, None]
            } else if rest == 0 {
                [Some(0), None]
            } else {
                [Some(-rest), Some(rest)]
            };
            // `radius` never exceeds i32::MAX, see `search_radius`.
            dys.into_iter().flatten().map(move |dy| (dx as i32, dy as i32))
        })
    })
}

fn overlap_window(dx: i32, dy: i32, width: u32, height: u32) -> (u32, u32, u32, u32, u32, u32) {
    let overlap_w = (width as i64 - dx.unsigned_abs() as i64).max(0) as u32;
    let overlap_h = (height as i64 - dy.unsigned_abs() as i64).max(0) as u32;
    let (before_x, after_x) = if dx >= 0 { (0, dx as u32) } else { (dx.unsigned_abs(), 0) };
    let (before_y, after_y) = if dy >= 0 { (0, dy as u32) } else { (dy.unsigned_abs(), 0) };
    if overlap_w == 0 || overlap_h == 0 {
        return (0, 0, 0, 0, overlap_w, overlap_h);
    }
    (before_x, before_y, after_x, after_y, overlap_w, overlap_h)
}

/// Mean absolute difference between the `before` window `[radius, size - radius)`
/// and the `after` window displaced by (dx, dy). Requires |dx|, |dy| <= radius.
fn window_score(before: &Image, after: &Image, radius: u32, dx: i32, dy: i32, width: u32, height: u32) -> f64 {
    let (w, h) = (width - 2 * radius, height - 2 * radius);
    let ax0 = (radius as i64 + dx as i64) as u32;
    let ay0 = (radius as i64 + dy as i64) as u32;

    let mut total = 0.0f64;
    for y in 0..h {
        for x in 0..w {
            let a = before.pixel(radius + x, radius + y);
            let b = after.pixel(ax0 + x, ay0 + y);
            total += a
                .iter()
                .zip(b)
                .map(|(p, q)| (p - q).abs() as f64)
                .sum::<f64>();
        }
    }
    let samples = (w as f64) * (h as f64) * before.channels() as f64;
    total / samples
}
