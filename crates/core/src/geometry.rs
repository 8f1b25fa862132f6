//! Axis-aligned rectangle kernel.
//!
//! Every structure in the capacity mesh pipeline is built from axis-aligned
//! rectangles, so this module concentrates the predicates the rest of the
//! system relies on: overlap and containment tests, point-to-edge distance,
//! 2D rectangle subtraction, and the four directional expansion caps used by
//! the greedy expansion engine.
//!
//! All comparisons go through the ε-tolerant helpers ([`gt`], [`gte`], [`lt`],
//! [`lte`]) so that coordinates produced by mixed-precision inputs (4-decimal
//! next to 14-decimal values) cannot stall the greedy loops on hairline
//! differences.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Comparison tolerance shared by every geometric predicate.
pub const EPSILON: f64 = 1e-9;

/// ε-tolerant `a > b`.
#[inline]
pub fn gt(a: f64, b: f64) -> bool {
    a > b + EPSILON
}

/// ε-tolerant `a >= b`.
#[inline]
pub fn gte(a: f64, b: f64) -> bool {
    a >= b - EPSILON
}

/// ε-tolerant `a < b`.
#[inline]
pub fn lt(a: f64, b: f64) -> bool {
    a < b - EPSILON
}

/// ε-tolerant `a <= b`.
#[inline]
pub fn lte(a: f64, b: f64) -> bool {
    a <= b + EPSILON
}

/// An axis-aligned rectangle, half-open at `x + width` / `y + height`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    /// Minimum x coordinate.
    pub x: f64,
    /// Minimum y coordinate.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle from its minimum corner and extents.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from two opposite corners.
    pub fn from_corners(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    /// Maximum x coordinate.
    #[inline]
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Maximum y coordinate.
    #[inline]
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Center point `(x, y)`.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Area of the rectangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True if either extent is non-positive (within ε).
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !gt(self.width, 0.0) || !gt(self.height, 0.0)
    }

    /// True if the point lies inside the rectangle (ε-tolerant, closed test).
    pub fn contains_point(&self, px: f64, py: f64) -> bool {
        gte(px, self.x) && lte(px, self.max_x()) && gte(py, self.y) && lte(py, self.max_y())
    }

    /// True if `other` lies entirely inside `self` (ε-tolerant).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        gte(other.x, self.x)
            && gte(other.y, self.y)
            && lte(other.max_x(), self.max_x())
            && lte(other.max_y(), self.max_y())
    }

    /// True if the two rectangles overlap with positive area (ε-tolerant;
    /// rectangles that merely touch do not overlap).
    pub fn overlaps(&self, other: &Rect) -> bool {
        lt(self.x, other.max_x())
            && gt(self.max_x(), other.x)
            && lt(self.y, other.max_y())
            && gt(self.max_y(), other.y)
    }

    /// Returns the positive-area intersection with `other`, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.overlaps(other) {
            return None;
        }
        let min_x = self.x.max(other.x);
        let min_y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        Some(Rect::from_corners(min_x, min_y, max_x, max_y))
    }

    /// Grows the rectangle by `pad` on every side.
    pub fn padded(&self, pad: f64) -> Rect {
        Rect {
            x: self.x - pad,
            y: self.y - pad,
            width: self.width + 2.0 * pad,
            height: self.height + 2.0 * pad,
        }
    }
}

/// Minimum distance from a point to a finite segment.
fn distance_point_to_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= EPSILON {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Minimum distance from a point to the four boundary segments of a
/// rectangle. A point inside the rectangle still reports its distance to the
/// nearest edge, not zero.
pub fn distance_point_to_rect_edges(px: f64, py: f64, r: &Rect) -> f64 {
    let (x0, y0, x1, y1) = (r.x, r.y, r.max_x(), r.max_y());
    let d_bottom = distance_point_to_segment(px, py, x0, y0, x1, y0);
    let d_top = distance_point_to_segment(px, py, x0, y1, x1, y1);
    let d_left = distance_point_to_segment(px, py, x0, y0, x0, y1);
    let d_right = distance_point_to_segment(px, py, x1, y0, x1, y1);
    d_bottom.min(d_top).min(d_left).min(d_right)
}

/// Subtracts `b` from `a`, returning up to four disjoint rectangles that
/// together cover `a \ b`.
///
/// The decomposition is: full-height left strip (`x < intersection`),
/// full-height right strip (`x > intersection`), then the bottom and top
/// wedges of the vertical band spanned by the intersection. Pieces with
/// non-positive extent are filtered out. If the rectangles do not overlap,
/// `a` is returned unchanged as a single piece.
pub fn subtract_rect_2d(a: &Rect, b: &Rect) -> Vec<Rect> {
    let Some(ix) = a.intersection(b) else {
        return vec![*a];
    };

    let mut pieces = Vec::with_capacity(4);

    // Left strip.
    if gt(ix.x, a.x) {
        pieces.push(Rect::from_corners(a.x, a.y, ix.x, a.max_y()));
    }
    // Right strip.
    if gt(a.max_x(), ix.max_x()) {
        pieces.push(Rect::from_corners(ix.max_x(), a.y, a.max_x(), a.max_y()));
    }
    // Bottom wedge of the intersection band.
    if gt(ix.y, a.y) {
        pieces.push(Rect::from_corners(ix.x, a.y, ix.max_x(), ix.y));
    }
    // Top wedge of the intersection band.
    if gt(a.max_y(), ix.max_y()) {
        pieces.push(Rect::from_corners(ix.x, ix.max_y(), ix.max_x(), a.max_y()));
    }

    pieces.retain(|p| !p.is_degenerate());
    pieces
}

/// Caps growth on an axis so the aspect ratio stays within `max_aspect`.
///
/// The cap only binds when the growing axis is currently the dominant
/// dimension; a skinny rectangle is free to grow toward square before the
/// limit engages.
fn aspect_cap(growing: f64, other: f64, growth: f64, max_aspect: Option<f64>) -> f64 {
    let Some(ratio) = max_aspect else {
        return growth;
    };
    if growing < other {
        return growth;
    }
    let allowed = (ratio * other - growing).max(0.0);
    growth.min(allowed)
}

/// Maximum distance `rect` may grow to the right before hitting the bounds
/// or the nearest blocker overlapping its vertical span. A blocker already
/// overlapping the right edge caps growth at zero.
pub fn max_expand_right(
    rect: &Rect,
    bounds: &Rect,
    blockers: &[Rect],
    max_aspect: Option<f64>,
) -> f64 {
    let mut limit = bounds.max_x() - rect.max_x();
    for b in blockers {
        if !(lt(b.y, rect.max_y()) && gt(b.max_y(), rect.y)) {
            continue;
        }
        if lte(b.max_x(), rect.max_x()) {
            continue;
        }
        if lt(b.x, rect.max_x()) {
            return 0.0;
        }
        limit = limit.min(b.x - rect.max_x());
    }
    aspect_cap(rect.width, rect.height, limit.max(0.0), max_aspect)
}

/// Maximum distance `rect` may grow to the left. See [`max_expand_right`].
pub fn max_expand_left(
    rect: &Rect,
    bounds: &Rect,
    blockers: &[Rect],
    max_aspect: Option<f64>,
) -> f64 {
    let mut limit = rect.x - bounds.x;
    for b in blockers {
        if !(lt(b.y, rect.max_y()) && gt(b.max_y(), rect.y)) {
            continue;
        }
        if gte(b.x, rect.x) {
            continue;
        }
        if gt(b.max_x(), rect.x) {
            return 0.0;
        }
        limit = limit.min(rect.x - b.max_x());
    }
    aspect_cap(rect.width, rect.height, limit.max(0.0), max_aspect)
}

/// Maximum distance `rect` may grow upward (+y). See [`max_expand_right`].
pub fn max_expand_up(
    rect: &Rect,
    bounds: &Rect,
    blockers: &[Rect],
    max_aspect: Option<f64>,
) -> f64 {
    let mut limit = bounds.max_y() - rect.max_y();
    for b in blockers {
        if !(lt(b.x, rect.max_x()) && gt(b.max_x(), rect.x)) {
            continue;
        }
        if lte(b.max_y(), rect.max_y()) {
            continue;
        }
        if lt(b.y, rect.max_y()) {
            return 0.0;
        }
        limit = limit.min(b.y - rect.max_y());
    }
    aspect_cap(rect.height, rect.width, limit.max(0.0), max_aspect)
}

/// Maximum distance `rect` may grow downward (-y). See [`max_expand_right`].
pub fn max_expand_down(
    rect: &Rect,
    bounds: &Rect,
    blockers: &[Rect],
    max_aspect: Option<f64>,
) -> f64 {
    let mut limit = rect.y - bounds.y;
    for b in blockers {
        if !(lt(b.x, rect.max_x()) && gt(b.max_x(), rect.x)) {
            continue;
        }
        if gte(b.y, rect.y) {
            continue;
        }
        if gt(b.max_y(), rect.y) {
            return 0.0;
        }
        limit = limit.min(rect.y - b.max_y());
    }
    aspect_cap(rect.height, rect.width, limit.max(0.0), max_aspect)
}
