//! Greedy rectangle expansion from a seed point.
//!
//! A seed is tried with five initial anchorings; each surviving anchor is
//! grown one direction at a time (right, down, left, up) until no direction
//! improves, and the largest-area survivor that meets the size floor wins.
//! The loop is greedy and locally maximal only.
//!
//! Termination is guarded explicitly: adversarial mixed-precision inputs
//! can make successive expansions infinitesimally small, so rounds stop at
//! [`MAX_EXPANSION_ITERATIONS`] and growth below [`MIN_IMPROVEMENT`] does
//! not count as progress.

use capmesh_core::geometry::{
    max_expand_down, max_expand_left, max_expand_right, max_expand_up, Rect, EPSILON,
};

/// Hard cap on expansion rounds per anchoring.
pub const MAX_EXPANSION_ITERATIONS: usize = 64;

/// Growth below this does not count as an improvement.
pub const MIN_IMPROVEMENT: f64 = 1e-7;

/// Grows `rect` in place until no direction improves, returning the grown
/// rectangle. Stops after [`MAX_EXPANSION_ITERATIONS`] rounds and keeps the
/// best rectangle found so far.
pub fn grow_to_max(
    mut rect: Rect,
    bounds: &Rect,
    blockers: &[Rect],
    max_aspect: Option<f64>,
) -> Rect {
    let mut rounds = 0;
    loop {
        let mut improved = false;

        let g = max_expand_right(&rect, bounds, blockers, max_aspect);
        if g > MIN_IMPROVEMENT {
            rect.width += g;
            improved = true;
        }
        let g = max_expand_down(&rect, bounds, blockers, max_aspect);
        if g > MIN_IMPROVEMENT {
            rect.y -= g;
            rect.height += g;
            improved = true;
        }
        let g = max_expand_left(&rect, bounds, blockers, max_aspect);
        if g > MIN_IMPROVEMENT {
            rect.x -= g;
            rect.width += g;
            improved = true;
        }
        let g = max_expand_up(&rect, bounds, blockers, max_aspect);
        if g > MIN_IMPROVEMENT {
            rect.height += g;
            improved = true;
        }

        if !improved {
            break;
        }
        rounds += 1;
        if rounds >= MAX_EXPANSION_ITERATIONS {
            log::warn!(
                "expansion hit the {MAX_EXPANSION_ITERATIONS}-round cap at ({:.3}, {:.3})",
                rect.x,
                rect.y
            );
            break;
        }
    }
    rect
}

/// The five initial anchorings of a `size`×`size` square around a seed
/// point: seed at top-left, top-right, bottom-left, bottom-right corner,
/// and centered.
fn initial_anchorings(seed_x: f64, seed_y: f64, size: f64) -> [Rect; 5] {
    [
        Rect::new(seed_x, seed_y - size, size, size),
        Rect::new(seed_x - size, seed_y - size, size, size),
        Rect::new(seed_x, seed_y, size, size),
        Rect::new(seed_x - size, seed_y, size, size),
        Rect::new(seed_x - size / 2.0, seed_y - size / 2.0, size, size),
    ]
}

/// Expands a seed point into a locally-maximal rectangle.
///
/// Returns the maximum-area converged anchoring whose dimensions both meet
/// `min_req`, or `None` when every anchoring is blocked or undersized.
#[allow(clippy::too_many_arguments)]
pub fn expand_rect_from_seed(
    seed_x: f64,
    seed_y: f64,
    grid_size: f64,
    bounds: &Rect,
    blockers: &[Rect],
    initial_cell_ratio: f64,
    max_aspect_ratio: Option<f64>,
    min_req: f64,
) -> Option<Rect> {
    let size = (grid_size * initial_cell_ratio).max(min_req);
    let mut best: Option<Rect> = None;

    for anchor in initial_anchorings(seed_x, seed_y, size) {
        if !bounds.contains_rect(&anchor) {
            continue;
        }
        if blockers.iter().any(|b| b.overlaps(&anchor)) {
            continue;
        }

        let grown = grow_to_max(anchor, bounds, blockers, max_aspect_ratio);
        if grown.width < min_req - EPSILON || grown.height < min_req - EPSILON {
            continue;
        }
        if best.is_none_or(|b| grown.area() > b.area()) {
            best = Some(grown);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_to_full_bounds_when_unblocked() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let rect = expand_rect_from_seed(5.0, 5.0, 2.5, &bounds, &[], 0.25, None, 0.2).unwrap();
        assert!((rect.area() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_expansion_stops_at_blockers() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let blockers = vec![
            Rect::new(0.0, 6.0, 10.0, 1.0),
            Rect::new(6.0, 0.0, 1.0, 10.0),
        ];
        let rect = expand_rect_from_seed(3.0, 3.0, 2.0, &bounds, &blockers, 0.25, None, 0.2)
            .expect("seed has room");
        assert!(rect.max_x() <= 6.0 + EPSILON);
        assert!(rect.max_y() <= 6.0 + EPSILON);
        assert!((rect.area() - 36.0).abs() < 1e-6);
    }

    #[test]
    fn test_seed_inside_blocker_fails() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let blockers = vec![Rect::new(2.0, 2.0, 6.0, 6.0)];
        assert!(
            expand_rect_from_seed(5.0, 5.0, 2.0, &bounds, &blockers, 0.25, None, 0.2).is_none()
        );
    }

    #[test]
    fn test_min_req_rejects_narrow_slots() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        // A 0.3-wide vertical slot between two blockers.
        let blockers = vec![
            Rect::new(0.0, 0.0, 4.85, 10.0),
            Rect::new(5.15, 0.0, 4.85, 10.0),
        ];
        assert!(
            expand_rect_from_seed(5.0, 5.0, 2.0, &bounds, &blockers, 0.25, None, 0.5).is_none()
        );
    }

    #[test]
    fn test_corner_anchorings_recover_edge_seeds() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Seed on the left board edge: centered anchoring falls outside the
        // bounds, corner anchorings survive.
        let rect = expand_rect_from_seed(0.0, 5.0, 2.0, &bounds, &[], 0.25, None, 0.2)
            .expect("corner anchorings fit");
        assert!((rect.area() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_mixed_precision_terminates() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        // 4-decimal and 14-decimal coordinates in the same blocker set.
        let blockers = vec![
            Rect::new(2.1234, 0.0, 1.0, 10.0),
            Rect::new(7.123_456_789_012_34, 0.0, 1.0, 10.0),
        ];
        let rect = expand_rect_from_seed(5.0, 5.0, 1.0, &bounds, &blockers, 0.25, None, 0.2)
            .expect("gap is wide enough");
        assert!(rect.width > 3.0);
    }

    #[test]
    fn test_grow_respects_aspect_cap() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 5.0);
        // Width is already dominant, so every width step is capped; height
        // is pinned at 5, so width converges to max_aspect * 5 = 20.
        let grown = grow_to_max(Rect::new(50.0, 0.0, 6.0, 5.0), &bounds, &[], Some(4.0));
        assert!((grown.width - 20.0).abs() < 1e-6);
    }
}
