//! Candidate seed generation.
//!
//! Two seed families feed the same consumption loop. Grid seeding walks a
//! lattice at the current grid size and keeps every point with at least one
//! free layer, scored by the longest contiguous free Z-span (soft placements
//! ignored for ranking) and by clearance to the nearest hard blocker. Edge
//! seeding runs once after all grid sizes: it recovers narrow gaps the grid
//! can never sample by seeding the uncovered sub-segments of board and
//! blocker edges, found via interval merge/complement per layer.

use std::collections::HashMap;

use capmesh_core::geometry::{distance_point_to_rect_edges, Rect, EPSILON};
use geo::Polygon;

use crate::board::Board;
use crate::placement::PlacementStore;

/// An ephemeral seed point, consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Seed x coordinate.
    pub x: f64,
    /// Seed y coordinate.
    pub y: f64,
    /// Anchor layer of the best contiguous free Z-span at this point.
    pub z: usize,
    /// Distance to the nearest hard blocker or board edge (tie-break).
    pub distance: f64,
    /// Length of the best contiguous free Z-span.
    pub z_span_len: usize,
    /// True for seeds produced by the edge-analysis pass.
    pub is_edge_seed: bool,
}

/// Longest run of `true` in `free`, as `(start, len)`.
fn longest_run(free: &[bool]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut run_start = 0;
    let mut run_len = 0;
    for (i, &f) in free.iter().enumerate() {
        if f {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if best.is_none_or(|(_, l)| run_len > l) {
                best = Some((run_start, run_len));
            }
        } else {
            run_len = 0;
        }
    }
    best
}

/// Longest contiguous run of layers at `(x, y)` free of hard blockers
/// (obstacles and full-stack placements); soft placements are ignored.
pub fn free_span_hard(store: &PlacementStore, x: f64, y: f64) -> Option<(usize, usize)> {
    let free: Vec<bool> = (0..store.layer_count())
        .map(|z| !store.hard_blocked_at(x, y, z))
        .collect();
    longest_run(&free)
}

/// Longest contiguous run of layers at `(x, y)` free of every blocker,
/// soft placements included.
pub fn free_span_all(store: &PlacementStore, x: f64, y: f64) -> Option<(usize, usize)> {
    let free: Vec<bool> = (0..store.layer_count())
        .map(|z| !store.blocked_at(x, y, z))
        .collect();
    longest_run(&free)
}

/// Scores a point into a [`Candidate`], or `None` when every layer is
/// blocked there or the point falls outside the outline.
fn score_point(
    store: &PlacementStore,
    bounds: &Rect,
    outline: Option<&Polygon<f64>>,
    hard_rects: &[Rect],
    x: f64,
    y: f64,
    is_edge_seed: bool,
) -> Option<Candidate> {
    if !bounds.contains_point(x, y) {
        return None;
    }
    if !Board::outline_contains(outline, x, y) {
        return None;
    }
    // Viable only if some layer is free of every blocker.
    if (0..store.layer_count()).all(|z| store.blocked_at(x, y, z)) {
        return None;
    }
    let (start, len) = free_span_hard(store, x, y)?;
    let z = start + len / 2;

    let mut distance = (x - bounds.x)
        .min(bounds.max_x() - x)
        .min(y - bounds.y)
        .min(bounds.max_y() - y);
    for rect in hard_rects {
        distance = distance.min(distance_point_to_rect_edges(x, y, rect));
    }

    Some(Candidate {
        x,
        y,
        z,
        distance,
        z_span_len: len,
        is_edge_seed,
    })
}

/// Quantized dedupe key: two candidates within 1e-6 of each other count as
/// the same location.
fn quantize(x: f64, y: f64) -> (i64, i64) {
    ((x * 1e6).round() as i64, (y * 1e6).round() as i64)
}

/// Sorts candidates into consumption order: longest Z-span first, then
/// farthest from any hard blocker.
fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.z_span_len
            .cmp(&a.z_span_len)
            .then(b.distance.total_cmp(&a.distance))
    });
}

/// Deduplicates by quantized location, keeping the better-scoring candidate.
fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut by_cell: HashMap<(i64, i64), Candidate> = HashMap::new();
    for c in candidates {
        let key = quantize(c.x, c.y);
        match by_cell.get(&key) {
            Some(existing)
                if (existing.z_span_len, existing.distance) >= (c.z_span_len, c.distance) => {}
            _ => {
                by_cell.insert(key, c);
            }
        }
    }
    by_cell.into_values().collect()
}

/// Generates the grid-seeded candidates for one grid size, sorted into
/// consumption order. The outermost lattice row and column are skipped.
pub fn grid_candidates(
    grid_size: f64,
    bounds: &Rect,
    outline: Option<&Polygon<f64>>,
    store: &PlacementStore,
) -> Vec<Candidate> {
    let hard_rects = store.hard_blocker_rects();
    let mut raw = Vec::new();

    let mut y = bounds.y + grid_size;
    while y < bounds.max_y() - EPSILON {
        let mut x = bounds.x + grid_size;
        while x < bounds.max_x() - EPSILON {
            if let Some(c) = score_point(store, bounds, outline, &hard_rects, x, y, false) {
                raw.push(c);
            }
            x += grid_size;
        }
        y += grid_size;
    }

    let mut candidates = dedupe(raw);
    sort_candidates(&mut candidates);
    candidates
}

/// An axis-aligned edge of the board or of a blocker, with its free-side
/// normal.
#[derive(Debug, Clone, Copy)]
struct BlockEdge {
    /// True for horizontal edges (constant y).
    horizontal: bool,
    /// The constant coordinate of the edge line.
    line: f64,
    /// Interval start along the edge direction.
    lo: f64,
    /// Interval end along the edge direction.
    hi: f64,
    /// Sign of the perpendicular direction pointing into free space.
    normal: f64,
}

impl BlockEdge {
    fn len(&self) -> f64 {
        self.hi - self.lo
    }
}

/// The four edges of a rectangle with outward normals.
fn rect_edges(rect: &Rect) -> [BlockEdge; 4] {
    [
        BlockEdge {
            horizontal: true,
            line: rect.y,
            lo: rect.x,
            hi: rect.max_x(),
            normal: -1.0,
        },
        BlockEdge {
            horizontal: true,
            line: rect.max_y(),
            lo: rect.x,
            hi: rect.max_x(),
            normal: 1.0,
        },
        BlockEdge {
            horizontal: false,
            line: rect.x,
            lo: rect.y,
            hi: rect.max_y(),
            normal: -1.0,
        },
        BlockEdge {
            horizontal: false,
            line: rect.max_x(),
            lo: rect.y,
            hi: rect.max_y(),
            normal: 1.0,
        },
    ]
}

/// The four board edges with inward normals.
fn board_edges(bounds: &Rect) -> [BlockEdge; 4] {
    [
        BlockEdge {
            horizontal: true,
            line: bounds.y,
            lo: bounds.x,
            hi: bounds.max_x(),
            normal: 1.0,
        },
        BlockEdge {
            horizontal: true,
            line: bounds.max_y(),
            lo: bounds.x,
            hi: bounds.max_x(),
            normal: -1.0,
        },
        BlockEdge {
            horizontal: false,
            line: bounds.x,
            lo: bounds.y,
            hi: bounds.max_y(),
            normal: 1.0,
        },
        BlockEdge {
            horizontal: false,
            line: bounds.max_x(),
            lo: bounds.y,
            hi: bounds.max_y(),
            normal: -1.0,
        },
    ]
}

/// Merges overlapping or touching intervals in place, returning the merged
/// set sorted by start.
pub fn merge_intervals(mut intervals: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    intervals.retain(|(lo, hi)| hi > lo);
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
    for (lo, hi) in intervals {
        match merged.last_mut() {
            Some((_, last_hi)) if lo <= *last_hi + EPSILON => {
                *last_hi = last_hi.max(hi);
            }
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Complement of `covered` (assumed merged and sorted) within `span`.
pub fn complement_intervals(span: (f64, f64), covered: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut uncovered = Vec::new();
    let mut cursor = span.0;
    for &(lo, hi) in covered {
        if hi <= span.0 || lo >= span.1 {
            continue;
        }
        if lo > cursor + EPSILON {
            uncovered.push((cursor, lo.min(span.1)));
        }
        cursor = cursor.max(hi);
        if cursor >= span.1 {
            break;
        }
    }
    if cursor < span.1 - EPSILON {
        uncovered.push((cursor, span.1));
    }
    uncovered
}

/// Generates edge-analysis seeds: for each layer, the exact uncovered
/// sub-segments of the board's edges and of every co-layer blocker's edges,
/// seeded at the segment midpoint (and quarter points for long segments),
/// inset inward by `inset`. Segments shorter than `min_seg_len` are skipped.
pub fn edge_candidates(
    bounds: &Rect,
    outline: Option<&Polygon<f64>>,
    store: &PlacementStore,
    min_seg_len: f64,
    inset: f64,
) -> Vec<Candidate> {
    let hard_rects = store.hard_blocker_rects();
    let mut raw = Vec::new();

    for z in 0..store.layer_count() {
        let mut blockers: Vec<Rect> = store.obstacles_on_layer(z);
        blockers.extend(
            store
                .placements()
                .iter()
                .filter(|p| p.on_layer(z))
                .map(|p| p.rect),
        );

        let mut edges: Vec<BlockEdge> = board_edges(bounds).to_vec();
        for rect in &blockers {
            edges.extend(rect_edges(rect));
        }

        for (i, edge) in edges.iter().enumerate() {
            // Intervals of this edge's line covered by other co-linear,
            // co-layer edges.
            let covered: Vec<(f64, f64)> = edges
                .iter()
                .enumerate()
                .filter(|(j, other)| {
                    *j != i
                        && other.horizontal == edge.horizontal
                        && (other.line - edge.line).abs() <= EPSILON
                })
                .map(|(_, other)| (other.lo, other.hi))
                .collect();
            let covered = merge_intervals(covered);

            for (lo, hi) in complement_intervals((edge.lo, edge.hi), &covered) {
                let seg_len = hi - lo;
                if seg_len < min_seg_len {
                    continue;
                }
                let mut stations = vec![(lo + hi) / 2.0];
                if seg_len > 8.0 * inset {
                    stations.push(lo + seg_len * 0.25);
                    stations.push(lo + seg_len * 0.75);
                }
                for t in stations {
                    let (x, y) = if edge.horizontal {
                        (t, edge.line + edge.normal * inset)
                    } else {
                        (edge.line + edge.normal * inset, t)
                    };
                    if let Some(c) = score_point(store, bounds, outline, &hard_rects, x, y, true) {
                        raw.push(c);
                    }
                }
            }
        }
    }

    let mut candidates = dedupe(raw);
    sort_candidates(&mut candidates);
    candidates
}
