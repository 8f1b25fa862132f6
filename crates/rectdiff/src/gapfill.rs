//! Edge-based gap filling.
//!
//! After the phase driver reaches DONE, residual slivers remain wherever
//! expansion stopped short of an opposing rectangle. This pass extracts
//! every placement and obstacle edge, trims away the portions covered by
//! co-linear neighbor edges, and then, for each surviving edge, searches a
//! padded spatial index for the farthest near-antiparallel co-layer edge
//! whose distance fits the viable gap range. The span between the two edges
//! becomes a new placement when it overlaps nothing.
//!
//! Running more than one pass lets rectangles filled in pass *k* expose new
//! opposing edges for pass *k + 1*, closing chains of adjacent gaps.

use capmesh_core::geometry::{Rect, EPSILON};
use rstar::{RTree, RTreeObject, AABB};

use crate::placement::contiguous_runs;
use crate::seeding::{complement_intervals, merge_intervals};

/// Smallest fill rectangle worth committing.
const MIN_FILL_EXTENT: f64 = 0.01;

/// Candidate normals must satisfy `dot <= -0.9` with the primary's normal.
const ANTIPARALLEL_DOT: f64 = -0.9;

/// Gap-fill tuning.
#[derive(Debug, Clone)]
pub struct GapFillConfig {
    /// Maximum opposing-edge distance considered.
    pub max_edge_distance: f64,
    /// Minimum trace width; the lower bound of a viable gap is
    /// `max(min_trace_width, 0.1)`.
    pub min_trace_width: f64,
    /// Number of repeat passes.
    pub passes: usize,
}

/// One axis-aligned edge with its outward normal and owner layers.
#[derive(Debug, Clone)]
struct GapEdge {
    /// True for horizontal edges (constant y).
    horizontal: bool,
    /// Constant coordinate of the edge line.
    line: f64,
    /// Interval start along the edge direction.
    lo: f64,
    /// Interval end along the edge direction.
    hi: f64,
    /// Outward normal `(nx, ny)`.
    nx: f64,
    ny: f64,
    /// Layers of the owning rectangle.
    z_layers: Vec<usize>,
}

impl GapEdge {
    fn shares_layer(&self, other: &GapEdge) -> bool {
        self.z_layers.iter().any(|z| other.z_layers.contains(z))
    }

    fn shared_layers(&self, other: &GapEdge) -> Vec<usize> {
        let mut zs: Vec<usize> = self
            .z_layers
            .iter()
            .copied()
            .filter(|z| other.z_layers.contains(z))
            .collect();
        zs.sort_unstable();
        zs
    }

    /// Segment bounding box, degenerate on the perpendicular axis.
    fn bbox(&self) -> Rect {
        if self.horizontal {
            Rect::from_corners(self.lo, self.line, self.hi, self.line)
        } else {
            Rect::from_corners(self.line, self.lo, self.line, self.hi)
        }
    }
}

/// Index entry: an edge id plus its padded bounding box.
#[derive(Debug, Clone)]
struct EdgeEntry {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for EdgeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// The four outward-normal edges of a rectangle on its layers.
fn extract_edges(rect: &Rect, z_layers: &[usize], out: &mut Vec<GapEdge>) {
    let zs = z_layers.to_vec();
    out.push(GapEdge {
        horizontal: true,
        line: rect.y,
        lo: rect.x,
        hi: rect.max_x(),
        nx: 0.0,
        ny: -1.0,
        z_layers: zs.clone(),
    });
    out.push(GapEdge {
        horizontal: true,
        line: rect.max_y(),
        lo: rect.x,
        hi: rect.max_x(),
        nx: 0.0,
        ny: 1.0,
        z_layers: zs.clone(),
    });
    out.push(GapEdge {
        horizontal: false,
        line: rect.x,
        lo: rect.y,
        hi: rect.max_y(),
        nx: -1.0,
        ny: 0.0,
        z_layers: zs.clone(),
    });
    out.push(GapEdge {
        horizontal: false,
        line: rect.max_x(),
        lo: rect.y,
        hi: rect.max_y(),
        nx: 1.0,
        ny: 0.0,
        z_layers: zs,
    });
}

/// Replaces every edge with its sub-segments not covered by co-linear,
/// co-layer neighbor edges. Fully covered edges disappear.
fn split_edges(edges: Vec<GapEdge>) -> Vec<GapEdge> {
    let mut split = Vec::with_capacity(edges.len());
    for (i, edge) in edges.iter().enumerate() {
        let covered: Vec<(f64, f64)> = edges
            .iter()
            .enumerate()
            .filter(|(j, other)| {
                *j != i
                    && other.horizontal == edge.horizontal
                    && (other.line - edge.line).abs() <= EPSILON
                    && other.shares_layer(edge)
            })
            .map(|(_, other)| (other.lo, other.hi))
            .collect();
        let covered = merge_intervals(covered);
        for (lo, hi) in complement_intervals((edge.lo, edge.hi), &covered) {
            if hi - lo < MIN_FILL_EXTENT {
                continue;
            }
            split.push(GapEdge {
                lo,
                hi,
                z_layers: edge.z_layers.clone(),
                ..*edge
            });
        }
    }
    split
}

/// The rectangle spanning from `primary` to `candidate` along the shared
/// normal axis and across their common span on the other axis.
fn span_rect(primary: &GapEdge, candidate: &GapEdge) -> Option<Rect> {
    let lo = primary.lo.max(candidate.lo);
    let hi = primary.hi.min(candidate.hi);
    if hi - lo < MIN_FILL_EXTENT {
        return None;
    }
    let near = primary.line.min(candidate.line);
    let far = primary.line.max(candidate.line);
    let rect = if primary.horizontal {
        Rect::from_corners(lo, near, hi, far)
    } else {
        Rect::from_corners(near, lo, far, hi)
    };
    if rect.width < MIN_FILL_EXTENT || rect.height < MIN_FILL_EXTENT {
        return None;
    }
    Some(rect)
}

/// True if `rect` overlaps any of `items` on any of `z_layers`.
fn overlaps_any(rect: &Rect, z_layers: &[usize], items: &[(Rect, Vec<usize>)]) -> bool {
    items.iter().any(|(other, zs)| {
        zs.iter().any(|z| z_layers.contains(z)) && other.overlaps(rect)
    })
}

/// Runs one gap-fill pass over the given placed rectangles and obstacles,
/// returning the rectangles filled this pass.
fn fill_pass(
    placed: &[(Rect, Vec<usize>)],
    obstacles: &[(Rect, Vec<usize>)],
    config: &GapFillConfig,
) -> Vec<(Rect, Vec<usize>)> {
    let mut edges = Vec::with_capacity(4 * (placed.len() + obstacles.len()));
    for (rect, zs) in placed.iter().chain(obstacles) {
        extract_edges(rect, zs, &mut edges);
    }
    let edges = split_edges(edges);
    if edges.is_empty() {
        return Vec::new();
    }

    let pad = config.max_edge_distance;
    let entries: Vec<EdgeEntry> = edges
        .iter()
        .enumerate()
        .map(|(idx, e)| {
            let bbox = e.bbox().padded(pad);
            EdgeEntry {
                idx,
                envelope: AABB::from_corners([bbox.x, bbox.y], [bbox.max_x(), bbox.max_y()]),
            }
        })
        .collect();
    let tree = RTree::bulk_load(entries);

    let min_gap = config.min_trace_width.max(0.1);
    let mut fills: Vec<(Rect, Vec<usize>)> = Vec::new();

    for (i, primary) in edges.iter().enumerate() {
        let probe = primary.bbox().padded(pad);
        let envelope = AABB::from_corners([probe.x, probe.y], [probe.max_x(), probe.max_y()]);

        // Near-antiparallel co-layer edges within the viable gap range,
        // farthest first: the farthest edge yields the largest fill.
        let mut candidates: Vec<(f64, &GapEdge)> = tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| entry.idx != i)
            .map(|entry| &edges[entry.idx])
            .filter(|other| {
                other.nx * primary.nx + other.ny * primary.ny <= ANTIPARALLEL_DOT
                    && other.shares_layer(primary)
            })
            .filter_map(|other| {
                let d = (other.line - primary.line) * (primary.nx + primary.ny);
                (d >= min_gap - EPSILON && d <= config.max_edge_distance + EPSILON)
                    .then_some((d, other))
            })
            .collect();
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (_, candidate) in candidates {
            let Some(rect) = span_rect(primary, candidate) else {
                continue;
            };
            // The shared layer set may have holes (e.g. a full-stack
            // placement facing an obstacle on the outer layers only), so
            // each contiguous run becomes its own fill.
            let shared = primary.shared_layers(candidate);
            let mut committed = false;
            for run in contiguous_runs(&shared) {
                if overlaps_any(&rect, &run, &fills)
                    || overlaps_any(&rect, &run, placed)
                    || overlaps_any(&rect, &run, obstacles)
                {
                    continue;
                }
                fills.push((rect, run));
                committed = true;
            }
            if committed {
                break;
            }
        }
    }

    fills
}

/// Fills residual gaps between placements via opposing-edge analysis.
///
/// Each pass's output becomes additional placed input to the next pass.
/// Returns every rectangle filled across all passes, with its layer set.
pub fn fill_gaps(
    placed: &[(Rect, Vec<usize>)],
    obstacles: &[(Rect, Vec<usize>)],
    config: &GapFillConfig,
) -> Vec<(Rect, Vec<usize>)> {
    let mut all_placed = placed.to_vec();
    let mut all_fills = Vec::new();

    for pass in 0..config.passes {
        let fills = fill_pass(&all_placed, obstacles, config);
        if fills.is_empty() {
            break;
        }
        log::debug!("gap-fill pass {pass}: {} new rectangle(s)", fills.len());
        all_placed.extend(fills.iter().cloned());
        all_fills.extend(fills);
    }

    all_fills
}
