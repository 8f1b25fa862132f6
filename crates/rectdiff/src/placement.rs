//! Placement manager: the placement list and its per-layer spatial indices.
//!
//! The list and the indices must stay synchronized on every insert and
//! remove, so both live behind [`PlacementStore`] and every mutator updates
//! them together. Nothing outside this module touches either directly.

use capmesh_core::geometry::{subtract_rect_2d, Rect, EPSILON};
use capmesh_core::solver::MultiLayerFloor;

use crate::board::Obstacle;
use crate::spatial_index::LayerIndices;

/// A committed mesh rectangle. "Hard" (full-stack) placements span every
/// layer and are immutable once placed; "soft" placements may be carved by
/// later, overlapping placements.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Stable identity, unique within one store.
    pub id: u64,
    /// Placed rectangle.
    pub rect: Rect,
    /// Sorted Z indices the placement spans.
    pub z_layers: Vec<usize>,
}

impl Placement {
    /// True if the placement spans every layer of the board.
    pub fn is_full_stack(&self, layer_count: usize) -> bool {
        self.z_layers.len() == layer_count
    }

    /// True if the placement occupies the given layer.
    pub fn on_layer(&self, z: usize) -> bool {
        self.z_layers.binary_search(&z).is_ok()
    }
}

/// Splits a sorted layer set into its contiguous runs.
pub(crate) fn contiguous_runs(z_layers: &[usize]) -> Vec<Vec<usize>> {
    let mut runs: Vec<Vec<usize>> = Vec::new();
    for &z in z_layers {
        match runs.last_mut() {
            Some(run) if z > 0 && run.last() == Some(&(z - 1)) => run.push(z),
            _ => runs.push(vec![z]),
        }
    }
    runs
}

/// Sole owner of the placement list, the per-layer placement indices and
/// the (immutable) obstacle indices.
#[derive(Debug)]
pub struct PlacementStore {
    layer_count: usize,
    min_single: f64,
    min_multi: MultiLayerFloor,
    next_id: u64,
    placements: Vec<Placement>,
    placement_indices: LayerIndices,
    obstacles: Vec<(Rect, Vec<usize>)>,
    obstacle_indices: LayerIndices,
}

impl PlacementStore {
    /// Creates a store over resolved obstacles.
    pub fn new(
        layer_count: usize,
        min_single: f64,
        min_multi: MultiLayerFloor,
        obstacles: &[Obstacle],
    ) -> Self {
        let mut obstacle_indices = LayerIndices::new(layer_count);
        let mut obstacle_rects = Vec::with_capacity(obstacles.len());
        for (i, obstacle) in obstacles.iter().enumerate() {
            let zs = obstacle.resolved_z_layers().to_vec();
            obstacle_indices.insert(i as u64, obstacle.rect, &zs);
            obstacle_rects.push((obstacle.rect, zs));
        }
        Self {
            layer_count,
            min_single,
            min_multi,
            next_id: 0,
            placements: Vec::new(),
            placement_indices: LayerIndices::new(layer_count),
            obstacles: obstacle_rects,
            obstacle_indices,
        }
    }

    /// Number of layers the store was built for.
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// The committed placements, in commit order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Number of committed placements.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// True if nothing has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Size floor for a placement spanning `n_layers`.
    pub fn floor_for(&self, n_layers: usize) -> f64 {
        if n_layers >= self.min_multi.min_layers {
            self.min_multi.size
        } else {
            self.min_single
        }
    }

    /// Commits a placement and carves any conflicting soft placements, so
    /// the no-same-layer-overlap invariant holds when this returns.
    pub fn commit(&mut self, rect: Rect, mut z_layers: Vec<usize>) -> u64 {
        z_layers.sort_unstable();
        z_layers.dedup();
        debug_assert!(
            z_layers.iter().all(|&z| z < self.layer_count),
            "placement layer out of range"
        );
        debug_assert!(
            !self.overlaps_obstacle(&rect, &z_layers),
            "placement overlaps an obstacle on a shared layer"
        );

        let id = self.push_raw(rect, z_layers);
        self.carve_soft_overlaps(id);
        debug_assert!(self.invariants_hold());
        id
    }

    /// Appends without carving. Used for carve remainders, which cannot
    /// conflict by construction.
    fn push_raw(&mut self, rect: Rect, z_layers: Vec<usize>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.placement_indices.insert(id, rect, &z_layers);
        self.placements.push(Placement { id, rect, z_layers });
        id
    }

    /// Removes a placement from the list and every index it spans.
    fn remove_raw(&mut self, id: u64) -> Option<Placement> {
        let pos = self.placements.iter().position(|p| p.id == id)?;
        let placement = self.placements.remove(pos);
        self.placement_indices
            .remove(placement.id, placement.rect, &placement.z_layers);
        Some(placement)
    }

    /// Carves every existing soft placement that shares a layer with the
    /// newcomer and geometrically overlaps it.
    fn carve_soft_overlaps(&mut self, new_id: u64) {
        let newcomer = self
            .placements
            .iter()
            .find(|p| p.id == new_id)
            .expect("newcomer just committed")
            .clone();

        let mut victim_ids: Vec<u64> = Vec::new();
        for &z in &newcomer.z_layers {
            for entry in self.placement_indices.layer(z).search_rect(&newcomer.rect) {
                if entry.id != new_id && !victim_ids.contains(&entry.id) {
                    victim_ids.push(entry.id);
                }
            }
        }

        let mut carved = 0_usize;
        for victim_id in victim_ids {
            let Some(victim) = self.placements.iter().find(|p| p.id == victim_id) else {
                continue;
            };
            if victim.is_full_stack(self.layer_count) {
                continue;
            }
            if !victim.rect.overlaps(&newcomer.rect) {
                continue;
            }
            let shared: Vec<usize> = victim
                .z_layers
                .iter()
                .copied()
                .filter(|z| newcomer.z_layers.contains(z))
                .collect();
            if shared.is_empty() {
                continue;
            }

            let victim = self.remove_raw(victim_id).expect("victim present");
            carved += 1;

            // Layers the newcomer does not occupy keep the original rect.
            // A newcomer in the middle of the victim's span can leave a
            // non-contiguous remainder, so re-add one placement per run.
            let unshared: Vec<usize> = victim
                .z_layers
                .iter()
                .copied()
                .filter(|z| !newcomer.z_layers.contains(z))
                .collect();
            for run in contiguous_runs(&unshared) {
                self.push_raw(victim.rect, run);
            }

            // Shared layers keep the remainder pieces that still meet the
            // floor; smaller slivers are unrecoverable and dropped.
            let floor = self.floor_for(shared.len());
            for piece in subtract_rect_2d(&victim.rect, &newcomer.rect) {
                if piece.width >= floor - EPSILON && piece.height >= floor - EPSILON {
                    self.push_raw(piece, shared.clone());
                }
            }
        }

        if carved > 0 {
            log::debug!("carved {carved} soft placement(s) around placement {new_id}");
        }
    }

    /// Replaces a placement's rectangle, keeping list and indices in step.
    /// Used by the expansion phase, which only grows rects into free space.
    pub fn update_rect(&mut self, id: u64, rect: Rect) {
        if let Some(pos) = self.placements.iter().position(|p| p.id == id) {
            let old = self.placements[pos].rect;
            let zs = self.placements[pos].z_layers.clone();
            self.placement_indices.remove(id, old, &zs);
            self.placements[pos].rect = rect;
            self.placement_indices.insert(id, rect, &zs);
        }
    }

    /// True if any obstacle or placement covers the point on layer `z`.
    pub fn blocked_at(&self, x: f64, y: f64, z: usize) -> bool {
        self.obstacle_indices
            .layer(z)
            .search_point(x, y)
            .iter()
            .any(|e| e.rect.contains_point(x, y))
            || self
                .placement_indices
                .layer(z)
                .search_point(x, y)
                .iter()
                .any(|e| e.rect.contains_point(x, y))
    }

    /// True if an obstacle or a full-stack placement covers the point on
    /// layer `z`. Soft placements do not count; the Z-span ranking ignores
    /// them.
    pub fn hard_blocked_at(&self, x: f64, y: f64, z: usize) -> bool {
        if self
            .obstacle_indices
            .layer(z)
            .search_point(x, y)
            .iter()
            .any(|e| e.rect.contains_point(x, y))
        {
            return true;
        }
        self.placement_indices
            .layer(z)
            .search_point(x, y)
            .iter()
            .any(|e| {
                e.rect.contains_point(x, y)
                    && self
                        .placements
                        .iter()
                        .find(|p| p.id == e.id)
                        .is_some_and(|p| p.is_full_stack(self.layer_count))
            })
    }

    /// Every hard blocker rectangle: obstacles plus full-stack placements.
    /// Feeds the candidate distance heuristic.
    pub fn hard_blocker_rects(&self) -> Vec<Rect> {
        let mut rects: Vec<Rect> = self.obstacles.iter().map(|(r, _)| *r).collect();
        rects.extend(
            self.placements
                .iter()
                .filter(|p| p.is_full_stack(self.layer_count))
                .map(|p| p.rect),
        );
        rects
    }

    /// Hard blocker rectangles on any of the given layers: obstacles plus
    /// full-stack placements. Soft placements are left out so a multi-layer
    /// expansion can grow over them and carve them on commit.
    pub fn hard_blockers_for_layers(&self, z_layers: &[usize]) -> Vec<Rect> {
        let mut rects: Vec<Rect> = self
            .obstacles
            .iter()
            .filter(|(_, zs)| zs.iter().any(|z| z_layers.contains(z)))
            .map(|(r, _)| *r)
            .collect();
        rects.extend(
            self.placements
                .iter()
                .filter(|p| p.is_full_stack(self.layer_count))
                .map(|p| p.rect),
        );
        rects
    }

    /// Every blocker rectangle on any of the given layers: obstacles plus
    /// placements, optionally excluding one placement id (so a placement
    /// can be re-expanded against everything but itself).
    pub fn blockers_for_layers(&self, z_layers: &[usize], exclude: Option<u64>) -> Vec<Rect> {
        let mut rects: Vec<Rect> = self
            .obstacles
            .iter()
            .filter(|(_, zs)| zs.iter().any(|z| z_layers.contains(z)))
            .map(|(r, _)| *r)
            .collect();
        rects.extend(
            self.placements
                .iter()
                .filter(|p| Some(p.id) != exclude)
                .filter(|p| p.z_layers.iter().any(|z| z_layers.contains(z)))
                .map(|p| p.rect),
        );
        rects
    }

    /// Obstacle rectangles on one layer.
    pub fn obstacles_on_layer(&self, z: usize) -> Vec<Rect> {
        self.obstacles
            .iter()
            .filter(|(_, zs)| zs.contains(&z))
            .map(|(r, _)| *r)
            .collect()
    }

    /// The resolved obstacles `(rect, z_layers)`.
    pub fn obstacles(&self) -> &[(Rect, Vec<usize>)] {
        &self.obstacles
    }

    /// True if `rect` overlaps any obstacle on any of the given layers.
    pub fn overlaps_obstacle(&self, rect: &Rect, z_layers: &[usize]) -> bool {
        z_layers.iter().any(|&z| {
            self.obstacle_indices
                .layer(z)
                .search_rect(rect)
                .iter()
                .any(|e| e.rect.overlaps(rect))
        })
    }

    /// Checks the core invariants: no two placements sharing a layer
    /// overlap, and no placement overlaps an obstacle on a shared layer.
    /// Exposed for tests and debug assertions.
    pub fn invariants_hold(&self) -> bool {
        for (i, a) in self.placements.iter().enumerate() {
            if self.overlaps_obstacle(&a.rect, &a.z_layers) {
                return false;
            }
            for b in self.placements.iter().skip(i + 1) {
                let share = a.z_layers.iter().any(|z| b.on_layer(*z));
                if share && a.rect.overlaps(&b.rect) {
                    return false;
                }
            }
        }
        true
    }
}
