//! The RectDiff phase driver.
//!
//! `GRID → EXPANSION → DONE`, one unit of work per `step()` call. The grid
//! phase consumes one candidate per call, lazily seeding each grid size and
//! running the edge-analysis pass once after the last size. The expansion
//! phase re-expands one placement per call. The driver is an explicit state
//! struct mutated by free functions, never hidden global state.

use std::collections::VecDeque;

use capmesh_core::geometry::Rect;
use capmesh_core::layer::LayerMap;
use capmesh_core::result::{CapacityMeshNode, MeshOutput};
use capmesh_core::solver::{MultiLayerFloor, Solver, SolverOptions};
use capmesh_core::visualize::Scene;
use capmesh_core::Result;
use geo::Polygon;

use crate::board::Board;
use crate::expansion::{expand_rect_from_seed, grow_to_max};
use crate::gapfill::{fill_gaps, GapFillConfig};
use crate::placement::PlacementStore;
use crate::seeding::{edge_candidates, free_span_hard, grid_candidates, Candidate};

/// Solve phases. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Consuming grid/edge candidates, one per step.
    Grid,
    /// Re-expanding committed placements, one per step.
    Expansion,
    /// Terminal; further steps are no-ops.
    Done,
}

/// The RectDiff capacity-mesh solver.
///
/// Construction validates the board and resolves obstacle layers; every
/// later call is infallible. See the [`Solver`] trait for the stepping
/// contract.
#[derive(Debug)]
pub struct RectDiffSolver {
    bounds: Rect,
    outline: Option<Polygon<f64>>,
    layer_map: LayerMap,
    layer_count: usize,

    prefer_multi_layer: bool,
    initial_cell_ratio: f64,
    max_aspect_ratio: Option<f64>,
    min_single: f64,
    min_multi: MultiLayerFloor,
    min_trace_width: f64,
    gap_fill_passes: usize,
    max_edge_distance: f64,

    grid_sizes: Vec<f64>,
    store: PlacementStore,

    phase: Phase,
    grid_index: usize,
    grid_seeded: bool,
    queue: VecDeque<Candidate>,
    seeds_in_grid: usize,
    consumed_seeds_this_grid: usize,
    edge_analysis_done: bool,
    expansion_index: usize,
    steps: u64,
}

impl RectDiffSolver {
    /// Sets up solver state from the board description. Configuration
    /// errors (bad bounds, unknown layer names, out-of-range indices) fail
    /// here and never later.
    pub fn new(mut board: Board, options: SolverOptions) -> Result<Self> {
        board.validate()?;
        options.validate()?;
        let layer_map = board.resolve_layers()?;
        let bounds = board.bounds.as_rect();
        let outline = board.outline_polygon();

        let min_single = options.min_single.unwrap_or(2.0 * board.min_trace_width);
        let min_multi = MultiLayerFloor {
            min_layers: options.min_multi_layers,
            size: options
                .min_multi_size
                .unwrap_or(4.0 * board.min_trace_width),
        };

        let grid_sizes = match options.grid_sizes {
            Some(sizes) => sizes,
            None => derive_grid_sizes(&bounds, min_single),
        };
        let max_edge_distance = options.max_edge_distance.unwrap_or(grid_sizes[0]);

        let store = PlacementStore::new(board.layer_count, min_single, min_multi, &board.obstacles);

        Ok(Self {
            bounds,
            outline,
            layer_map,
            layer_count: board.layer_count,
            prefer_multi_layer: options.prefer_multi_layer,
            initial_cell_ratio: options.initial_cell_ratio,
            max_aspect_ratio: options.max_aspect_ratio,
            min_single,
            min_multi,
            min_trace_width: board.min_trace_width,
            gap_fill_passes: options.gap_fill_passes,
            max_edge_distance,
            grid_sizes,
            store,
            phase: Phase::Grid,
            grid_index: 0,
            grid_seeded: false,
            queue: VecDeque::new(),
            seeds_in_grid: 0,
            consumed_seeds_this_grid: 0,
            edge_analysis_done: false,
            expansion_index: 0,
            steps: 0,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The committed placement count so far.
    pub fn placement_count(&self) -> usize {
        self.store.len()
    }

    /// The placement store, for inspection in tests and debugging.
    pub fn store(&self) -> &PlacementStore {
        &self.store
    }

    /// Grid size governing the current candidates. Edge seeds reuse the
    /// finest grid for their initial cell sizing.
    fn current_grid_size(&self) -> f64 {
        if self.grid_index < self.grid_sizes.len() {
            self.grid_sizes[self.grid_index]
        } else {
            *self.grid_sizes.last().expect("grid schedule is non-empty")
        }
    }
}

/// Derives the multi-resolution grid schedule from the board's larger
/// dimension, halving per step and dropping sizes below `2 * min_single`.
fn derive_grid_sizes(bounds: &Rect, min_single: f64) -> Vec<f64> {
    let max_dim = bounds.width.max(bounds.height);
    let mut sizes: Vec<f64> = [4.0, 8.0, 16.0, 32.0]
        .iter()
        .map(|d| max_dim / d)
        .filter(|s| *s >= 2.0 * min_single)
        .collect();
    if sizes.is_empty() {
        sizes.push(max_dim / 4.0);
    }
    sizes
}

/// One grid-phase step: lazily seed the current candidate list, then
/// consume exactly one candidate.
fn step_grid(state: &mut RectDiffSolver) {
    if !state.grid_seeded {
        if state.grid_index < state.grid_sizes.len() {
            let grid_size = state.grid_sizes[state.grid_index];
            let candidates =
                grid_candidates(grid_size, &state.bounds, state.outline.as_ref(), &state.store);
            log::debug!(
                "grid {} (size {:.3}): {} candidate(s)",
                state.grid_index,
                grid_size,
                candidates.len()
            );
            state.queue = candidates.into();
        } else if !state.edge_analysis_done {
            let inset = (state.current_grid_size() / 4.0).min(state.min_trace_width);
            let candidates = edge_candidates(
                &state.bounds,
                state.outline.as_ref(),
                &state.store,
                state.min_trace_width,
                inset,
            );
            log::debug!("edge analysis: {} candidate(s)", candidates.len());
            state.queue = candidates.into();
            state.edge_analysis_done = true;
        } else {
            enter_expansion(state);
            return;
        }
        state.grid_seeded = true;
        state.seeds_in_grid = state.queue.len();
        state.consumed_seeds_this_grid = 0;
    }

    match state.queue.pop_front() {
        Some(candidate) => {
            state.consumed_seeds_this_grid += 1;
            try_place_candidate(state, &candidate);
        }
        None => {
            if state.grid_index < state.grid_sizes.len() {
                state.grid_index += 1;
            }
            state.grid_seeded = false;
        }
    }
}

/// Attempts a multi-layer placement at the candidate, then falls back to a
/// single-layer attempt. Failure of both simply drops the candidate.
fn try_place_candidate(state: &mut RectDiffSolver, candidate: &Candidate) {
    let placed = if state.prefer_multi_layer {
        try_multi_layer(state, candidate)
    } else {
        None
    };
    let placed = placed.or_else(|| try_single_layer(state, candidate));

    if let Some((rect, z_layers)) = placed {
        state.store.commit(rect, z_layers);
        cull_covered_candidates(state, &rect);
    }
}

/// Multi-layer attempt: the longest contiguous run of layers free of every
/// hard blocker at the seed, if it spans enough layers for the multi floor.
/// Soft placements are ignored both in the span and during expansion; the
/// commit carves whatever the new rect overlaps.
fn try_multi_layer(
    state: &RectDiffSolver,
    candidate: &Candidate,
) -> Option<(Rect, Vec<usize>)> {
    let (start, len) = free_span_hard(&state.store, candidate.x, candidate.y)?;
    if len < state.min_multi.min_layers {
        return None;
    }
    let z_layers: Vec<usize> = (start..start + len).collect();
    // When existing cover already provides every span layer at the seed,
    // re-placing would only churn the store.
    if z_layers
        .iter()
        .all(|&z| state.store.blocked_at(candidate.x, candidate.y, z))
    {
        return None;
    }
    let blockers = state.store.hard_blockers_for_layers(&z_layers);
    let rect = expand_rect_from_seed(
        candidate.x,
        candidate.y,
        state.current_grid_size(),
        &state.bounds,
        &blockers,
        state.initial_cell_ratio,
        state.max_aspect_ratio,
        state.min_multi.size,
    )?;
    Some((rect, z_layers))
}

/// Single-layer attempt at the candidate's anchor layer. The anchor never
/// retargets; a candidate whose anchor has been blocked since seeding is
/// dropped.
fn try_single_layer(
    state: &RectDiffSolver,
    candidate: &Candidate,
) -> Option<(Rect, Vec<usize>)> {
    if state.store.blocked_at(candidate.x, candidate.y, candidate.z) {
        return None;
    }
    let z_layers = vec![candidate.z];
    let blockers = state.store.blockers_for_layers(&z_layers, None);
    let rect = expand_rect_from_seed(
        candidate.x,
        candidate.y,
        state.current_grid_size(),
        &state.bounds,
        &blockers,
        state.initial_cell_ratio,
        state.max_aspect_ratio,
        state.min_single,
    )?;
    Some((rect, z_layers))
}

/// Drops queued candidates whose point the new placement covers and that
/// no longer have any layer free of hard blockers. Points under soft cover
/// stay queued; a later multi-layer attempt may still carve through them.
fn cull_covered_candidates(state: &mut RectDiffSolver, rect: &Rect) {
    let store = &state.store;
    let layer_count = state.layer_count;
    let before = state.queue.len();
    state.queue.retain(|c| {
        !rect.contains_point(c.x, c.y)
            || (0..layer_count).any(|z| !store.hard_blocked_at(c.x, c.y, z))
    });
    let culled = before - state.queue.len();
    if culled > 0 {
        log::debug!("culled {culled} covered candidate(s)");
    }
}

/// Transition into the expansion phase.
fn enter_expansion(state: &mut RectDiffSolver) {
    log::debug!(
        "entering expansion: {} placement(s) to re-expand",
        state.store.len()
    );
    state.phase = Phase::Expansion;
    state.expansion_index = 0;
    if state.store.is_empty() {
        finish(state);
    }
}

/// One expansion-phase step: re-expand a single placement to its maximal
/// extent against current blockers, with no aspect cap.
fn step_expansion(state: &mut RectDiffSolver) {
    if state.expansion_index >= state.store.len() {
        finish(state);
        return;
    }

    let placement = state.store.placements()[state.expansion_index].clone();
    let blockers = state
        .store
        .blockers_for_layers(&placement.z_layers, Some(placement.id));
    let grown = grow_to_max(placement.rect, &state.bounds, &blockers, None);
    if grown != placement.rect {
        state.store.update_rect(placement.id, grown);
    }

    state.expansion_index += 1;
    if state.expansion_index >= state.store.len() {
        finish(state);
    }
}

/// Runs the gap-fill post-pass and enters the terminal phase.
fn finish(state: &mut RectDiffSolver) {
    if state.gap_fill_passes > 0 {
        let placed: Vec<(Rect, Vec<usize>)> = state
            .store
            .placements()
            .iter()
            .map(|p| (p.rect, p.z_layers.clone()))
            .collect();
        let config = GapFillConfig {
            max_edge_distance: state.max_edge_distance,
            min_trace_width: state.min_trace_width,
            passes: state.gap_fill_passes,
        };
        let fills = fill_gaps(&placed, state.store.obstacles(), &config);
        for (rect, z_layers) in fills {
            state.store.commit(rect, z_layers);
        }
    }
    debug_assert!(state.store.invariants_hold());
    state.phase = Phase::Done;
    log::debug!(
        "solve complete after {} step(s): {} mesh node(s)",
        state.steps,
        state.store.len()
    );
}

impl Solver for RectDiffSolver {
    fn step(&mut self) {
        match self.phase {
            Phase::Grid => {
                self.steps += 1;
                step_grid(self);
            }
            Phase::Expansion => {
                self.steps += 1;
                step_expansion(self);
            }
            Phase::Done => {}
        }
    }

    fn solved(&self) -> bool {
        self.phase == Phase::Done
    }

    fn progress(&self) -> f64 {
        // One slice per grid size plus a final slice shared by the edge
        // pass (first half) and the expansion pass (second half).
        let grids = self.grid_sizes.len();
        let slices = grids as f64 + 1.0;
        let seed_frac = if self.grid_seeded && self.seeds_in_grid > 0 {
            self.consumed_seeds_this_grid as f64 / self.seeds_in_grid as f64
        } else {
            0.0
        };
        match self.phase {
            Phase::Done => 1.0,
            Phase::Grid if self.grid_index < grids => {
                ((self.grid_index as f64 + seed_frac) / slices).min(grids as f64 / slices)
            }
            Phase::Grid => {
                let edge_frac = if self.grid_seeded {
                    seed_frac
                } else if self.edge_analysis_done {
                    1.0
                } else {
                    0.0
                };
                (grids as f64 + 0.5 * edge_frac) / slices
            }
            Phase::Expansion => {
                let frac = if self.store.len() > 0 {
                    self.expansion_index as f64 / self.store.len() as f64
                } else {
                    1.0
                };
                ((grids as f64 + 0.5 + 0.5 * frac) / slices).min(1.0 - f64::EPSILON)
            }
        }
    }

    fn output(&self) -> MeshOutput {
        let mesh_nodes: Vec<CapacityMeshNode> = self
            .store
            .placements()
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let (cx, cy) = p.rect.center();
                CapacityMeshNode {
                    id: format!("cmn_{i}"),
                    center: [cx, cy],
                    width: p.rect.width,
                    height: p.rect.height,
                    layer: self.layer_map.label_for(p.z_layers[0]),
                    available_z: p.z_layers.clone(),
                }
            })
            .collect();
        let covered_area = self
            .store
            .placements()
            .iter()
            .map(|p| p.rect.area() * p.z_layers.len() as f64)
            .sum();

        MeshOutput {
            mesh_nodes,
            solved: self.solved(),
            board_area: self.bounds.area(),
            covered_area,
            steps: self.steps,
        }
    }

    fn visualize(&self) -> Scene {
        let mut scene = Scene::new(match self.phase {
            Phase::Grid => "grid",
            Phase::Expansion => "expansion",
            Phase::Done => "done",
        });

        scene.push_line(
            vec![
                (self.bounds.x, self.bounds.y),
                (self.bounds.max_x(), self.bounds.y),
                (self.bounds.max_x(), self.bounds.max_y()),
                (self.bounds.x, self.bounds.max_y()),
                (self.bounds.x, self.bounds.y),
            ],
            Some("bounds".into()),
        );

        for (rect, z_layers) in self.store.obstacles() {
            scene.push_rect(
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                Some(format!("obstacle z{:?}", z_layers)),
                z_layers.first().copied(),
            );
        }
        for placement in self.store.placements() {
            scene.push_rect(
                placement.rect.x,
                placement.rect.y,
                placement.rect.width,
                placement.rect.height,
                Some(format!("p{} z{:?}", placement.id, placement.z_layers)),
                placement.z_layers.first().copied(),
            );
        }
        for candidate in &self.queue {
            scene.push_point(candidate.x, candidate.y, None, Some(candidate.z));
        }

        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Bounds, Obstacle};

    fn board_10x10(layer_count: usize) -> Board {
        Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), layer_count, 0.1)
    }

    #[test]
    fn test_phases_advance_in_order() {
        let mut solver = RectDiffSolver::new(board_10x10(1), SolverOptions::default()).unwrap();
        assert_eq!(solver.phase(), Phase::Grid);
        solver.solve().unwrap();
        assert_eq!(solver.phase(), Phase::Done);
        assert!(solver.solved());
    }

    #[test]
    fn test_step_after_done_is_noop() {
        let mut solver = RectDiffSolver::new(board_10x10(1), SolverOptions::default()).unwrap();
        solver.solve().unwrap();
        let steps = solver.output().steps;
        let nodes = solver.output().mesh_nodes;
        solver.step();
        solver.step();
        assert_eq!(solver.output().steps, steps);
        assert_eq!(solver.output().mesh_nodes, nodes);
    }

    #[test]
    fn test_invariants_after_every_step() {
        let board = board_10x10(2)
            .with_obstacle(Obstacle::on_z_layers(Rect::new(2.0, 2.0, 3.0, 2.0), vec![0]))
            .with_obstacle(Obstacle::on_z_layers(Rect::new(6.0, 5.0, 2.0, 3.0), vec![1]));
        let mut solver = RectDiffSolver::new(board, SolverOptions::default()).unwrap();
        let mut guard = 0;
        while !solver.solved() {
            solver.step();
            assert!(solver.store().invariants_hold());
            guard += 1;
            assert!(guard < 100_000, "solve failed to terminate");
        }
    }

    fn candidate_at(x: f64, y: f64, z: usize, z_span_len: usize) -> Candidate {
        Candidate {
            x,
            y,
            z,
            distance: 1.0,
            z_span_len,
            is_edge_seed: false,
        }
    }

    #[test]
    fn test_multi_layer_attempt_grows_over_soft_cover() {
        let mut solver = RectDiffSolver::new(board_10x10(2), SolverOptions::default()).unwrap();
        // Single-layer cover on layer 1; the hard span still spans both
        // layers, so a multi-layer attempt must succeed and overlap it.
        solver.store.commit(Rect::new(0.0, 0.0, 10.0, 10.0), vec![1]);

        let (rect, z_layers) =
            try_multi_layer(&solver, &candidate_at(5.0, 5.0, 0, 2)).expect("multi attempt");
        assert_eq!(z_layers, vec![0, 1]);
        assert!((rect.area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_layer_attempt_stays_on_anchor() {
        let mut solver = RectDiffSolver::new(board_10x10(2), SolverOptions::default()).unwrap();
        solver.store.commit(Rect::new(0.0, 0.0, 10.0, 10.0), vec![1]);

        // Layer 0 is wide open, but the attempt must not retarget to it.
        assert!(try_single_layer(&solver, &candidate_at(5.0, 5.0, 1, 2)).is_none());
    }

    #[test]
    fn test_progress_is_monotone_and_ends_at_one() {
        let board = board_10x10(2)
            .with_obstacle(Obstacle::on_z_layers(Rect::new(4.0, 4.0, 2.0, 2.0), vec![0, 1]));
        let mut solver = RectDiffSolver::new(board, SolverOptions::default()).unwrap();
        let mut last = solver.progress();
        assert!(last >= 0.0);
        while !solver.solved() {
            solver.step();
            let p = solver.progress();
            assert!(p >= last, "progress regressed: {p} < {last}");
            assert!(p <= 1.0);
            last = p;
        }
        assert_eq!(solver.progress(), 1.0);
    }

    #[test]
    fn test_edge_pass_fills_its_share_of_the_final_slice() {
        let mut solver = RectDiffSolver::new(board_10x10(2), SolverOptions::default()).unwrap();
        while solver.phase() == Phase::Grid {
            solver.step();
        }
        assert_eq!(solver.phase(), Phase::Expansion);
        let slices = solver.grid_sizes.len() as f64 + 1.0;
        let expected = (solver.grid_sizes.len() as f64 + 0.5) / slices;
        assert!(solver.progress() >= expected - 1e-9);
        assert!(solver.progress() < 1.0);
    }

    #[test]
    fn test_visualize_does_not_mutate() {
        let mut solver = RectDiffSolver::new(board_10x10(1), SolverOptions::default()).unwrap();
        for _ in 0..3 {
            solver.step();
        }
        let before = solver.output();
        let scene = solver.visualize();
        assert!(!scene.is_empty());
        let after = solver.output();
        assert_eq!(before.mesh_nodes, after.mesh_nodes);
        assert_eq!(before.steps, after.steps);
    }

    #[test]
    fn test_config_errors_fail_at_setup() {
        let bad_bounds = Board::new(Bounds::new(0.0, 0.0, 0.0, 10.0), 1, 0.1);
        assert!(RectDiffSolver::new(bad_bounds, SolverOptions::default()).is_err());

        let bad_layer = board_10x10(2).with_obstacle(Obstacle::on_z_layers(
            Rect::new(1.0, 1.0, 1.0, 1.0),
            vec![7],
        ));
        assert!(RectDiffSolver::new(bad_layer, SolverOptions::default()).is_err());
    }

    #[test]
    fn test_derived_grid_schedule_is_coarse_to_fine() {
        let solver = RectDiffSolver::new(board_10x10(1), SolverOptions::default()).unwrap();
        assert!(!solver.grid_sizes.is_empty());
        for pair in solver.grid_sizes.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }
}
