//! Solver contract and configuration.
//!
//! The capacity mesh pipeline is a cooperative-stepping state machine:
//! `step()` advances exactly one unit of work and returns, so an interactive
//! debugger can drive the solve one increment at a time while batch callers
//! loop through [`Solver::solve`]. Calling `step()` after completion is a
//! no-op, and every step leaves the solver's invariants intact.

use crate::result::MeshOutput;
use crate::visualize::Scene;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Safety cap for [`Solver::solve`]. Generous: solves are proportional to
/// candidate count, which is far below this for any sane board.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Minimum size floor for multi-layer placements.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultiLayerFloor {
    /// A placement counts as multi-layer from this many layers up.
    pub min_layers: usize,
    /// Minimum width/height for a multi-layer placement.
    pub size: f64,
}

/// Tunable options for a capacity mesh solve. Defaults derived from the
/// board's `min_trace_width` are applied where a field is `None`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverOptions {
    /// Attempt a multi-layer placement before falling back to single-layer.
    pub prefer_multi_layer: bool,

    /// Initial seed rectangle size as a fraction of the current grid size.
    pub initial_cell_ratio: f64,

    /// Aspect-ratio cap applied during grid-phase expansion. `None` disables.
    pub max_aspect_ratio: Option<f64>,

    /// Explicit grid-size schedule, coarsest first. Derived from the board
    /// dimensions when `None`.
    pub grid_sizes: Option<Vec<f64>>,

    /// Minimum width/height for single-layer placements. Defaults to
    /// `2 * min_trace_width`.
    pub min_single: Option<f64>,

    /// Multi-layer floor. Size defaults to `4 * min_trace_width`.
    pub min_multi_layers: usize,

    /// Minimum width/height for multi-layer placements.
    pub min_multi_size: Option<f64>,

    /// Gap-fill repeat passes after the solve completes. Zero disables
    /// gap filling.
    pub gap_fill_passes: usize,

    /// Maximum opposing-edge distance considered by gap fill. Defaults to
    /// the coarsest grid step.
    pub max_edge_distance: Option<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            prefer_multi_layer: true,
            initial_cell_ratio: 0.25,
            max_aspect_ratio: Some(6.0),
            grid_sizes: None,
            min_single: None,
            min_multi_layers: 2,
            min_multi_size: None,
            gap_fill_passes: 2,
            max_edge_distance: None,
        }
    }
}

impl SolverOptions {
    /// Creates options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether multi-layer placements are attempted first.
    pub fn with_prefer_multi_layer(mut self, prefer: bool) -> Self {
        self.prefer_multi_layer = prefer;
        self
    }

    /// Sets the initial cell ratio.
    pub fn with_initial_cell_ratio(mut self, ratio: f64) -> Self {
        self.initial_cell_ratio = ratio;
        self
    }

    /// Sets (or disables) the expansion aspect-ratio cap.
    pub fn with_max_aspect_ratio(mut self, ratio: Option<f64>) -> Self {
        self.max_aspect_ratio = ratio;
        self
    }

    /// Sets an explicit grid schedule, coarsest first.
    pub fn with_grid_sizes(mut self, sizes: Vec<f64>) -> Self {
        self.grid_sizes = Some(sizes);
        self
    }

    /// Sets the single-layer size floor.
    pub fn with_min_single(mut self, size: f64) -> Self {
        self.min_single = Some(size);
        self
    }

    /// Sets the multi-layer floor.
    pub fn with_min_multi(mut self, min_layers: usize, size: f64) -> Self {
        self.min_multi_layers = min_layers;
        self.min_multi_size = Some(size);
        self
    }

    /// Sets the number of gap-fill passes.
    pub fn with_gap_fill_passes(mut self, passes: usize) -> Self {
        self.gap_fill_passes = passes;
        self
    }

    /// Sets the maximum opposing-edge distance for gap fill.
    pub fn with_max_edge_distance(mut self, distance: f64) -> Self {
        self.max_edge_distance = Some(distance);
        self
    }

    /// Validates option values that cannot be checked by construction.
    pub fn validate(&self) -> Result<()> {
        if self.initial_cell_ratio <= 0.0 {
            return Err(Error::ConfigError(
                "initial_cell_ratio must be positive".into(),
            ));
        }
        if let Some(ratio) = self.max_aspect_ratio {
            if ratio < 1.0 {
                return Err(Error::ConfigError(
                    "max_aspect_ratio must be at least 1".into(),
                ));
            }
        }
        if self.min_multi_layers < 2 {
            return Err(Error::ConfigError(
                "min_multi_layers must be at least 2".into(),
            ));
        }
        if let Some(sizes) = &self.grid_sizes {
            if sizes.is_empty() || sizes.iter().any(|s| *s <= 0.0) {
                return Err(Error::ConfigError(
                    "grid_sizes must be non-empty and positive".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Cooperative-stepping solver contract.
///
/// Construction performs setup and fails fast on configuration errors;
/// afterwards no method returns a geometric error — dead-end candidates are
/// recovered internally.
pub trait Solver {
    /// Advances exactly one unit of work. No-op once solved.
    fn step(&mut self);

    /// True once the solver has reached its terminal state.
    fn solved(&self) -> bool;

    /// Monotonically non-decreasing progress in `[0, 1]`; exactly 1 when
    /// solved.
    fn progress(&self) -> f64;

    /// Current best-known mesh; finalized and idempotent after completion.
    fn output(&self) -> MeshOutput;

    /// Render-agnostic scene describing current state. Must not mutate.
    fn visualize(&self) -> Scene;

    /// Loops [`step`](Self::step) until solved or `max_steps` is exhausted.
    fn solve_with_limit(&mut self, max_steps: usize) -> Result<()> {
        for _ in 0..max_steps {
            if self.solved() {
                return Ok(());
            }
            self.step();
        }
        if self.solved() {
            Ok(())
        } else {
            Err(Error::IterationLimit(max_steps))
        }
    }

    /// Loops to completion with the default safety cap.
    fn solve(&mut self) -> Result<()> {
        self.solve_with_limit(DEFAULT_STEP_LIMIT)
    }
}
