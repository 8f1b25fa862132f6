//! # CapMesh RectDiff
//!
//! Rectangle-difference capacity mesh generation for the CapMesh engine.
//!
//! This crate converts a board description (bounds, optional outline,
//! layered rectangular obstacles) into a set of non-overlapping,
//! layer-tagged rectangles suitable as capacity mesh nodes for an
//! autorouter.
//!
//! ## Features
//!
//! - Multi-resolution grid seeding, coarse to fine
//! - Greedy five-anchor rectangle expansion with aspect-ratio control
//! - Soft-overlap carving via rectangle difference
//! - Edge-analysis seeding for slivers the grids miss
//! - Per-placement re-expansion and edge-based gap filling
//! - Incremental stepping with progress reporting and scene snapshots
//!
//! ## Quick Start
//!
//! ```rust
//! use capmesh_rectdiff::{Board, Bounds, Obstacle, RectDiffSolver};
//! use capmesh_rectdiff::{Rect, Solver, SolverOptions};
//!
//! // Describe the board: 100 x 80, four layers.
//! let board = Board::new(Bounds::new(0.0, 100.0, 0.0, 80.0), 4, 0.15)
//!     .with_obstacle(Obstacle::on_z_layers(
//!         Rect::new(40.0, 30.0, 20.0, 20.0),
//!         vec![0, 1, 2, 3],
//!     ))
//!     .with_obstacle(Obstacle::on_layers(
//!         Rect::new(10.0, 10.0, 5.0, 5.0),
//!         vec!["top"],
//!     ));
//!
//! // Configure and solve.
//! let mut solver = RectDiffSolver::new(board, SolverOptions::default()).unwrap();
//! solver.solve().unwrap();
//!
//! let output = solver.output();
//! println!(
//!     "{} mesh nodes, coverage {:.1}%",
//!     output.node_count(),
//!     output.coverage(4) * 100.0
//! );
//! ```
//!
//! ## Stepping Manually
//!
//! ```rust
//! use capmesh_rectdiff::{Board, Bounds, RectDiffSolver, Solver, SolverOptions};
//!
//! let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 2, 0.1);
//! let mut solver = RectDiffSolver::new(board, SolverOptions::default()).unwrap();
//!
//! while !solver.solved() {
//!     solver.step();
//!     let scene = solver.visualize();
//!     assert!(!scene.is_empty());
//! }
//! assert_eq!(solver.progress(), 1.0);
//! ```

pub mod board;
pub mod expansion;
pub mod gapfill;
pub mod placement;
pub mod seeding;
pub mod solver;
pub mod spatial_index;

pub use board::{Board, Bounds, Obstacle};
pub use gapfill::{fill_gaps, GapFillConfig};
pub use placement::{Placement, PlacementStore};
pub use seeding::Candidate;
pub use solver::{Phase, RectDiffSolver};
pub use spatial_index::{LayerIndices, RectEntry, RectIndex};

// Core re-exports so downstream users need only this crate.
pub use capmesh_core::geometry::{subtract_rect_2d, Rect, EPSILON};
pub use capmesh_core::layer::LayerMap;
pub use capmesh_core::result::{CapacityMeshNode, MeshOutput};
pub use capmesh_core::solver::{
    MultiLayerFloor, Solver, SolverOptions, DEFAULT_STEP_LIMIT,
};
pub use capmesh_core::visualize::{Scene, SceneLine, ScenePoint, SceneRect};
pub use capmesh_core::{Error, Result};
