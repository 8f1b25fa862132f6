//! # capmesh Core
//!
//! Core types and abstractions for the capmesh capacity-mesh generator.
//!
//! This crate provides the foundational pieces shared by the RectDiff solver
//! crate:
//!
//! - **Geometry kernel**: [`Rect`] plus overlap/containment/distance
//!   predicates, [`subtract_rect_2d`] and the directional expansion caps
//! - **Layer mapping**: [`LayerMap`] — layer names ↔ canonical Z indices
//! - **Solver contract**: [`Solver`] — `step`/`solve`/`output`/`visualize`
//!   cooperative stepping, [`SolverOptions`] configuration
//! - **Output types**: [`CapacityMeshNode`], [`MeshOutput`]
//! - **Visualization**: [`Scene`] — render-agnostic debugger scenes
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod error;
pub mod geometry;
pub mod layer;
pub mod result;
pub mod solver;
pub mod visualize;

// Re-exports
pub use error::{Error, Result};
pub use geometry::{
    distance_point_to_rect_edges, gt, gte, lt, lte, max_expand_down, max_expand_left,
    max_expand_right, max_expand_up, subtract_rect_2d, Rect, EPSILON,
};
pub use layer::LayerMap;
pub use result::{CapacityMeshNode, MeshOutput};
pub use solver::{MultiLayerFloor, Solver, SolverOptions, DEFAULT_STEP_LIMIT};
pub use visualize::{Scene, SceneLine, ScenePoint, SceneRect};
