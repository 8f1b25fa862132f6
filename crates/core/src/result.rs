//! Mesh output representation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A finalized capacity mesh node: a placed rectangle tagged with the
/// contiguous set of Z layers it is usable on. Read-only once produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CapacityMeshNode {
    /// Stable node identifier (`"cmn_0"`, `"cmn_1"`, ...).
    pub id: String,
    /// Center point `[x, y]` of the node rectangle.
    pub center: [f64; 2],
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
    /// Label of the node's anchor layer (e.g. `"top"`, `"inner1"`).
    pub layer: String,
    /// Sorted, contiguous Z indices this node is valid on.
    pub available_z: Vec<usize>,
}

impl CapacityMeshNode {
    /// True if the node spans more than one layer.
    pub fn is_multi_layer(&self) -> bool {
        self.available_z.len() > 1
    }
}

/// Output of [`output`](crate::solver::Solver::output): the current
/// best-known mesh (a live preview before completion, the finalized list
/// after).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshOutput {
    /// The capacity mesh nodes.
    pub mesh_nodes: Vec<CapacityMeshNode>,
    /// Whether the solver has reached DONE.
    pub solved: bool,
    /// Total board area (single layer).
    pub board_area: f64,
    /// Area covered by mesh nodes, summed over layers.
    pub covered_area: f64,
    /// Steps executed so far.
    pub steps: u64,
}

impl MeshOutput {
    /// Covered fraction of the routable area, per layer-weighted area.
    /// Returns 0 for a zero-area board.
    pub fn coverage(&self, layer_count: usize) -> f64 {
        let total = self.board_area * layer_count as f64;
        if total <= 0.0 {
            return 0.0;
        }
        self.covered_area / total
    }

    /// Number of mesh nodes.
    pub fn node_count(&self) -> usize {
        self.mesh_nodes.len()
    }
}
