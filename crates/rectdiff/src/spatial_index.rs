//! Spatial indexing for axis-aligned rectangles using R*-trees.
//!
//! Two usage patterns exist in the pipeline: bulk-built append-only indices
//! (obstacles, one grid pass of candidates) and mutable per-layer indices
//! for placements that support remove-then-reinsert when a placement is
//! carved. Both sit behind [`RectIndex`].

use capmesh_core::geometry::Rect;
use rstar::{RTree, RTreeObject, AABB};

/// An entry in a rectangle index. Identity is the `id`; the rectangle is
/// the envelope.
#[derive(Debug, Clone)]
pub struct RectEntry {
    /// Owner identity (placement or obstacle id).
    pub id: u64,
    /// Indexed rectangle.
    pub rect: Rect,
}

impl RectEntry {
    /// Creates an entry.
    pub fn new(id: u64, rect: Rect) -> Self {
        Self { id, rect }
    }
}

impl PartialEq for RectEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl RTreeObject for RectEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.rect.x, self.rect.y],
            [self.rect.max_x(), self.rect.max_y()],
        )
    }
}

/// R*-tree backed rectangle index.
///
/// An index built with [`RectIndex::with_capacity`] enforces its pre-sized
/// capacity: inserting beyond it means the one-insert-per-candidate
/// discipline broke somewhere upstream, and the index panics rather than
/// silently dropping data.
#[derive(Debug, Default)]
pub struct RectIndex {
    tree: RTree<RectEntry>,
    capacity: Option<usize>,
}

impl RectIndex {
    /// Creates an empty, unbounded index.
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            capacity: None,
        }
    }

    /// Creates an empty index that refuses to grow past `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tree: RTree::new(),
            capacity: Some(capacity),
        }
    }

    /// Bulk-loads an append-only index from entries.
    pub fn bulk(entries: Vec<RectEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
            capacity: None,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// True if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Inserts an entry.
    ///
    /// # Panics
    /// Panics if a fixed capacity would be exceeded; that is a logic error,
    /// not a recoverable condition.
    pub fn insert(&mut self, entry: RectEntry) {
        if let Some(cap) = self.capacity {
            assert!(
                self.tree.size() < cap,
                "spatial index capacity {cap} exceeded"
            );
        }
        self.tree.insert(entry);
    }

    /// Removes the entry with the given id and rectangle. Returns the
    /// removed entry if it was present.
    pub fn remove(&mut self, id: u64, rect: Rect) -> Option<RectEntry> {
        self.tree.remove(&RectEntry::new(id, rect))
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// All entries whose rectangle's bounding box intersects the query box.
    pub fn search(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<&RectEntry> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// All entries intersecting the given rectangle's bounding box.
    pub fn search_rect(&self, rect: &Rect) -> Vec<&RectEntry> {
        self.search(rect.x, rect.y, rect.max_x(), rect.max_y())
    }

    /// All entries whose rectangle contains the point.
    pub fn search_point(&self, x: f64, y: f64) -> Vec<&RectEntry> {
        self.search(x, y, x, y)
    }

    /// Iterates all entries.
    pub fn iter(&self) -> impl Iterator<Item = &RectEntry> {
        self.tree.iter()
    }
}

/// One mutable [`RectIndex`] per board layer, kept in lock-step with the
/// placement list by the placement manager.
#[derive(Debug)]
pub struct LayerIndices {
    layers: Vec<RectIndex>,
}

impl LayerIndices {
    /// Creates empty indices for `layer_count` layers.
    pub fn new(layer_count: usize) -> Self {
        Self {
            layers: (0..layer_count).map(|_| RectIndex::new()).collect(),
        }
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// The index for one layer.
    pub fn layer(&self, z: usize) -> &RectIndex {
        &self.layers[z]
    }

    /// Inserts `rect` under `id` on every listed layer.
    pub fn insert(&mut self, id: u64, rect: Rect, z_layers: &[usize]) {
        for &z in z_layers {
            self.layers[z].insert(RectEntry::new(id, rect));
        }
    }

    /// Removes `id` from every listed layer.
    pub fn remove(&mut self, id: u64, rect: Rect, z_layers: &[usize]) {
        for &z in z_layers {
            self.layers[z].remove(id, rect);
        }
    }
}
