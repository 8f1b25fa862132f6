//! Board description input model.

use capmesh_core::geometry::Rect;
use capmesh_core::layer::LayerMap;
use capmesh_core::{Error, Result};
use geo::{Contains, Coord, LineString, Point, Polygon};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Board rectangle, immutable for the solver's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    /// Minimum x.
    pub min_x: f64,
    /// Maximum x.
    pub max_x: f64,
    /// Minimum y.
    pub min_y: f64,
    /// Maximum y.
    pub max_y: f64,
}

impl Bounds {
    /// Creates bounds from the four extremes.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Horizontal extent.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// The bounds as a [`Rect`].
    pub fn as_rect(&self) -> Rect {
        Rect::from_corners(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// A rectangular obstacle occupying one or more layers.
///
/// Layers are given either as explicit Z indices or as layer names; names
/// are resolved to indices once per solve and the result is cached back
/// onto the obstacle, idempotently.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Obstacle {
    /// Obstacle footprint (curved shapes are bounding-boxed upstream).
    pub rect: Rect,
    /// Explicit Z indices. Filled in by [`Obstacle::resolve`] when layer
    /// names were given instead.
    pub z_layers: Option<Vec<usize>>,
    /// Layer names, resolved via [`LayerMap`].
    pub layers: Option<Vec<String>>,
}

impl Obstacle {
    /// Creates an obstacle on explicit Z indices.
    pub fn on_z_layers(rect: Rect, z_layers: Vec<usize>) -> Self {
        Self {
            rect,
            z_layers: Some(z_layers),
            layers: None,
        }
    }

    /// Creates an obstacle on named layers.
    pub fn on_layers(rect: Rect, layers: Vec<impl Into<String>>) -> Self {
        Self {
            rect,
            z_layers: None,
            layers: Some(layers.into_iter().map(Into::into).collect()),
        }
    }

    /// Resolves layer names to Z indices, caching the result. Calling again
    /// is a no-op. Indices are validated against the stack; out-of-range is
    /// an error, never a clamp.
    pub fn resolve(&mut self, map: &LayerMap) -> Result<&[usize]> {
        if self.z_layers.is_none() {
            let names = self.layers.as_deref().ok_or_else(|| {
                Error::InvalidBoard("obstacle specifies neither z_layers nor layer names".into())
            })?;
            let mut zs = Vec::with_capacity(names.len());
            for name in names {
                zs.push(map.resolve(name)?);
            }
            self.z_layers = Some(zs);
        }

        let zs = self.z_layers.as_mut().expect("just filled");
        for &z in zs.iter() {
            map.check_index(z)?;
        }
        zs.sort_unstable();
        zs.dedup();
        Ok(zs)
    }

    /// The resolved Z indices. Panics if [`Obstacle::resolve`] has not run.
    pub fn resolved_z_layers(&self) -> &[usize] {
        self.z_layers
            .as_deref()
            .expect("obstacle layers not resolved")
    }
}

/// Full board description consumed by the solver.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Board {
    /// Outer bounds.
    pub bounds: Bounds,
    /// Optional outline polygon; candidates outside it are rejected.
    pub outline: Option<Vec<(f64, f64)>>,
    /// Number of layers in the stack.
    pub layer_count: usize,
    /// Minimum trace width; drives the placement size floors and the
    /// smallest gap worth filling.
    pub min_trace_width: f64,
    /// Rectangular obstacles.
    pub obstacles: Vec<Obstacle>,
}

impl Board {
    /// Creates a board with no obstacles and no outline.
    pub fn new(bounds: Bounds, layer_count: usize, min_trace_width: f64) -> Self {
        Self {
            bounds,
            outline: None,
            layer_count,
            min_trace_width,
            obstacles: Vec::new(),
        }
    }

    /// Sets the outline polygon.
    pub fn with_outline(mut self, outline: Vec<(f64, f64)>) -> Self {
        self.outline = Some(outline);
        self
    }

    /// Adds an obstacle.
    pub fn with_obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    /// Validates static configuration. Fails fast; never clamps.
    pub fn validate(&self) -> Result<()> {
        if self.layer_count == 0 {
            return Err(Error::InvalidBoard("layer_count must be at least 1".into()));
        }
        if self.bounds.width() <= 0.0 || self.bounds.height() <= 0.0 {
            return Err(Error::InvalidBoard(format!(
                "zero-area bounds: {:.6} x {:.6}",
                self.bounds.width(),
                self.bounds.height()
            )));
        }
        if self.min_trace_width <= 0.0 {
            return Err(Error::InvalidBoard(
                "min_trace_width must be positive".into(),
            ));
        }
        if let Some(outline) = &self.outline {
            if outline.len() < 3 {
                return Err(Error::InvalidBoard(
                    "outline polygon needs at least 3 vertices".into(),
                ));
            }
        }
        Ok(())
    }

    /// Builds the layer map from every layer name referenced by obstacles,
    /// then resolves each obstacle's layers against it.
    pub fn resolve_layers(&mut self) -> Result<LayerMap> {
        let names: Vec<String> = self
            .obstacles
            .iter()
            .filter_map(|o| o.layers.as_ref())
            .flatten()
            .cloned()
            .collect();
        let map = LayerMap::new(self.layer_count, names)?;
        for obstacle in &mut self.obstacles {
            obstacle.resolve(&map)?;
        }
        Ok(map)
    }

    /// Builds the outline as a `geo` polygon for containment tests.
    pub fn outline_polygon(&self) -> Option<Polygon<f64>> {
        let outline = self.outline.as_ref()?;
        let coords: Vec<Coord<f64>> = outline.iter().map(|&(x, y)| Coord { x, y }).collect();
        Some(Polygon::new(LineString::from(coords), vec![]))
    }

    /// True if the point is inside the outline (or there is no outline).
    pub fn outline_contains(outline: Option<&Polygon<f64>>, x: f64, y: f64) -> bool {
        match outline {
            Some(poly) => poly.contains(&Point::new(x, y)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_boards() {
        let good = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 2, 0.1);
        assert!(good.validate().is_ok());

        let zero_area = Board::new(Bounds::new(0.0, 0.0, 0.0, 10.0), 2, 0.1);
        assert!(zero_area.validate().is_err());

        let no_layers = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 0, 0.1);
        assert!(no_layers.validate().is_err());

        let bad_trace = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 2, 0.0);
        assert!(bad_trace.validate().is_err());
    }

    #[test]
    fn test_obstacle_name_resolution_is_cached() {
        let mut board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 2, 0.1).with_obstacle(
            Obstacle::on_layers(Rect::new(1.0, 1.0, 2.0, 2.0), vec!["bottom", "top"]),
        );
        let map = board.resolve_layers().unwrap();
        assert_eq!(board.obstacles[0].resolved_z_layers(), &[0, 1]);

        // Second resolve is a no-op.
        board.obstacles[0].resolve(&map).unwrap();
        assert_eq!(board.obstacles[0].resolved_z_layers(), &[0, 1]);
    }

    #[test]
    fn test_sole_inner_name_resolves_to_its_own_index() {
        let mut board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 4, 0.1).with_obstacle(
            Obstacle::on_layers(Rect::new(1.0, 1.0, 2.0, 2.0), vec!["inner2"]),
        );
        board.resolve_layers().unwrap();
        assert_eq!(board.obstacles[0].resolved_z_layers(), &[2]);
    }

    #[test]
    fn test_out_of_range_z_layer_is_rejected() {
        let mut board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 2, 0.1).with_obstacle(
            Obstacle::on_z_layers(Rect::new(1.0, 1.0, 2.0, 2.0), vec![0, 5]),
        );
        assert!(board.resolve_layers().is_err());
    }

    #[test]
    fn test_outline_containment() {
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 1, 0.1)
            .with_outline(vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]);
        let poly = board.outline_polygon();
        assert!(Board::outline_contains(poly.as_ref(), 5.0, 2.0));
        assert!(!Board::outline_contains(poly.as_ref(), 0.5, 9.0));
        assert!(Board::outline_contains(None, -100.0, -100.0));
    }
}
