//! Render-agnostic visualization scene.
//!
//! The interactive debugger that drives the solver step-by-step draws
//! whatever `visualize()` hands it. The scene is plain data: named
//! rectangles, points and lines tagged with an optional layer, with no
//! assumptions about the rendering backend.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A labeled rectangle in the scene.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneRect {
    /// Minimum corner x.
    pub x: f64,
    /// Minimum corner y.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
    /// Display label.
    pub label: Option<String>,
    /// Z layer this rectangle belongs to, if layer-specific.
    pub layer: Option<usize>,
}

/// A labeled point in the scene.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScenePoint {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Display label.
    pub label: Option<String>,
    /// Z layer this point belongs to, if layer-specific.
    pub layer: Option<usize>,
}

/// A polyline in the scene.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneLine {
    /// Polyline vertices.
    pub points: Vec<(f64, f64)>,
    /// Display label.
    pub label: Option<String>,
    /// Z layer this line belongs to, if layer-specific.
    pub layer: Option<usize>,
}

/// A complete scene snapshot for external rendering.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scene {
    /// Scene title (typically the current phase).
    pub title: String,
    /// Rectangles to draw.
    pub rects: Vec<SceneRect>,
    /// Points to draw.
    pub points: Vec<ScenePoint>,
    /// Lines to draw.
    pub lines: Vec<SceneLine>,
}

impl Scene {
    /// Creates an empty scene with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Adds a rectangle.
    pub fn push_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        label: Option<String>,
        layer: Option<usize>,
    ) {
        self.rects.push(SceneRect {
            x,
            y,
            width,
            height,
            label,
            layer,
        });
    }

    /// Adds a point.
    pub fn push_point(&mut self, x: f64, y: f64, label: Option<String>, layer: Option<usize>) {
        self.points.push(ScenePoint { x, y, label, layer });
    }

    /// Adds a polyline.
    pub fn push_line(&mut self, points: Vec<(f64, f64)>, label: Option<String>) {
        self.lines.push(SceneLine {
            points,
            label,
            layer: None,
        });
    }

    /// Total number of drawable objects.
    pub fn len(&self) -> usize {
        self.rects.len() + self.points.len() + self.lines.len()
    }

    /// True if the scene holds nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
