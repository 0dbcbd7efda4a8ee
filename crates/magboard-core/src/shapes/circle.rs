//! Circle shape.

use super::Geometry;
use kurbo::{BezPath, Circle as KurboCircle, Point, Rect, Shape as KurboShape};

/// An outlined circle described by its center and radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    /// Center point.
    pub center: Point,
    /// Radius.
    pub radius: f64,
    /// Stroke width.
    pub line_width: f64,
}

impl Circle {
    /// Create a new circle with the default stroke width.
    pub fn new(center: Point, radius: f64) -> Self {
        Self {
            center,
            radius: radius.abs(),
            line_width: super::path::DEFAULT_LINE_WIDTH,
        }
    }

    /// Circle centered on `anchor` passing through `release`.
    pub fn from_drag(anchor: Point, release: Point) -> Self {
        Self::new(anchor, anchor.distance(release))
    }

    /// Set the stroke width.
    pub fn with_line_width(mut self, line_width: f64) -> Self {
        self.line_width = line_width;
        self
    }

    /// Get as a kurbo Circle.
    pub fn as_kurbo(&self) -> KurboCircle {
        KurboCircle::new(self.center, self.radius)
    }
}

impl Geometry for Circle {
    fn bounds(&self) -> Option<Rect> {
        Some(Rect::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.center.x + self.radius,
            self.center.y + self.radius,
        ))
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            center: Point::new(self.center.x + dx, self.center.y + dy),
            ..self.clone()
        }
    }

    fn to_path(&self) -> BezPath {
        self.as_kurbo().to_path(0.1)
    }
}
