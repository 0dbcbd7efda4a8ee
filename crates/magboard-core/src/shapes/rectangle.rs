//! Rectangle shape.

use super::Geometry;
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};

/// An outlined rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    /// Top-left corner position.
    pub position: Point,
    /// Width of the rectangle.
    pub width: f64,
    /// Height of the rectangle.
    pub height: f64,
    /// Stroke width.
    pub line_width: f64,
}

impl Rectangle {
    /// Create a new rectangle with the default stroke width.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
            line_width: super::path::DEFAULT_LINE_WIDTH,
        }
    }

    /// Create a rectangle from two corner points, normalized to a non-negative size.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let min_x = p1.x.min(p2.x);
        let min_y = p1.y.min(p2.y);
        let width = (p2.x - p1.x).abs();
        let height = (p2.y - p1.y).abs();

        Self::new(Point::new(min_x, min_y), width, height)
    }

    /// Set the stroke width.
    pub fn with_line_width(mut self, line_width: f64) -> Self {
        self.line_width = line_width;
        self
    }

    /// Get the rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
        .abs()
    }
}

impl Geometry for Rectangle {
    fn bounds(&self) -> Option<Rect> {
        Some(self.as_rect())
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            position: Point::new(self.position.x + dx, self.position.y + dy),
            ..self.clone()
        }
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
    }
}
