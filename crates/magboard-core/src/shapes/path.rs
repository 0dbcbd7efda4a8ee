//! Freehand pen/eraser stroke.

use super::Geometry;
use kurbo::{BezPath, Point, Rect};

/// Default stroke width for new pen strokes.
pub const DEFAULT_LINE_WIDTH: f64 = 3.0;

/// A freehand stroke (ordered series of points).
#[derive(Debug, Clone, PartialEq)]
pub struct PathStroke {
    /// Points in drawing order.
    pub points: Vec<Point>,
    /// Stroke width.
    pub line_width: f64,
}

impl PathStroke {
    /// Create a stroke from existing points.
    pub fn new(points: Vec<Point>, line_width: f64) -> Self {
        Self { points, line_width }
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the stroke is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Geometry for PathStroke {
    fn bounds(&self) -> Option<Rect> {
        let first = self.points.first()?;
        let init = Rect::from_points(*first, *first);
        Some(
            self.points
                .iter()
                .skip(1)
                .fold(init, |acc, p| acc.union_pt(*p)),
        )
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
            line_width: self.line_width,
        }
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let Some(first) = self.points.first() else {
            return path;
        };
        path.move_to(*first);
        for point in self.points.iter().skip(1) {
            path.line_to(*point);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_point_bounds_are_degenerate() {
        let stroke = PathStroke::new(vec![Point::new(4.0, 7.0)], 3.0);
        let bounds = stroke.bounds().unwrap();
        assert_eq!(bounds.origin(), Point::new(4.0, 7.0));
        assert_eq!(bounds.area(), 0.0);
    }

    #[test]
    fn test_translate_rewrites_every_point() {
        let stroke = PathStroke::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0)], 3.0);
        let moved = stroke.translated(1.0, 2.0);
        assert_eq!(moved.points, vec![Point::new(1.0, 2.0), Point::new(11.0, 7.0)]);
    }

    #[test]
    fn test_to_path_empty() {
        let stroke = PathStroke::new(Vec::new(), 3.0);
        assert!(stroke.to_path().elements().is_empty());
    }
}
