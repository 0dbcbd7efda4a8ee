//! Text label.

use super::Geometry;
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};

/// A single-line text label anchored at its baseline start.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    /// Baseline origin (left end of the baseline).
    pub position: Point,
    /// Text content.
    pub content: String,
    /// Font size in pixels.
    pub font_size: f64,
}

impl TextLabel {
    /// Default font size.
    pub const DEFAULT_FONT_SIZE: f64 = 20.0;

    /// Average glyph advance as a fraction of the font size.
    const CHAR_WIDTH_FACTOR: f64 = 0.6;

    pub fn new(position: Point, content: impl Into<String>, font_size: f64) -> Self {
        Self {
            position,
            content: content.into(),
            font_size,
        }
    }

    /// Approximate width from character count; no font metrics involved.
    pub fn approximate_width(&self) -> f64 {
        self.content.chars().count() as f64 * self.font_size * Self::CHAR_WIDTH_FACTOR
    }
}

impl Geometry for TextLabel {
    fn bounds(&self) -> Option<Rect> {
        let top = self.position.y - self.font_size;
        Some(Rect::new(
            self.position.x,
            top,
            self.position.x + self.approximate_width(),
            self.position.y,
        ))
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            position: Point::new(self.position.x + dx, self.position.y + dy),
            ..self.clone()
        }
    }

    fn to_path(&self) -> BezPath {
        self.bounds().map(|b| b.to_path(0.1)).unwrap_or_default()
    }
}
