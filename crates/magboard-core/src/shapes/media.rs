//! Media placeholders (image, video, document) referencing external files.

use super::Geometry;
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};

/// Which kind of media the placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Document => "pdf",
        }
    }

    /// Glyph drawn in the middle of the placeholder.
    pub fn icon(self) -> &'static str {
        match self {
            MediaKind::Image => "🖼",
            MediaKind::Video => "▶",
            MediaKind::Document => "📄",
        }
    }
}

/// Reference to the external file a placeholder stands for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSource {
    pub url: Option<String>,
    pub name: Option<String>,
    pub file_id: Option<String>,
}

/// A rectangular media placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub kind: MediaKind,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub source: MediaSource,
}

impl Media {
    pub const DEFAULT_WIDTH: f64 = 200.0;
    pub const DEFAULT_HEIGHT: f64 = 150.0;
    pub const DEFAULT_POSITION: Point = Point::new(50.0, 50.0);

    /// Placeholder at the default position and size.
    pub fn new(kind: MediaKind, source: MediaSource) -> Self {
        Self {
            kind,
            position: Self::DEFAULT_POSITION,
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            source,
        }
    }

    /// Get the bounding rectangle.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
        .abs()
    }

    /// Label drawn under the icon.
    pub fn label(&self) -> &str {
        self.source.name.as_deref().unwrap_or("Media")
    }
}

impl Geometry for Media {
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
