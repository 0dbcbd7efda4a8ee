//! Element definitions for the whiteboard.

mod circle;
mod media;
mod opaque;
mod path;
mod rectangle;
mod text;

pub use circle::Circle;
pub use media::{Media, MediaKind, MediaSource};
pub use opaque::OpaqueElement;
pub use path::{DEFAULT_LINE_WIDTH, PathStroke};
pub use rectangle::Rectangle;
pub use text::TextLabel;

use kurbo::{BezPath, Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for elements.
///
/// Opaque on the wire; locally created elements use UUID v4 strings.
pub type ElementId = String;

/// Generate a fresh element identifier.
pub fn new_element_id() -> ElementId {
    Uuid::new_v4().to_string()
}

/// Serializable color representation (RGBA8), written as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Error returned when a color string is not `#rgb`, `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex color: {0:?}")]
pub struct ParseColorError(pub String);

impl FromStr for HexColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| err())
        };
        match hex.len() {
            3 => Ok(Self::new(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
            6 => Ok(Self::new(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Ok(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for HexColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<Color> for HexColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<HexColor> for Color {
    fn from(color: HexColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Common behaviour of every kind-specific geometry.
pub trait Geometry {
    /// Axis-aligned bounding box, `None` when the geometry is degenerate.
    fn bounds(&self) -> Option<Rect>;

    /// A copy shifted by `(dx, dy)`.
    fn translated(&self, dx: f64, dy: f64) -> Self
    where
        Self: Sized;

    /// Outline used by renderers.
    fn to_path(&self) -> BezPath;
}

/// Kind-specific payload of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Path(PathStroke),
    Text(TextLabel),
    Rectangle(Rectangle),
    Circle(Circle),
    Media(Media),
    /// Received from a peer but not understood here; carried verbatim.
    Opaque(OpaqueElement),
}

impl ElementKind {
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            ElementKind::Path(g) => g.bounds(),
            ElementKind::Text(g) => g.bounds(),
            ElementKind::Rectangle(g) => g.bounds(),
            ElementKind::Circle(g) => g.bounds(),
            ElementKind::Media(g) => g.bounds(),
            ElementKind::Opaque(g) => g.bounds(),
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        match self {
            ElementKind::Path(g) => ElementKind::Path(g.translated(dx, dy)),
            ElementKind::Text(g) => ElementKind::Text(g.translated(dx, dy)),
            ElementKind::Rectangle(g) => ElementKind::Rectangle(g.translated(dx, dy)),
            ElementKind::Circle(g) => ElementKind::Circle(g.translated(dx, dy)),
            ElementKind::Media(g) => ElementKind::Media(g.translated(dx, dy)),
            ElementKind::Opaque(g) => ElementKind::Opaque(g.translated(dx, dy)),
        }
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            ElementKind::Path(g) => g.to_path(),
            ElementKind::Text(g) => g.to_path(),
            ElementKind::Rectangle(g) => g.to_path(),
            ElementKind::Circle(g) => g.to_path(),
            ElementKind::Media(g) => g.to_path(),
            ElementKind::Opaque(g) => g.to_path(),
        }
    }

    /// Wire name of the kind, as the `kind` field carries it.
    pub fn wire_name(&self) -> &str {
        match self {
            ElementKind::Path(_) => "path",
            ElementKind::Text(_) => "text",
            ElementKind::Rectangle(_) | ElementKind::Circle(_) => "shape",
            ElementKind::Media(m) => m.kind.wire_name(),
            ElementKind::Opaque(o) => &o.kind,
        }
    }
}

/// A drawable unit on the whiteboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    /// Foreground color used for stroke, fill or text.
    pub color: HexColor,
    /// Logical last-modified time in epoch milliseconds; the only merge key.
    pub timestamp: i64,
    /// Rotation in degrees around the element origin.
    pub rotation: Option<f64>,
}

impl Element {
    /// Create a new element with a fresh id.
    pub fn new(kind: ElementKind, color: HexColor, timestamp: i64) -> Self {
        Self {
            id: new_element_id(),
            kind,
            color,
            timestamp,
            rotation: None,
        }
    }

    /// Bounding box, `None` for a path with no recorded points or an opaque element.
    pub fn bounds(&self) -> Option<Rect> {
        self.kind.bounds()
    }

    /// Inclusive bounding-box containment.
    pub fn contains_point(&self, point: Point) -> bool {
        match self.bounds() {
            Some(b) => point.x >= b.x0 && point.x <= b.x1 && point.y >= b.y0 && point.y <= b.y1,
            None => false,
        }
    }

    /// Returns a copy with its geometry shifted. The timestamp is left untouched.
    pub fn translate(&self, dx: f64, dy: f64) -> Element {
        Element {
            kind: self.kind.translated(dx, dy),
            ..self.clone()
        }
    }

    /// Stamp a mutation at `now`, keeping timestamps strictly increasing per element.
    pub fn touch(&mut self, now: i64) {
        self.timestamp = now.max(self.timestamp.saturating_add(1));
    }

    /// Builder-style [`Element::touch`].
    pub fn touched(mut self, now: i64) -> Self {
        self.touch(now);
        self
    }

    /// Top-left corner of the bounding box, used as the drag origin.
    pub fn origin(&self) -> Option<Point> {
        self.bounds().map(|b| b.origin())
    }
}
