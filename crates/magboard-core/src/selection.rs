//! Selection handles and element manipulation.

use crate::shapes::{Element, ElementId, ElementKind};
use kurbo::{Point, Rect, Vec2};

/// Handle size in canvas pixels.
pub const HANDLE_SIZE: f64 = 8.0;
/// Handle hit tolerance in canvas pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 8.0;
/// Padding between an element and its selection box.
pub const SELECTION_PADDING: f64 = 5.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Position of this corner on `bounds`.
    pub fn of(self, bounds: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(bounds.x0, bounds.y0),
            Corner::TopRight => Point::new(bounds.x1, bounds.y0),
            Corner::BottomLeft => Point::new(bounds.x0, bounds.y1),
            Corner::BottomRight => Point::new(bounds.x1, bounds.y1),
        }
    }

    /// The diagonally opposite corner.
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

/// A resize handle with its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in canvas coordinates.
    pub position: Point,
    pub corner: Corner,
}

impl Handle {
    /// Check if a point hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point.x - self.position.x).abs() <= tolerance && (point.y - self.position.y).abs() <= tolerance
    }
}

/// Whether the element kind can be resized with corner handles.
pub fn is_resizable(element: &Element) -> bool {
    matches!(
        element.kind,
        ElementKind::Rectangle(_) | ElementKind::Circle(_) | ElementKind::Media(_)
    )
}

/// Corner handles of an element; empty for kinds that cannot be resized.
pub fn get_handles(element: &Element) -> Vec<Handle> {
    if !is_resizable(element) {
        return Vec::new();
    }
    let Some(bounds) = element.bounds() else {
        return Vec::new();
    };
    Corner::ALL
        .iter()
        .map(|&corner| Handle {
            position: corner.of(bounds),
            corner,
        })
        .collect()
}

/// Which handle of `element`, if any, is under `point`.
pub fn hit_test_handles(element: &Element, point: Point, tolerance: f64) -> Option<Corner> {
    get_handles(element)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.corner)
}

/// An in-progress pointer manipulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Manipulation {
    /// Dragging an element; `offset` is pointer minus element origin at press.
    Drag { id: ElementId, offset: Vec2 },
    /// Dragging a corner handle.
    Resize { id: ElementId, corner: Corner },
}

impl Manipulation {
    pub fn element_id(&self) -> &ElementId {
        match self {
            Manipulation::Drag { id, .. } | Manipulation::Resize { id, .. } => id,
        }
    }
}

/// Move `element` so its origin sits at `pointer - offset`.
pub fn drag_to(element: &Element, pointer: Point, offset: Vec2) -> Option<Element> {
    let origin = element.origin()?;
    let target = pointer - offset;
    Some(element.translate(target.x - origin.x, target.y - origin.y))
}

/// Resize `element` by dragging `corner` to `pointer`, keeping the opposite
/// corner fixed. Sizes are normalized to be non-negative. A circle takes the
/// distance from its center to the pointer as its new radius.
pub fn resize(element: &Element, corner: Corner, pointer: Point) -> Element {
    let mut resized = element.clone();
    let Some(bounds) = element.bounds() else {
        return resized;
    };
    let anchor = corner.opposite().of(bounds);
    let rect = Rect::from_points(anchor, pointer);

    match &mut resized.kind {
        ElementKind::Rectangle(r) => {
            r.position = rect.origin();
            r.width = rect.width();
            r.height = rect.height();
        }
        ElementKind::Media(m) => {
            m.position = rect.origin();
            m.width = rect.width();
            m.height = rect.height();
        }
        ElementKind::Circle(c) => {
            c.radius = c.center.distance(pointer);
        }
        ElementKind::Path(_) | ElementKind::Text(_) | ElementKind::Opaque(_) => {}
    }
    resized
}
