//! Tool system for the whiteboard.

use crate::shapes::{Circle, ElementKind, HexColor, PathStroke, Rectangle};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Eraser strokes are this many times wider than the pen.
const ERASER_WIDTH_FACTOR: f64 = 3.0;

/// New text uses a font size of this many times the line width.
const TEXT_SIZE_FACTOR: f64 = 6.0;

/// Available tools. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Move,
    Pen,
    Eraser,
    Text,
    Rectangle,
    Circle,
}

impl ToolKind {
    /// Tools that create an element from a press-drag-release gesture.
    pub fn is_drawing(self) -> bool {
        matches!(
            self,
            ToolKind::Pen | ToolKind::Eraser | ToolKind::Rectangle | ToolKind::Circle
        )
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    /// Tool is idle, waiting for interaction.
    #[default]
    Idle,
    /// Tool is actively being used.
    Active {
        /// Anchor of the gesture.
        start: Point,
        /// Latest pointer position.
        current: Point,
    },
}

/// Manages the current tool, its gesture state and the drawing style.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the tool.
    pub state: ToolState,
    /// Foreground color for new elements.
    pub color: HexColor,
    /// Stroke width for new elements.
    pub line_width: f64,
    /// Background the eraser paints with.
    pub background: HexColor,
    /// Point buffer of the stroke being drawn.
    points: Vec<Point>,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::default(),
            color: HexColor::black(),
            line_width: crate::shapes::DEFAULT_LINE_WIDTH,
            background: HexColor::white(),
            points: Vec::new(),
        }
    }
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool, abandoning any gesture in progress.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
        self.cancel();
    }

    /// Font size for text created with the current line width.
    pub fn text_font_size(&self) -> f64 {
        self.line_width * TEXT_SIZE_FACTOR
    }

    /// Begin a drawing gesture.
    pub fn begin(&mut self, point: Point) {
        if !self.current_tool.is_drawing() {
            return;
        }
        self.points.clear();
        if matches!(self.current_tool, ToolKind::Pen | ToolKind::Eraser) {
            self.points.push(point);
        }
        self.state = ToolState::Active {
            start: point,
            current: point,
        };
    }

    /// Update the current gesture.
    pub fn update(&mut self, point: Point) {
        if let ToolState::Active { current, .. } = &mut self.state {
            *current = point;
            if matches!(self.current_tool, ToolKind::Pen | ToolKind::Eraser) {
                self.points.push(point);
            }
        }
    }

    /// End the gesture and return the element payload and color it produced.
    pub fn end(&mut self, point: Point) -> Option<(ElementKind, HexColor)> {
        let ToolState::Active { start, .. } = self.state else {
            return None;
        };
        let created = self.create(start, point);
        self.cancel();
        created
    }

    /// Cancel the current gesture.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.points.clear();
    }

    /// Check if a gesture is active.
    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    /// What the gesture would create if released now.
    pub fn preview(&self) -> Option<(ElementKind, HexColor)> {
        match self.state {
            ToolState::Active { start, current } => self.create(start, current),
            ToolState::Idle => None,
        }
    }

    /// Accumulated stroke points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    fn create(&self, start: Point, end: Point) -> Option<(ElementKind, HexColor)> {
        match self.current_tool {
            ToolKind::Pen if !self.points.is_empty() => Some((
                ElementKind::Path(PathStroke::new(self.points.clone(), self.line_width)),
                self.color,
            )),
            ToolKind::Eraser if !self.points.is_empty() => Some((
                ElementKind::Path(PathStroke::new(
                    self.points.clone(),
                    self.line_width * ERASER_WIDTH_FACTOR,
                )),
                self.background,
            )),
            ToolKind::Rectangle => Some((
                ElementKind::Rectangle(
                    Rectangle::from_corners(start, end).with_line_width(self.line_width),
                ),
                self.color,
            )),
            ToolKind::Circle => Some((
                ElementKind::Circle(Circle::from_drag(start, end).with_line_width(self.line_width)),
                self.color,
            )),
            _ => None,
        }
    }
}
