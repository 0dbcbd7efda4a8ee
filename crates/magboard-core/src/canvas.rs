//! Element collection and the interaction surface.

use crate::selection::{self, Corner, HANDLE_HIT_TOLERANCE, Manipulation};
use crate::shapes::{Element, ElementId, ElementKind, Media, MediaKind, MediaSource, TextLabel};
use crate::tools::{ToolKind, ToolManager};
use crate::wire;
use kurbo::Point;
use std::collections::HashMap;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// The ordered elements of one campaign, back to front.
#[derive(Debug, Clone, Default)]
pub struct ElementCollection {
    elements: Vec<Element>,
    /// Undo history stack.
    undo_stack: Vec<Vec<Element>>,
    /// Redo history stack.
    redo_stack: Vec<Vec<Element>>,
}

impl ElementCollection {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, collapsing duplicate ids to their newest copy.
    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self {
            elements: wire::dedupe_by_id(elements),
            ..Self::default()
        }
    }

    /// Elements in paint order (back to front).
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Topmost element whose bounds contain `point`.
    pub fn element_at(&self, point: Point) -> Option<&Element> {
        self.elements.iter().rev().find(|e| e.contains_point(point))
    }

    /// Append an element on top. An element with the same id is replaced instead.
    pub fn push(&mut self, element: Element) {
        if !self.replace(element.clone()) {
            self.elements.push(element);
        }
    }

    /// Replace the element with the same id in place. Returns false if absent.
    pub fn replace(&mut self, element: Element) -> bool {
        match self.elements.iter_mut().find(|e| e.id == element.id) {
            Some(slot) => {
                *slot = element;
                true
            }
            None => false,
        }
    }

    /// Remove an element by id.
    pub fn remove(&mut self, id: &str) -> Option<Element> {
        let index = self.elements.iter().position(|e| e.id == id)?;
        Some(self.elements.remove(index))
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Install a merged collection. Not recorded in the undo history.
    pub fn replace_all(&mut self, elements: Vec<Element>) {
        self.elements = elements;
    }

    /// Push current state to undo stack (call before making changes).
    pub fn push_undo(&mut self) {
        self.undo_stack.push(self.elements.clone());
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last change. Elements that come back changed are stamped at
    /// `now` so the restored version wins the next merge.
    pub fn undo(&mut self, now: i64) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::take(&mut self.elements);
        self.elements = restamp(snapshot, &current, now);
        self.redo_stack.push(current);
        true
    }

    /// Redo the last undone change.
    pub fn redo(&mut self, now: i64) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::take(&mut self.elements);
        self.elements = restamp(snapshot, &current, now);
        self.undo_stack.push(current);
        true
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Serialize the elements to wire JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.elements)
    }

    /// Deserialize wire JSON, skipping undecodable elements.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
        Ok(Self::from_elements(wire::decode_elements(values)))
    }
}

/// Give every element of `restored` that differs from `current` a timestamp
/// newer than both versions.
fn restamp(restored: Vec<Element>, current: &[Element], now: i64) -> Vec<Element> {
    let current: HashMap<&ElementId, &Element> = current.iter().map(|e| (&e.id, e)).collect();
    restored
        .into_iter()
        .map(|mut element| match current.get(&element.id) {
            Some(existing) if same_content(existing, &element) => (*existing).clone(),
            Some(existing) => {
                element.timestamp = element.timestamp.max(existing.timestamp);
                element.touched(now)
            }
            None => {
                element.touch(now);
                element
            }
        })
        .collect()
}

fn same_content(a: &Element, b: &Element) -> bool {
    a.kind == b.kind && a.color == b.color && a.rotation == b.rotation
}

/// What the caller should do after feeding an event to the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceResponse {
    /// Nothing changed.
    None,
    /// Transient state changed; redraw.
    Redraw,
    /// The collection changed; redraw and schedule a save.
    Commit,
    /// Ask the user for text to place at this position.
    TextPrompt(Point),
}

/// Runtime canvas state (not persisted).
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    /// The elements being edited.
    pub document: ElementCollection,
    /// Tool manager.
    pub tool_manager: ToolManager,
    /// Currently selected element.
    pub selection: Option<ElementId>,
    manipulation: Option<Manipulation>,
    /// Whether the current manipulation already pushed an undo state.
    manipulated: bool,
    /// Where confirmed text will be placed.
    pending_text: Option<Point>,
}

impl Canvas {
    /// Create a new canvas with an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a canvas with existing elements.
    pub fn with_elements(elements: Vec<Element>) -> Self {
        Self {
            document: ElementCollection::from_elements(elements),
            ..Self::default()
        }
    }

    /// Change the active tool; any gesture in progress is dropped.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool_manager.set_tool(tool);
        self.manipulation = None;
        self.manipulated = false;
        self.pending_text = None;
    }

    pub fn tool(&self) -> ToolKind {
        self.tool_manager.current_tool
    }

    /// A pointer gesture is in progress.
    pub fn is_gesture_active(&self) -> bool {
        self.manipulation.is_some() || self.tool_manager.is_active()
    }

    /// Element the local user is interacting with, for presence.
    pub fn editing_target(&self) -> Option<ElementId> {
        self.manipulation
            .as_ref()
            .map(|m| m.element_id().clone())
            .or_else(|| self.selection.clone())
    }

    pub fn pending_text(&self) -> Option<Point> {
        self.pending_text
    }

    /// The element the current drawing gesture would create.
    pub fn preview_element(&self) -> Option<Element> {
        let (kind, color) = self.tool_manager.preview()?;
        Some(Element {
            id: String::new(),
            kind,
            color,
            timestamp: 0,
            rotation: None,
        })
    }

    pub fn pointer_down(&mut self, point: Point, _now: i64) -> SurfaceResponse {
        match self.tool() {
            ToolKind::Select | ToolKind::Move => {
                // Select never changes geometry; handles only grab in move mode.
                if self.tool() == ToolKind::Move {
                    if let Some((id, corner)) = self.selection.clone().zip(self.selected_handle_at(point)) {
                        self.begin_manipulation(Manipulation::Resize { id, corner });
                        return SurfaceResponse::Redraw;
                    }
                }

                let hit = self
                    .document
                    .element_at(point)
                    .map(|e| (e.id.clone(), e.origin()));
                match hit {
                    Some((id, origin)) => {
                        self.selection = Some(id.clone());
                        if self.tool() == ToolKind::Move {
                            if let Some(origin) = origin {
                                self.begin_manipulation(Manipulation::Drag {
                                    id,
                                    offset: point - origin,
                                });
                            }
                        }
                    }
                    None => self.selection = None,
                }
                SurfaceResponse::Redraw
            }
            ToolKind::Text => {
                self.pending_text = Some(point);
                SurfaceResponse::TextPrompt(point)
            }
            ToolKind::Pen | ToolKind::Eraser | ToolKind::Rectangle | ToolKind::Circle => {
                self.tool_manager.begin(point);
                SurfaceResponse::Redraw
            }
        }
    }

    pub fn pointer_move(&mut self, point: Point, now: i64) -> SurfaceResponse {
        if let Some(manipulation) = self.manipulation.clone() {
            let Some(current) = self.document.get(manipulation.element_id()).cloned() else {
                // Removed underneath us by a merge.
                self.end_manipulation();
                return SurfaceResponse::Redraw;
            };
            let updated = match manipulation {
                Manipulation::Drag { offset, .. } => selection::drag_to(&current, point, offset),
                Manipulation::Resize { corner, .. } => Some(selection::resize(&current, corner, point)),
            };
            let Some(updated) = updated else {
                return SurfaceResponse::None;
            };
            if updated.kind == current.kind {
                return SurfaceResponse::None;
            }
            if !self.manipulated {
                self.document.push_undo();
                self.manipulated = true;
            }
            self.document.replace(updated.touched(now));
            return SurfaceResponse::Redraw;
        }

        if self.tool_manager.is_active() {
            self.tool_manager.update(point);
            return SurfaceResponse::Redraw;
        }
        SurfaceResponse::None
    }

    pub fn pointer_up(&mut self, point: Point, now: i64) -> SurfaceResponse {
        if self.manipulation.is_some() {
            let changed = self.manipulated;
            self.end_manipulation();
            return if changed {
                SurfaceResponse::Commit
            } else {
                SurfaceResponse::Redraw
            };
        }

        if self.tool_manager.is_active() {
            return match self.tool_manager.end(point) {
                Some((kind, color)) => {
                    self.add(Element::new(kind, color, now));
                    SurfaceResponse::Commit
                }
                None => SurfaceResponse::Redraw,
            };
        }
        SurfaceResponse::None
    }

    /// Confirm the text prompt. Blank text creates nothing.
    pub fn submit_text(&mut self, content: &str, now: i64) -> SurfaceResponse {
        let Some(position) = self.pending_text.take() else {
            return SurfaceResponse::None;
        };
        if content.trim().is_empty() {
            return SurfaceResponse::Redraw;
        }
        let label = TextLabel::new(position, content, self.tool_manager.text_font_size());
        self.add(Element::new(
            ElementKind::Text(label),
            self.tool_manager.color,
            now,
        ));
        SurfaceResponse::Commit
    }

    /// Dismiss the text prompt.
    pub fn cancel_text(&mut self) -> SurfaceResponse {
        match self.pending_text.take() {
            Some(_) => SurfaceResponse::Redraw,
            None => SurfaceResponse::None,
        }
    }

    /// Place a media placeholder at the default position.
    pub fn add_media(&mut self, kind: MediaKind, source: MediaSource, now: i64) -> ElementId {
        let element = Element::new(
            ElementKind::Media(Media::new(kind, source)),
            self.tool_manager.color,
            now,
        );
        let id = element.id.clone();
        self.add(element);
        id
    }

    /// Remove the selected element.
    pub fn delete_selected(&mut self) -> SurfaceResponse {
        let Some(id) = self.selection.take() else {
            return SurfaceResponse::None;
        };
        self.end_manipulation();
        if self.document.get(&id).is_none() {
            return SurfaceResponse::Redraw;
        }
        self.document.push_undo();
        self.document.remove(&id);
        SurfaceResponse::Commit
    }

    /// Remove every element.
    pub fn clear(&mut self) -> SurfaceResponse {
        self.end_manipulation();
        self.tool_manager.cancel();
        self.selection = None;
        self.document.push_undo();
        self.document.clear();
        SurfaceResponse::Commit
    }

    pub fn undo(&mut self, now: i64) -> SurfaceResponse {
        self.end_manipulation();
        if self.document.undo(now) {
            self.drop_missing_selection();
            SurfaceResponse::Commit
        } else {
            SurfaceResponse::None
        }
    }

    pub fn redo(&mut self, now: i64) -> SurfaceResponse {
        self.end_manipulation();
        if self.document.redo(now) {
            self.drop_missing_selection();
            SurfaceResponse::Commit
        } else {
            SurfaceResponse::None
        }
    }

    /// Install a merged collection from the sync loop.
    pub fn apply_remote(&mut self, elements: Vec<Element>) {
        self.document.replace_all(elements);
        self.drop_missing_selection();
    }

    fn add(&mut self, element: Element) {
        self.document.push_undo();
        self.document.push(element);
    }

    fn selected_handle_at(&self, point: Point) -> Option<Corner> {
        let id = self.selection.as_ref()?;
        let element = self.document.get(id)?;
        selection::hit_test_handles(element, point, HANDLE_HIT_TOLERANCE)
    }

    fn begin_manipulation(&mut self, manipulation: Manipulation) {
        self.manipulation = Some(manipulation);
        self.manipulated = false;
    }

    fn end_manipulation(&mut self) {
        self.manipulation = None;
        self.manipulated = false;
    }

    fn drop_missing_selection(&mut self) {
        if let Some(id) = &self.selection {
            if self.document.get(id).is_none() {
                self.selection = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{HexColor, Rectangle};

    fn rect_at(id: &str, x: f64, y: f64, ts: i64) -> Element {
        Element {
            id: id.to_string(),
            kind: ElementKind::Rectangle(Rectangle::new(Point::new(x, y), 50.0, 50.0)),
            color: HexColor::black(),
            timestamp: ts,
            rotation: None,
        }
    }

    #[test]
    fn test_select_hits_topmost() {
        let mut canvas = Canvas::with_elements(vec![rect_at("below", 0.0, 0.0, 1), rect_at("above", 25.0, 25.0, 2)]);
        assert_eq!(canvas.pointer_down(Point::new(30.0, 30.0), 10), SurfaceResponse::Redraw);
        assert_eq!(canvas.selection.as_deref(), Some("above"));
        assert_eq!(canvas.pointer_up(Point::new(30.0, 30.0), 10), SurfaceResponse::None);

        canvas.pointer_down(Point::new(500.0, 500.0), 11);
        assert!(canvas.selection.is_none());
    }

    #[test]
    fn test_move_translates_and_commits() {
        let mut canvas = Canvas::with_elements(vec![rect_at("a", 10.0, 10.0, 100)]);
        canvas.set_tool(ToolKind::Move);
        canvas.pointer_down(Point::new(20.0, 20.0), 200);
        assert!(canvas.is_gesture_active());
        assert_eq!(canvas.editing_target().as_deref(), Some("a"));

        assert_eq!(canvas.pointer_move(Point::new(40.0, 30.0), 300), SurfaceResponse::Redraw);
        let moved = canvas.document.get("a").unwrap();
        assert_eq!(moved.origin(), Some(Point::new(30.0, 20.0)));
        assert_eq!(moved.timestamp, 300);

        assert_eq!(canvas.pointer_up(Point::new(40.0, 30.0), 300), SurfaceResponse::Commit);
        assert!(!canvas.is_gesture_active());
    }

    #[test]
    fn test_move_without_motion_does_not_commit() {
        let mut canvas = Canvas::with_elements(vec![rect_at("a", 10.0, 10.0, 100)]);
        canvas.set_tool(ToolKind::Move);
        canvas.pointer_down(Point::new(20.0, 20.0), 200);
        assert_eq!(canvas.pointer_move(Point::new(20.0, 20.0), 250), SurfaceResponse::None);
        assert_eq!(canvas.pointer_up(Point::new(20.0, 20.0), 300), SurfaceResponse::Redraw);
        assert_eq!(canvas.document.get("a").unwrap().timestamp, 100);
        assert!(!canvas.document.can_undo());
    }

    #[test]
    fn test_pen_stroke_creates_one_path() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Pen);
        canvas.pointer_down(Point::new(0.0, 0.0), 1);
        for i in 1..20 {
            canvas.pointer_move(Point::new(i as f64, i as f64), 1 + i);
        }
        assert!(canvas.preview_element().is_some());
        assert_eq!(canvas.pointer_up(Point::new(19.0, 19.0), 30), SurfaceResponse::Commit);
        assert_eq!(canvas.document.len(), 1);
        let ElementKind::Path(path) = &canvas.document.elements()[0].kind else {
            panic!("expected path");
        };
        assert_eq!(path.points.len(), 20);
    }

    #[test]
    fn test_text_prompt_confirm_and_cancel() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Text);
        canvas.tool_manager.line_width = 3.0;
        let pos = Point::new(5.0, 40.0);
        assert_eq!(canvas.pointer_down(pos, 1), SurfaceResponse::TextPrompt(pos));
        assert_eq!(canvas.submit_text("   ", 2), SurfaceResponse::Redraw);
        assert!(canvas.document.is_empty());

        canvas.pointer_down(pos, 3);
        assert_eq!(canvas.cancel_text(), SurfaceResponse::Redraw);
        assert_eq!(canvas.submit_text("late", 4), SurfaceResponse::None);

        canvas.pointer_down(pos, 5);
        assert_eq!(canvas.submit_text("Hello", 6), SurfaceResponse::Commit);
        let ElementKind::Text(text) = &canvas.document.elements()[0].kind else {
            panic!("expected text");
        };
        assert_eq!(text.font_size, 18.0);
        assert_eq!(text.position, pos);
    }

    #[test]
    fn test_resize_selected_rectangle() {
        let mut canvas = Canvas::with_elements(vec![rect_at("a", 10.0, 10.0, 1)]);
        canvas.set_tool(ToolKind::Move);
        canvas.pointer_down(Point::new(30.0, 30.0), 2);
        canvas.pointer_up(Point::new(30.0, 30.0), 2);

        canvas.pointer_down(Point::new(60.0, 60.0), 3);
        canvas.pointer_move(Point::new(110.0, 90.0), 4);
        assert_eq!(canvas.pointer_up(Point::new(110.0, 90.0), 4), SurfaceResponse::Commit);

        let b = canvas.document.get("a").unwrap().bounds().unwrap();
        assert_eq!((b.x0, b.y0, b.x1, b.y1), (10.0, 10.0, 110.0, 90.0));
    }

    #[test]
    fn test_drag_element_stamped_at_max_timestamp() {
        let mut canvas = Canvas::with_elements(vec![rect_at("a", 0.0, 0.0, i64::MAX)]);
        canvas.set_tool(ToolKind::Move);
        canvas.pointer_down(Point::new(10.0, 10.0), 5);
        canvas.pointer_move(Point::new(30.0, 10.0), 6);
        assert_eq!(canvas.pointer_up(Point::new(30.0, 10.0), 6), SurfaceResponse::Commit);

        let a = canvas.document.get("a").unwrap();
        assert_eq!(a.origin(), Some(Point::new(20.0, 0.0)));
        assert_eq!(a.timestamp, i64::MAX);
    }

    #[test]
    fn test_select_tool_does_not_resize_on_handle() {
        let mut canvas = Canvas::with_elements(vec![rect_at("a", 10.0, 10.0, 1)]);
        assert_eq!(canvas.tool(), ToolKind::Select);
        canvas.pointer_down(Point::new(30.0, 30.0), 2);
        canvas.pointer_up(Point::new(30.0, 30.0), 2);
        assert_eq!(canvas.selection.as_deref(), Some("a"));

        canvas.pointer_down(Point::new(60.0, 60.0), 3);
        canvas.pointer_move(Point::new(200.0, 200.0), 4);
        assert_ne!(canvas.pointer_up(Point::new(200.0, 200.0), 4), SurfaceResponse::Commit);

        let a = canvas.document.get("a").unwrap();
        let b = a.bounds().unwrap();
        assert_eq!((b.x0, b.y0, b.x1, b.y1), (10.0, 10.0, 60.0, 60.0));
        assert_eq!(a.timestamp, 1);
    }

    #[test]
    fn test_delete_clear_and_undo() {
        let mut canvas = Canvas::with_elements(vec![rect_at("a", 0.0, 0.0, 10), rect_at("b", 100.0, 0.0, 10)]);
        canvas.pointer_down(Point::new(10.0, 10.0), 20);
        assert_eq!(canvas.delete_selected(), SurfaceResponse::Commit);
        assert_eq!(canvas.document.len(), 1);
        assert_eq!(canvas.delete_selected(), SurfaceResponse::None);

        assert_eq!(canvas.clear(), SurfaceResponse::Commit);
        assert!(canvas.document.is_empty());

        assert_eq!(canvas.undo(30), SurfaceResponse::Commit);
        assert_eq!(canvas.document.len(), 1);
        assert_eq!(canvas.undo(31), SurfaceResponse::Commit);
        let restored = canvas.document.get("a").unwrap();
        // Re-added elements must look fresh to the merge.
        assert_eq!(restored.timestamp, 31);
        // Unchanged elements keep their current stamp.
        assert_eq!(canvas.document.get("b").unwrap().timestamp, 30);

        assert_eq!(canvas.redo(40), SurfaceResponse::Commit);
        assert!(canvas.document.get("a").is_none());
    }

    #[test]
    fn test_undo_history_is_bounded() {
        let mut doc = ElementCollection::new();
        for i in 0..60 {
            doc.push_undo();
            doc.push(rect_at(&format!("e{}", i), 0.0, 0.0, i));
        }
        let mut undone = 0;
        while doc.undo(1_000) {
            undone += 1;
        }
        assert_eq!(undone, MAX_UNDO_HISTORY);
        assert_eq!(doc.len(), 10);
    }

    #[test]
    fn test_apply_remote_drops_stale_selection() {
        let mut canvas = Canvas::with_elements(vec![rect_at("a", 0.0, 0.0, 1)]);
        canvas.selection = Some("a".into());
        canvas.apply_remote(vec![rect_at("b", 0.0, 0.0, 2)]);
        assert!(canvas.selection.is_none());
    }

    #[test]
    fn test_add_media_default_geometry() {
        let mut canvas = Canvas::new();
        let id = canvas.add_media(MediaKind::Image, MediaSource::default(), 5);
        let b = canvas.document.get(&id).unwrap().bounds().unwrap();
        assert_eq!((b.x0, b.y0, b.width(), b.height()), (50.0, 50.0, 200.0, 150.0));
    }

    #[test]
    fn test_json_roundtrip_collection() {
        let doc = ElementCollection::from_elements(vec![rect_at("a", 1.0, 2.0, 3)]);
        let json = doc.to_json().unwrap();
        let back = ElementCollection::from_json(&json).unwrap();
        assert_eq!(back.elements(), doc.elements());
    }
}
