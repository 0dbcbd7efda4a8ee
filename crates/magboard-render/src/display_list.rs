//! Display-list renderer: turns a frame into backend-neutral draw commands.

use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use magboard_core::presence::PresenceRecord;
use magboard_core::selection::{self, HANDLE_SIZE, SELECTION_PADDING};
use magboard_core::shapes::{Element, ElementKind, Media, MediaKind};
use peniko::Color;

/// Font size for cursor labels, badges and media captions.
const LABEL_FONT_SIZE: f64 = 12.0;
/// Font size of the media placeholder icon.
const ICON_FONT_SIZE: f64 = 48.0;
/// Height of the status banner.
const BANNER_HEIGHT: f64 = 28.0;

/// Horizontal anchoring of a text command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
}

/// A single drawing instruction.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Fill {
        path: BezPath,
        color: Color,
        transform: Affine,
    },
    Stroke {
        path: BezPath,
        color: Color,
        width: f64,
        /// Dash pattern (on, off), solid when `None`.
        dash: Option<[f64; 2]>,
        transform: Affine,
    },
    Text {
        text: String,
        /// Baseline anchor.
        origin: Point,
        size: f64,
        color: Color,
        align: TextAlign,
        transform: Affine,
    },
    /// An external image scaled into `rect`.
    Image {
        url: String,
        rect: Rect,
        transform: Affine,
    },
}

/// Approximate label width, matching the element model's text metrics.
fn label_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * 0.6
}

/// Rotation of an element around its origin.
fn element_transform(element: &Element) -> Affine {
    let Some(degrees) = element.rotation.filter(|d| *d != 0.0) else {
        return Affine::IDENTITY;
    };
    let pivot = match &element.kind {
        ElementKind::Text(t) => t.position,
        ElementKind::Rectangle(r) => r.position,
        ElementKind::Circle(c) => c.center,
        ElementKind::Media(m) => m.position,
        ElementKind::Path(_) | ElementKind::Opaque(_) => return Affine::IDENTITY,
    };
    Affine::rotate_about(degrees.to_radians(), pivot)
}

/// Renderer that records draw commands for a backend to replay.
pub struct DisplayListRenderer {
    commands: Vec<DrawCommand>,
    selection_color: Color,
}

impl Default for DisplayListRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayListRenderer {
    /// Create a new renderer.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            selection_color: Color::from_rgba8(59, 130, 246, 255),
        }
    }

    /// Commands of the last built frame.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take ownership of the commands (resets internal list).
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    fn fill(&mut self, path: BezPath, color: Color, transform: Affine) {
        self.commands.push(DrawCommand::Fill {
            path,
            color,
            transform,
        });
    }

    fn stroke(&mut self, path: BezPath, color: Color, width: f64, dash: Option<[f64; 2]>, transform: Affine) {
        self.commands.push(DrawCommand::Stroke {
            path,
            color,
            width,
            dash,
            transform,
        });
    }

    fn text(&mut self, text: impl Into<String>, origin: Point, size: f64, color: Color, align: TextAlign) {
        self.commands.push(DrawCommand::Text {
            text: text.into(),
            origin,
            size,
            color,
            align,
            transform: Affine::IDENTITY,
        });
    }

    fn render_element(&mut self, element: &Element) {
        let transform = element_transform(element);
        let color: Color = element.color.into();
        match &element.kind {
            ElementKind::Path(path) => {
                if !path.is_empty() {
                    self.stroke(element.kind.to_path(), color, path.line_width, None, transform);
                }
            }
            ElementKind::Text(text) => {
                self.commands.push(DrawCommand::Text {
                    text: text.content.clone(),
                    origin: text.position,
                    size: text.font_size,
                    color,
                    align: TextAlign::Start,
                    transform,
                });
            }
            ElementKind::Rectangle(rect) => {
                self.stroke(element.kind.to_path(), color, rect.line_width, None, transform);
            }
            ElementKind::Circle(circle) => {
                self.stroke(element.kind.to_path(), color, circle.line_width, None, transform);
            }
            ElementKind::Media(media) => self.render_media(media, transform),
            ElementKind::Opaque(opaque) => {
                log::trace!("Not drawing {} element {}", opaque.kind, element.id);
            }
        }
    }

    fn render_media(&mut self, media: &Media, transform: Affine) {
        let rect = media.as_rect();
        self.fill(rect.to_path(0.1), Color::from_rgba8(0xf0, 0xf0, 0xf0, 255), transform);
        self.stroke(rect.to_path(0.1), Color::from_rgba8(0x33, 0x33, 0x33, 255), 2.0, None, transform);

        if let (MediaKind::Image, Some(url)) = (media.kind, media.source.url.as_ref()) {
            self.commands.push(DrawCommand::Image {
                url: url.clone(),
                rect,
                transform,
            });
            return;
        }

        let center = rect.center();
        let grey = Color::from_rgba8(0x66, 0x66, 0x66, 255);
        self.commands.push(DrawCommand::Text {
            text: media.kind.icon().to_string(),
            origin: center,
            size: ICON_FONT_SIZE,
            color: grey,
            align: TextAlign::Center,
            transform,
        });
        self.commands.push(DrawCommand::Text {
            text: media.label().to_string(),
            origin: Point::new(center.x, center.y + 30.0),
            size: LABEL_FONT_SIZE,
            color: grey,
            align: TextAlign::Center,
            transform,
        });
    }

    /// Dashed box around the selected element plus its resize handles.
    fn render_selection(&mut self, element: &Element) {
        let Some(bounds) = element.bounds() else {
            return;
        };
        let color = self.selection_color;
        let outline = bounds.inflate(SELECTION_PADDING, SELECTION_PADDING);
        self.stroke(outline.to_path(0.1), color, 2.0, Some([5.0, 5.0]), Affine::IDENTITY);

        for handle in selection::get_handles(element) {
            let half = HANDLE_SIZE / 2.0;
            let rect = Rect::new(
                handle.position.x - half,
                handle.position.y - half,
                handle.position.x + half,
                handle.position.y + half,
            );
            self.fill(rect.to_path(0.1), color, Affine::IDENTITY);
        }
    }

    /// Colored outline and name badge on an element another user is editing.
    fn render_editing_indicator(&mut self, element: &Element, peer: &PresenceRecord) {
        let Some(bounds) = element.bounds() else {
            return;
        };
        let color: Color = peer.color.into();
        let outline = bounds.inflate(3.0, 3.0);
        self.stroke(outline.to_path(0.1), color, 3.0, None, Affine::IDENTITY);

        let badge = Rect::new(
            bounds.x0,
            bounds.y0 - 25.0,
            bounds.x0 + label_width(&peer.user_name, LABEL_FONT_SIZE) + 10.0,
            bounds.y0 - 5.0,
        );
        self.fill(badge.to_path(0.1), color, Affine::IDENTITY);
        self.text(
            peer.user_name.clone(),
            Point::new(bounds.x0 + 5.0, bounds.y0 - 10.0),
            LABEL_FONT_SIZE,
            Color::WHITE,
            TextAlign::Start,
        );
    }

    /// Cursor pointer with a name label.
    pub fn draw_cursor(&mut self, peer: &PresenceRecord) {
        let color: Color = peer.color.into();
        let tip = peer.cursor();
        let mut path = BezPath::new();
        path.move_to(tip);
        path.line_to(Point::new(tip.x + 12.0, tip.y + 12.0));
        path.line_to(Point::new(tip.x + 6.0, tip.y + 12.0));
        path.line_to(Point::new(tip.x, tip.y + 18.0));
        path.close_path();
        self.fill(path, color, Affine::IDENTITY);

        let label = Rect::new(
            tip.x + 15.0,
            tip.y,
            tip.x + 15.0 + label_width(&peer.user_name, LABEL_FONT_SIZE) + 10.0,
            tip.y + 20.0,
        );
        self.fill(label.to_path(0.1), color, Affine::IDENTITY);
        self.text(
            peer.user_name.clone(),
            Point::new(tip.x + 20.0, tip.y + 14.0),
            LABEL_FONT_SIZE,
            Color::WHITE,
            TextAlign::Start,
        );
    }

    fn render_status_banner(&mut self, ctx: &RenderContext) {
        let banner = Rect::new(0.0, 0.0, ctx.viewport_size.width, BANNER_HEIGHT);
        self.fill(banner.to_path(0.1), Color::from_rgba8(0xF5, 0x9E, 0x0B, 230), Affine::IDENTITY);
        self.text(
            ctx.status.label(),
            Point::new(ctx.viewport_size.width / 2.0, BANNER_HEIGHT - 9.0),
            LABEL_FONT_SIZE,
            Color::WHITE,
            TextAlign::Center,
        );
    }
}

impl Renderer for DisplayListRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        self.commands.clear();
        let size = ctx.viewport_size;
        if !(size.width.is_finite() && size.height.is_finite()) || size.width <= 0.0 || size.height <= 0.0 {
            return Err(RendererError::RenderFailed(format!("invalid viewport {:?}", size)));
        }
        self.selection_color = ctx.selection_color;

        let background = Rect::new(0.0, 0.0, size.width, size.height);
        self.fill(background.to_path(0.1), ctx.background_color, Affine::IDENTITY);

        for element in ctx.canvas.document.elements() {
            self.render_element(element);
            if let Some(peer) = ctx
                .peers
                .iter()
                .find(|p| p.editing_element_id.as_deref() == Some(element.id.as_str()))
            {
                self.render_editing_indicator(element, peer);
            }
        }

        // Draw preview element if a tool gesture is active
        if let Some(preview) = ctx.canvas.preview_element() {
            self.render_element(&preview);
        }

        if let Some(selected) = ctx
            .canvas
            .selection
            .as_ref()
            .and_then(|id| ctx.canvas.document.get(id))
        {
            self.render_selection(selected);
        }

        for peer in ctx.peers {
            self.draw_cursor(peer);
        }

        if ctx.status.is_degraded() {
            self.render_status_banner(ctx);
        }

        log::trace!("Built frame with {} commands", self.commands.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use magboard_core::canvas::Canvas;
    use magboard_core::presence::color_for_user;
    use magboard_core::shapes::{HexColor, OpaqueElement, Rectangle, TextLabel};
    use magboard_core::sync::SyncStatus;

    fn rect(id: &str) -> Element {
        Element {
            id: id.to_string(),
            kind: ElementKind::Rectangle(Rectangle::new(Point::new(100.0, 100.0), 200.0, 150.0).with_line_width(2.0)),
            color: HexColor::black(),
            timestamp: 1,
            rotation: None,
        }
    }

    fn peer(editing: Option<&str>) -> PresenceRecord {
        PresenceRecord {
            user_id: "bob".into(),
            user_name: "Bob".into(),
            cursor_x: 10.0,
            cursor_y: 20.0,
            editing_element_id: editing.map(str::to_string),
            last_seen: 0,
            color: color_for_user("bob"),
        }
    }

    fn texts(commands: &[DrawCommand]) -> Vec<&str> {
        commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_build_empty_scene() {
        let mut renderer = DisplayListRenderer::new();
        let canvas = Canvas::new();
        let ctx = RenderContext::new(&canvas, Size::new(800.0, 600.0));
        renderer.build_scene(&ctx).unwrap();
        // Background only.
        assert_eq!(renderer.commands().len(), 1);
    }

    #[test]
    fn test_opaque_element_is_not_drawn() {
        let mut renderer = DisplayListRenderer::new();
        let sticker = Element {
            id: "s".into(),
            kind: ElementKind::Opaque(OpaqueElement::new(serde_json::json!({ "id": "s", "kind": "sticker" }))),
            color: HexColor::black(),
            timestamp: 1,
            rotation: Some(45.0),
        };
        let canvas = Canvas::with_elements(vec![sticker]);
        let ctx = RenderContext::new(&canvas, Size::new(800.0, 600.0));
        renderer.build_scene(&ctx).unwrap();
        assert_eq!(renderer.commands().len(), 1);
    }

    #[test]
    fn test_invalid_viewport_is_error() {
        let mut renderer = DisplayListRenderer::new();
        let canvas = Canvas::new();
        let ctx = RenderContext::new(&canvas, Size::new(0.0, 600.0));
        assert!(renderer.build_scene(&ctx).is_err());
    }

    #[test]
    fn test_selection_draws_dashed_box_and_handles() {
        let mut renderer = DisplayListRenderer::new();
        let mut canvas = Canvas::with_elements(vec![rect("a")]);
        canvas.selection = Some("a".into());
        let ctx = RenderContext::new(&canvas, Size::new(800.0, 600.0));
        renderer.build_scene(&ctx).unwrap();

        let dashed = renderer
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Stroke { dash: Some(_), .. }))
            .count();
        assert_eq!(dashed, 1);
        // background + 4 handles
        let fills = renderer
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill { .. }))
            .count();
        assert_eq!(fills, 5);
    }

    #[test]
    fn test_peer_cursor_and_editing_badge() {
        let mut renderer = DisplayListRenderer::new();
        let canvas = Canvas::with_elements(vec![rect("a")]);
        let peers = vec![peer(Some("a"))];
        let ctx = RenderContext::new(&canvas, Size::new(800.0, 600.0)).with_peers(&peers);
        renderer.build_scene(&ctx).unwrap();

        // Badge on the element and label on the cursor.
        assert_eq!(texts(renderer.commands()), vec!["Bob", "Bob"]);
        let outline = renderer.commands().iter().find_map(|c| match c {
            DrawCommand::Stroke { width, color, .. } if *width == 3.0 => Some(HexColor::from(*color)),
            _ => None,
        });
        assert_eq!(outline, Some(color_for_user("bob")));
    }

    #[test]
    fn test_reconnecting_banner() {
        let mut renderer = DisplayListRenderer::new();
        let canvas = Canvas::new();
        let ctx = RenderContext::new(&canvas, Size::new(800.0, 600.0))
            .with_status(SyncStatus::Reconnecting { failures: 4 });
        renderer.build_scene(&ctx).unwrap();
        let labels = texts(renderer.commands());
        assert_eq!(labels.len(), 1);
        assert!(labels[0].starts_with("Reconnecting"));
    }

    #[test]
    fn test_rotated_text_uses_rotation_transform() {
        let mut renderer = DisplayListRenderer::new();
        let mut text = Element::new(
            ElementKind::Text(TextLabel::new(Point::new(10.0, 10.0), "hi", 20.0)),
            HexColor::black(),
            1,
        );
        text.rotation = Some(90.0);
        let canvas = Canvas::with_elements(vec![text]);
        let ctx = RenderContext::new(&canvas, Size::new(800.0, 600.0));
        renderer.build_scene(&ctx).unwrap();
        let transform = renderer.commands().iter().find_map(|c| match c {
            DrawCommand::Text { transform, .. } => Some(*transform),
            _ => None,
        });
        let moved = transform.unwrap() * Point::new(20.0, 10.0);
        assert!((moved.x - 10.0).abs() < 1e-9);
        assert!((moved.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_media_placeholder_caption() {
        let mut renderer = DisplayListRenderer::new();
        let mut canvas = Canvas::new();
        canvas.add_media(MediaKind::Video, Default::default(), 1);
        let ctx = RenderContext::new(&canvas, Size::new(800.0, 600.0));
        renderer.build_scene(&ctx).unwrap();
        assert_eq!(texts(renderer.commands()), vec!["▶", "Media"]);
    }
}
