//! Renderer trait abstraction.

use kurbo::Size;
use magboard_core::canvas::Canvas;
use magboard_core::presence::PresenceRecord;
use magboard_core::sync::SyncStatus;
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a Canvas,
    /// Other users on the board (already filtered for staleness).
    pub peers: &'a [PresenceRecord],
    /// Viewport size in pixels.
    pub viewport_size: Size,
    /// Background color.
    pub background_color: Color,
    /// Selection highlight color; the local user's presence color.
    pub selection_color: Color,
    /// Sync status; a degraded status is drawn as a banner.
    pub status: SyncStatus,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(canvas: &'a Canvas, viewport_size: Size) -> Self {
        Self {
            canvas,
            peers: &[],
            viewport_size,
            background_color: Color::WHITE,
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            status: SyncStatus::Synced,
        }
    }

    /// Set the foreign presence records to overlay.
    pub fn with_peers(mut self, peers: &'a [PresenceRecord]) -> Self {
        self.peers = peers;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the selection highlight color.
    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Set the sync status.
    pub fn with_status(mut self, status: SyncStatus) -> Self {
        self.status = status;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer: Send + Sync {
    /// Build the draw commands for a frame.
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
