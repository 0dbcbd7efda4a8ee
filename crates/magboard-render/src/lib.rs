//! Magboard Render Library
//!
//! Renderer abstraction and a backend-neutral display-list renderer for the
//! magboard whiteboard.

mod display_list;
mod renderer;

pub use display_list::{DisplayListRenderer, DrawCommand, TextAlign};
pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
