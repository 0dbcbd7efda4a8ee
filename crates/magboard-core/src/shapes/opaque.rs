//! Elements this build cannot interpret, kept so they survive a round-trip.

use super::Geometry;
use kurbo::{BezPath, Rect};
use serde_json::Value;

/// Raw wire form of an element whose kind or payload did not decode.
///
/// It has no geometry, so it is never hit-tested or drawn, but it merges and
/// saves like any other element.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueElement {
    /// The `kind` (or `type`) field as received, empty when absent.
    pub kind: String,
    /// The whole wire object as received.
    pub raw: Value,
}

impl OpaqueElement {
    pub fn new(raw: Value) -> Self {
        let kind = raw
            .get("kind")
            .or_else(|| raw.get("type"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self { kind, raw }
    }
}

impl Geometry for OpaqueElement {
    fn bounds(&self) -> Option<Rect> {
        None
    }

    fn translated(&self, _dx: f64, _dy: f64) -> Self {
        self.clone()
    }

    fn to_path(&self) -> BezPath {
        BezPath::new()
    }
}
