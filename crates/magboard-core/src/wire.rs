//! JSON wire format for elements.
//!
//! Elements travel as `{ id, kind, data, color, timestamp, x?, y?, width?, height?, rotation? }`
//! where `data` is a kind-specific payload. Top-level geometry, when present,
//! takes precedence over the copy inside `data`.
//!
//! Anything with a string `id` that does not decode into a known kind is kept
//! as an [`OpaqueElement`] and written back exactly as received.

use crate::shapes::{
    Circle, Element, ElementKind, HexColor, Media, MediaKind, MediaSource, OpaqueElement,
    PathStroke, Rectangle, TextLabel,
};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Wire conversion errors.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Unknown element kind: {0}")]
    UnknownKind(String),
    #[error("Unknown shape type: {0}")]
    UnknownShape(String),
    #[error("Invalid data for {kind} element: {source}")]
    InvalidData {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Missing field `{field}` on {kind} element")]
    MissingField { kind: String, field: &'static str },
    #[error("Element has no string id")]
    MissingId,
}

/// An element as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireElement {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub color: HexColor,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WirePoint {
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathData {
    #[serde(default)]
    points: Vec<WirePoint>,
    #[serde(default = "default_line_width")]
    line_width: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextData {
    #[serde(default)]
    text: String,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default = "default_font_size")]
    font_size: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapeData {
    shape_type: String,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    radius: Option<f64>,
    #[serde(default = "default_line_width")]
    line_width: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_id: Option<String>,
}

fn default_line_width() -> f64 {
    crate::shapes::DEFAULT_LINE_WIDTH
}

fn default_font_size() -> f64 {
    TextLabel::DEFAULT_FONT_SIZE
}

fn parse_data<T: for<'de> Deserialize<'de>>(kind: &str, data: &Value) -> Result<T, WireError> {
    // Older payloads omit `data` entirely for media.
    let data = if data.is_null() {
        Value::Object(Default::default())
    } else {
        data.clone()
    };
    serde_json::from_value(data).map_err(|source| WireError::InvalidData {
        kind: kind.to_string(),
        source,
    })
}

fn required(kind: &str, field: &'static str, value: Option<f64>) -> Result<f64, WireError> {
    value.ok_or_else(|| WireError::MissingField {
        kind: kind.to_string(),
        field,
    })
}

fn media_kind(name: &str) -> Option<MediaKind> {
    match name {
        "image" => Some(MediaKind::Image),
        "video" => Some(MediaKind::Video),
        "pdf" | "document" => Some(MediaKind::Document),
        _ => None,
    }
}

impl TryFrom<WireElement> for Element {
    type Error = WireError;

    fn try_from(wire: WireElement) -> Result<Self, Self::Error> {
        let kind_name = wire.kind.as_str();
        let kind = match kind_name {
            "path" => {
                let data: PathData = parse_data(kind_name, &wire.data)?;
                let points = data.points.iter().map(|p| Point::new(p.x, p.y)).collect();
                ElementKind::Path(PathStroke::new(points, data.line_width))
            }
            "text" => {
                let data: TextData = parse_data(kind_name, &wire.data)?;
                let x = required(kind_name, "x", wire.x.or(data.x))?;
                let y = required(kind_name, "y", wire.y.or(data.y))?;
                ElementKind::Text(TextLabel::new(Point::new(x, y), data.text, data.font_size))
            }
            "shape" => {
                let data: ShapeData = parse_data(kind_name, &wire.data)?;
                let x = required(kind_name, "x", wire.x.or(data.x))?;
                let y = required(kind_name, "y", wire.y.or(data.y))?;
                match data.shape_type.as_str() {
                    "rectangle" => {
                        let width = required(kind_name, "width", wire.width.or(data.width))?;
                        let height = required(kind_name, "height", wire.height.or(data.height))?;
                        ElementKind::Rectangle(
                            Rectangle::new(Point::new(x, y), width, height)
                                .with_line_width(data.line_width),
                        )
                    }
                    "circle" => {
                        let radius = required(kind_name, "radius", data.radius)?;
                        ElementKind::Circle(
                            Circle::new(Point::new(x, y), radius).with_line_width(data.line_width),
                        )
                    }
                    other => return Err(WireError::UnknownShape(other.to_string())),
                }
            }
            other => {
                let media = media_kind(other).ok_or_else(|| WireError::UnknownKind(other.to_string()))?;
                let data: MediaData = parse_data(kind_name, &wire.data)?;
                ElementKind::Media(Media {
                    kind: media,
                    position: Point::new(wire.x.unwrap_or(0.0), wire.y.unwrap_or(0.0)),
                    width: wire.width.unwrap_or(Media::DEFAULT_WIDTH),
                    height: wire.height.unwrap_or(Media::DEFAULT_HEIGHT),
                    source: MediaSource {
                        url: data.url,
                        name: data.name,
                        file_id: data.file_id,
                    },
                })
            }
        };

        Ok(Element {
            id: wire.id,
            kind,
            color: wire.color,
            timestamp: wire.timestamp,
            rotation: wire.rotation,
        })
    }
}

impl From<&Element> for WireElement {
    fn from(element: &Element) -> Self {
        let mut wire = WireElement {
            id: element.id.clone(),
            kind: element.kind.wire_name().to_string(),
            data: Value::Null,
            color: element.color,
            timestamp: element.timestamp,
            x: None,
            y: None,
            width: None,
            height: None,
            rotation: element.rotation,
        };

        let data = match &element.kind {
            ElementKind::Path(path) => serde_json::to_value(PathData {
                points: path.points.iter().map(|p| WirePoint { x: p.x, y: p.y }).collect(),
                line_width: path.line_width,
            }),
            ElementKind::Text(text) => {
                wire.x = Some(text.position.x);
                wire.y = Some(text.position.y);
                serde_json::to_value(TextData {
                    text: text.content.clone(),
                    x: Some(text.position.x),
                    y: Some(text.position.y),
                    font_size: text.font_size,
                })
            }
            ElementKind::Rectangle(rect) => {
                wire.x = Some(rect.position.x);
                wire.y = Some(rect.position.y);
                wire.width = Some(rect.width);
                wire.height = Some(rect.height);
                serde_json::to_value(ShapeData {
                    shape_type: "rectangle".to_string(),
                    x: Some(rect.position.x),
                    y: Some(rect.position.y),
                    width: Some(rect.width),
                    height: Some(rect.height),
                    radius: None,
                    line_width: rect.line_width,
                })
            }
            ElementKind::Circle(circle) => {
                wire.x = Some(circle.center.x);
                wire.y = Some(circle.center.y);
                serde_json::to_value(ShapeData {
                    shape_type: "circle".to_string(),
                    x: Some(circle.center.x),
                    y: Some(circle.center.y),
                    width: None,
                    height: None,
                    radius: Some(circle.radius),
                    line_width: circle.line_width,
                })
            }
            ElementKind::Media(media) => {
                wire.x = Some(media.position.x);
                wire.y = Some(media.position.y);
                wire.width = Some(media.width);
                wire.height = Some(media.height);
                serde_json::to_value(MediaData {
                    url: media.source.url.clone(),
                    name: media.source.name.clone(),
                    file_id: media.source.file_id.clone(),
                })
            }
            ElementKind::Opaque(opaque) => {
                let number = |key: &str| opaque.raw.get(key).and_then(Value::as_f64);
                wire.x = number("x");
                wire.y = number("y");
                wire.width = number("width");
                wire.height = number("height");
                Ok(opaque.raw.get("data").cloned().unwrap_or(Value::Null))
            }
        };
        // Plain structs of numbers and strings always serialize.
        wire.data = data.unwrap_or(Value::Null);
        wire
    }
}

/// The raw object with the element's current id and timestamp written over it.
fn opaque_value(element: &Element, opaque: &OpaqueElement) -> Value {
    let mut raw = opaque.raw.clone();
    if let Value::Object(map) = &mut raw {
        map.insert("id".to_string(), Value::from(element.id.clone()));
        map.insert("timestamp".to_string(), Value::from(element.timestamp));
    }
    raw
}

impl Serialize for Element {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.kind {
            ElementKind::Opaque(opaque) => opaque_value(self, opaque).serialize(serializer),
            _ => WireElement::from(self).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode_element(value).map_err(serde::de::Error::custom)
    }
}

/// Decode one wire value.
///
/// A value with a string `id` always decodes: when it is not a known kind it
/// becomes an [`ElementKind::Opaque`]. Only values without an id fail.
pub fn decode_element(value: Value) -> Result<Element, WireError> {
    let typed = serde_json::from_value::<WireElement>(value.clone())
        .map_err(|e| e.to_string())
        .and_then(|wire| Element::try_from(wire).map_err(|e| e.to_string()));
    let reason = match typed {
        Ok(element) => return Ok(element),
        Err(reason) => reason,
    };

    let id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or(WireError::MissingId)?
        .to_string();
    let timestamp = value
        .get("timestamp")
        .and_then(|t| t.as_i64().or_else(|| t.as_f64().map(|f| f as i64)))
        .unwrap_or(0);
    let color = value
        .get("color")
        .and_then(Value::as_str)
        .and_then(|c| c.parse().ok())
        .unwrap_or_default();
    let rotation = value.get("rotation").and_then(Value::as_f64);
    log::debug!("Keeping element {} as opaque: {}", id, reason);

    Ok(Element {
        id,
        kind: ElementKind::Opaque(OpaqueElement::new(value)),
        color,
        timestamp,
        rotation,
    })
}

/// Decode a wire collection. Values without an id are skipped and logged.
///
/// Duplicate ids collapse to the copy with the highest timestamp.
pub fn decode_elements(values: Vec<Value>) -> Vec<Element> {
    let mut elements = Vec::with_capacity(values.len());
    for value in values {
        match decode_element(value) {
            Ok(element) => elements.push(element),
            Err(e) => log::warn!("Skipping undecodable element: {}", e),
        }
    }
    dedupe_by_id(elements)
}

/// Encode a collection into wire values.
pub fn encode_elements(elements: &[Element]) -> Vec<Value> {
    elements
        .iter()
        .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
        .collect()
}

/// Keep one element per id: the one with the highest timestamp, at the position
/// of its first occurrence. On equal timestamps the later copy wins.
pub fn dedupe_by_id(elements: Vec<Element>) -> Vec<Element> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(elements.len());
    let mut out: Vec<Element> = Vec::with_capacity(elements.len());
    for element in elements {
        match index.get(&element.id) {
            Some(&i) => {
                if element.timestamp >= out[i].timestamp {
                    log::debug!("Duplicate element id {}, keeping newest copy", element.id);
                    out[i] = element;
                }
            }
            None => {
                index.insert(element.id.clone(), out.len());
                out.push(element);
            }
        }
    }
    out
}
