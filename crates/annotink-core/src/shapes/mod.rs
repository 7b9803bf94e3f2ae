//! Shape definitions for the annotation canvas.

mod polygon;
mod rectangle;

pub use polygon::Polygon;
pub use rectangle::Rectangle;

use kurbo::{BezPath, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Parse a CSS hex color (`#rgb`, `#rrggbb` or `#rrggbbaa`).
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => Some(Self::new(
                channel(0..1)? * 17,
                channel(1..2)? * 17,
                channel(2..3)? * 17,
                255,
            )),
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Label attached to a shape by the owning screen.
///
/// The engine carries it around untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Classification {
    pub class_name: String,
    pub attribute_name: String,
    pub attribute_value: String,
}

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Logical kind of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Polygon,
    Polyline,
}

/// Distance from a point to a line segment (a→b).
///
/// The point is projected onto the infinite line through the segment, the
/// projection parameter clamped to `[0, 1]`, and the distance measured to
/// the clamped point.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Axis-aligned bounding box of a point set (zero rect when empty).
pub fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the bounding box in logical coordinates.
    fn bounds(&self) -> Rect;

    /// Check if a point (in logical coordinates) hits this shape.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    /// Get the path representation for rendering.
    fn to_path(&self) -> BezPath;

    /// Move the whole shape by `delta`.
    fn translate(&mut self, delta: Vec2);
}

/// Enum wrapper for all shape types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rectangle(Rectangle),
    Polygon(Polygon),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::Rectangle(s) => s.id(),
            Shape::Polygon(s) => s.id(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Polygon(p) if p.closed => ShapeKind::Polygon,
            Shape::Polygon(_) => ShapeKind::Polyline,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Rectangle(s) => s.bounds(),
            Shape::Polygon(s) => s.bounds(),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Shape::Rectangle(s) => s.hit_test(point, tolerance),
            Shape::Polygon(s) => s.hit_test(point, tolerance),
        }
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            Shape::Rectangle(s) => s.to_path(),
            Shape::Polygon(s) => s.to_path(),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Rectangle(s) => s.translate(delta),
            Shape::Polygon(s) => s.translate(delta),
        }
    }

    pub fn color(&self) -> SerializableColor {
        match self {
            Shape::Rectangle(s) => s.color,
            Shape::Polygon(s) => s.color,
        }
    }

    pub fn set_color(&mut self, color: SerializableColor) {
        match self {
            Shape::Rectangle(s) => s.color = color,
            Shape::Polygon(s) => s.color = color,
        }
    }

    pub fn classification(&self) -> &Classification {
        match self {
            Shape::Rectangle(s) => &s.classification,
            Shape::Polygon(s) => &s.classification,
        }
    }

    pub fn set_classification(&mut self, classification: Classification) {
        match self {
            Shape::Rectangle(s) => s.classification = classification,
            Shape::Polygon(s) => s.classification = classification,
        }
    }

    /// Get the polygon/polyline if this shape has editable vertices.
    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Shape::Polygon(p) => Some(p),
            Shape::Rectangle(_) => None,
        }
    }

    /// Get the mutable polygon/polyline if this shape has editable vertices.
    pub fn as_polygon_mut(&mut self) -> Option<&mut Polygon> {
        match self {
            Shape::Polygon(p) => Some(p),
            Shape::Rectangle(_) => None,
        }
    }
}
