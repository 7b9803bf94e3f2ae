//! Rectangle shape.

use super::{Classification, SerializableColor, ShapeId, ShapeTrait};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An axis-aligned rectangle annotation.
///
/// Width and height are non-negative once a rectangle is in the store; a
/// rectangle with negative extents only exists transiently and is turned
/// into a stored one through [`Rectangle::normalized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    pub position: Point,
    /// Width of the rectangle.
    pub width: f64,
    /// Height of the rectangle.
    pub height: f64,
    /// Stroke color.
    pub color: SerializableColor,
    /// Label assigned by the owning screen.
    #[serde(default)]
    pub classification: Classification,
}

impl Rectangle {
    /// Create a new rectangle with a fresh id.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            color: SerializableColor::black(),
            classification: Classification::default(),
        }
    }

    /// Reconstruct a rectangle with a specific ID (for records).
    pub(crate) fn reconstruct(
        id: ShapeId,
        position: Point,
        width: f64,
        height: f64,
        color: SerializableColor,
        classification: Classification,
    ) -> Self {
        Self {
            id,
            position,
            width,
            height,
            color,
            classification,
        }
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self::new(p1, p2.x - p1.x, p2.y - p1.y).normalized()
    }

    /// Flip negative extents into a positive rectangle with an adjusted origin.
    ///
    /// Idempotent: normalizing a normalized rectangle returns it unchanged.
    pub fn normalized(&self) -> Self {
        let mut rect = self.clone();
        if rect.width < 0.0 {
            rect.position.x += rect.width;
            rect.width = -rect.width;
        }
        if rect.height < 0.0 {
            rect.position.y += rect.height;
            rect.height = -rect.height;
        }
        rect
    }

    /// Get the rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

impl ShapeTrait for Rectangle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        // kurbo::Rect::new keeps corner order, abs() orders it
        self.as_rect().abs()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    fn to_path(&self) -> BezPath {
        self.bounds().to_path(0.1)
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}
