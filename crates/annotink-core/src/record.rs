//! Conversion between shapes and the flat record form exchanged with the owning screen.
//!
//! Records carry polygon/polyline geometry as a flat `[x0, y0, x1, y1, ...]`
//! list. Polygons are written with a duplicate of the first vertex appended
//! at the end; that duplicate is a storage convention only and is stripped
//! again when records are read back.

use crate::shapes::{Classification, Polygon, Rectangle, SerializableColor, Shape, ShapeId};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Record conversion errors.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("Shape {id}: odd number of coordinates ({len})")]
    OddCoordinateCount { id: ShapeId, len: usize },
    #[error("Shape {id}: {found} vertices, at least {min} required")]
    TooFewVertices { id: ShapeId, found: usize, min: usize },
    #[error("Shape {id}: invalid color {color:?}")]
    InvalidColor { id: ShapeId, color: String },
    #[error("Shape {id}: id used by more than one record")]
    DuplicateId { id: ShapeId },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Flat storage form of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeRecord {
    Rectangle {
        id: ShapeId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
        #[serde(default)]
        classification: Classification,
    },
    Polygon {
        id: ShapeId,
        points: Vec<f64>,
        color: String,
        #[serde(default)]
        classification: Classification,
    },
    Polyline {
        id: ShapeId,
        points: Vec<f64>,
        color: String,
        #[serde(default)]
        classification: Classification,
    },
}

impl ShapeRecord {
    pub fn id(&self) -> ShapeId {
        match self {
            ShapeRecord::Rectangle { id, .. }
            | ShapeRecord::Polygon { id, .. }
            | ShapeRecord::Polyline { id, .. } => *id,
        }
    }
}

/// Extract logical vertices from a flat coordinate list.
///
/// For closed shapes a list of `n` points whose first point equals its last
/// is read as `n - 1` logical vertices; otherwise every point is a vertex.
pub fn logical_points(id: ShapeId, flat: &[f64], closed: bool) -> Result<Vec<Point>, ShapeError> {
    if flat.len() % 2 != 0 {
        return Err(ShapeError::OddCoordinateCount { id, len: flat.len() });
    }
    let mut points: Vec<Point> = flat
        .chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect();
    if closed && points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Ok(points)
}

/// Build the flat coordinate list, appending the closing duplicate for closed shapes.
pub fn stored_points(vertices: &[Point], closed: bool) -> Vec<f64> {
    let mut flat: Vec<f64> = vertices.iter().flat_map(|p| [p.x, p.y]).collect();
    if closed {
        if let Some(first) = vertices.first() {
            flat.extend([first.x, first.y]);
        }
    }
    flat
}

fn parse_color(id: ShapeId, color: &str) -> Result<SerializableColor, ShapeError> {
    SerializableColor::from_hex(color).ok_or_else(|| ShapeError::InvalidColor {
        id,
        color: color.to_string(),
    })
}

fn polygon_from_record(
    id: ShapeId,
    points: &[f64],
    closed: bool,
    color: &str,
    classification: Classification,
) -> Result<Shape, ShapeError> {
    let vertices = logical_points(id, points, closed)?;
    let polygon = Polygon::reconstruct(id, vertices, closed, parse_color(id, color)?, classification);
    let min = polygon.min_vertices();
    if polygon.vertices.len() < min {
        return Err(ShapeError::TooFewVertices {
            id,
            found: polygon.vertices.len(),
            min,
        });
    }
    Ok(Shape::Polygon(polygon))
}

impl TryFrom<ShapeRecord> for Shape {
    type Error = ShapeError;

    fn try_from(record: ShapeRecord) -> Result<Self, Self::Error> {
        match record {
            ShapeRecord::Rectangle {
                id,
                x,
                y,
                width,
                height,
                color,
                classification,
            } => {
                let rect = Rectangle::reconstruct(
                    id,
                    Point::new(x, y),
                    width,
                    height,
                    parse_color(id, &color)?,
                    classification,
                );
                Ok(Shape::Rectangle(rect.normalized()))
            }
            ShapeRecord::Polygon {
                id,
                points,
                color,
                classification,
            } => polygon_from_record(id, &points, true, &color, classification),
            ShapeRecord::Polyline {
                id,
                points,
                color,
                classification,
            } => polygon_from_record(id, &points, false, &color, classification),
        }
    }
}

impl Shape {
    /// Convert to the flat storage form.
    pub fn to_record(&self) -> ShapeRecord {
        match self {
            Shape::Rectangle(rect) => ShapeRecord::Rectangle {
                id: rect.id,
                x: rect.position.x,
                y: rect.position.y,
                width: rect.width,
                height: rect.height,
                color: rect.color.to_hex(),
                classification: rect.classification.clone(),
            },
            Shape::Polygon(poly) if poly.closed => ShapeRecord::Polygon {
                id: poly.id,
                points: stored_points(&poly.vertices, true),
                color: poly.color.to_hex(),
                classification: poly.classification.clone(),
            },
            Shape::Polygon(poly) => ShapeRecord::Polyline {
                id: poly.id,
                points: stored_points(&poly.vertices, false),
                color: poly.color.to_hex(),
                classification: poly.classification.clone(),
            },
        }
    }
}

/// Convert records to shapes, failing on the first invalid record or repeated id.
pub fn shapes_from_records(records: Vec<ShapeRecord>) -> Result<Vec<Shape>, ShapeError> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .map(|record| {
            let shape = Shape::try_from(record)?;
            if !seen.insert(shape.id()) {
                return Err(ShapeError::DuplicateId { id: shape.id() });
            }
            Ok(shape)
        })
        .collect()
}

/// Convert shapes to records.
pub fn records_from_shapes(shapes: &[Shape]) -> Vec<ShapeRecord> {
    shapes.iter().map(Shape::to_record).collect()
}

/// Serialize shapes to a JSON array of records.
pub fn records_to_json(shapes: &[Shape]) -> Result<String, ShapeError> {
    Ok(serde_json::to_string(&records_from_shapes(shapes))?)
}

/// Parse shapes from a JSON array of records.
pub fn records_from_json(json: &str) -> Result<Vec<Shape>, ShapeError> {
    let records: Vec<ShapeRecord> = serde_json::from_str(json)?;
    shapes_from_records(records)
}
