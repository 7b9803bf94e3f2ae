//! Edit commands and the reducer that applies them.
//!
//! Every mutation of the shape sequence is expressed as an [`EditCommand`]
//! and applied through [`apply_command`], which computes a complete new
//! sequence or reports a no-op. Commands that would break a shape invariant
//! (unknown id, vertex floor, out-of-range index) are no-ops.

use crate::shapes::{Classification, SerializableColor, Shape, ShapeId, ShapeTrait};
use kurbo::{Point, Vec2};

/// A single named edit of the shape sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    /// Append a new shape on top.
    Add(Shape),
    /// Remove a shape.
    Remove(ShapeId),
    /// Move a whole shape.
    Translate { id: ShapeId, delta: Vec2 },
    /// Commit a scale gesture.
    ///
    /// Rectangles are scaled about their top-left corner and `translation`
    /// moves that corner; width and height are normalized and floored at
    /// `min_size`. Polygons and polylines are scaled about the center of their
    /// bounding box and `translation` moves that center.
    Transform {
        id: ShapeId,
        scale: Vec2,
        translation: Vec2,
        min_size: f64,
    },
    /// Insert a vertex before `index` (polygon/polyline only).
    InsertVertex { id: ShapeId, index: usize, point: Point },
    /// Move one vertex (polygon/polyline only).
    MoveVertex { id: ShapeId, index: usize, point: Point },
    /// Delete one vertex, respecting the vertex floor.
    DeleteVertex { id: ShapeId, index: usize },
    /// Replace a shape's label.
    SetClassification {
        id: ShapeId,
        classification: Classification,
    },
    /// Replace a shape's stroke color.
    SetColor { id: ShapeId, color: SerializableColor },
}

impl EditCommand {
    /// The shape this command targets.
    pub fn target(&self) -> ShapeId {
        match self {
            EditCommand::Add(shape) => shape.id(),
            EditCommand::Remove(id)
            | EditCommand::Translate { id, .. }
            | EditCommand::Transform { id, .. }
            | EditCommand::InsertVertex { id, .. }
            | EditCommand::MoveVertex { id, .. }
            | EditCommand::DeleteVertex { id, .. }
            | EditCommand::SetClassification { id, .. }
            | EditCommand::SetColor { id, .. } => *id,
        }
    }

    /// Short name for log output.
    pub fn name(&self) -> &'static str {
        match self {
            EditCommand::Add(_) => "add",
            EditCommand::Remove(_) => "remove",
            EditCommand::Translate { .. } => "translate",
            EditCommand::Transform { .. } => "transform",
            EditCommand::InsertVertex { .. } => "insert-vertex",
            EditCommand::MoveVertex { .. } => "move-vertex",
            EditCommand::DeleteVertex { .. } => "delete-vertex",
            EditCommand::SetClassification { .. } => "set-classification",
            EditCommand::SetColor { .. } => "set-color",
        }
    }
}

/// Apply `command` to `shapes`.
///
/// Returns the new sequence, or `None` when the command changes nothing.
pub fn apply_command(shapes: &[Shape], command: &EditCommand) -> Option<Vec<Shape>> {
    match command {
        EditCommand::Add(shape) => {
            if shapes.iter().any(|s| s.id() == shape.id()) {
                return None;
            }
            let mut next = shapes.to_vec();
            next.push(shape.clone());
            Some(next)
        }
        EditCommand::Remove(id) => {
            let index = shapes.iter().position(|s| s.id() == *id)?;
            let mut next = shapes.to_vec();
            next.remove(index);
            Some(next)
        }
        _ => {
            let index = shapes.iter().position(|s| s.id() == command.target())?;
            let updated = edit_shape(&shapes[index], command)?;
            let mut next = shapes.to_vec();
            next[index] = updated;
            Some(next)
        }
    }
}

/// Clamp `scale` so an axis of extent `span` ends up at least `min_size` long.
/// Axes with no extent keep their scale.
fn floored_scale(scale: f64, span: f64, min_size: f64) -> f64 {
    if span <= f64::EPSILON || (span * scale).abs() >= min_size {
        return scale;
    }
    let floor = min_size / span;
    if scale < 0.0 { -floor } else { floor }
}

/// Compute the edited version of a single shape.
fn edit_shape(shape: &Shape, command: &EditCommand) -> Option<Shape> {
    let mut shape = shape.clone();
    match command {
        EditCommand::Translate { delta, .. } => {
            if *delta == Vec2::ZERO {
                return None;
            }
            shape.translate(*delta);
        }
        EditCommand::Transform {
            scale,
            translation,
            min_size,
            ..
        } => {
            if *scale == Vec2::new(1.0, 1.0) && *translation == Vec2::ZERO {
                return None;
            }
            match &mut shape {
                Shape::Rectangle(rect) => {
                    rect.position += *translation;
                    rect.width *= scale.x;
                    rect.height *= scale.y;
                    *rect = rect.normalized();
                    rect.width = rect.width.max(*min_size);
                    rect.height = rect.height.max(*min_size);
                }
                Shape::Polygon(poly) => {
                    let center = poly.center();
                    let bounds = poly.bounds();
                    let sx = floored_scale(scale.x, bounds.width(), *min_size);
                    let sy = floored_scale(scale.y, bounds.height(), *min_size);
                    poly.scale_about(center, sx, sy, *translation);
                }
            }
        }
        EditCommand::InsertVertex { index, point, .. } => {
            if !shape.as_polygon_mut()?.insert_vertex(*index, *point) {
                return None;
            }
        }
        EditCommand::MoveVertex { index, point, .. } => {
            let poly = shape.as_polygon_mut()?;
            if poly.vertices.get(*index) == Some(point) || !poly.move_vertex(*index, *point) {
                return None;
            }
        }
        EditCommand::DeleteVertex { index, .. } => {
            if !shape.as_polygon_mut()?.remove_vertex(*index) {
                return None;
            }
        }
        EditCommand::SetClassification { classification, .. } => {
            if shape.classification() == classification {
                return None;
            }
            shape.set_classification(classification.clone());
        }
        EditCommand::SetColor { color, .. } => {
            if shape.color() == *color {
                return None;
            }
            shape.set_color(*color);
        }
        EditCommand::Add(_) | EditCommand::Remove(_) => return None,
    }
    Some(shape)
}
