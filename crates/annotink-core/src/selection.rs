//! Selection handles and manipulation gestures.

use crate::command::{EditCommand, apply_command};
use crate::shapes::{Polygon, Shape, ShapeId};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Vertex handle of a polygon/polyline (index into its logical vertices).
    Vertex(usize),
    /// Corner handle of the bounding box, used for scaling.
    Corner(Corner),
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Position of this corner on `bounds`.
    pub fn position(self, bounds: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(bounds.x0, bounds.y0),
            Corner::TopRight => Point::new(bounds.x1, bounds.y0),
            Corner::BottomLeft => Point::new(bounds.x0, bounds.y1),
            Corner::BottomRight => Point::new(bounds.x1, bounds.y1),
        }
    }

    /// Diagonally opposite corner.
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in logical coordinates.
    pub position: Point,
    /// Handle type.
    pub kind: HandleKind,
}

impl Handle {
    /// Create a new handle.
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a point (in logical coordinates) hits this handle.
    /// `radius` should already be divided by the viewport scale.
    pub fn hit_test(&self, point: Point, radius: f64) -> bool {
        self.position.distance(point) <= radius
    }
}

/// Get the selection handles for a shape.
///
/// Vertex handles (only when `with_vertices` is set and the shape has
/// vertices) come first so they win over a coinciding corner.
pub fn get_handles(shape: &Shape, with_vertices: bool) -> Vec<Handle> {
    let mut handles = Vec::new();
    if with_vertices {
        if let Some(poly) = shape.as_polygon() {
            handles.extend(
                poly.vertices
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Handle::new(*p, HandleKind::Vertex(i))),
            );
        }
    }
    handles.extend(corner_handles(shape.bounds()));
    handles
}

fn corner_handles(bounds: Rect) -> Vec<Handle> {
    [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ]
    .into_iter()
    .map(|corner| Handle::new(corner.position(bounds), HandleKind::Corner(corner)))
    .collect()
}

/// Find which handle (if any) is hit at the given point.
pub fn hit_test_handles(
    shape: &Shape,
    point: Point,
    radius: f64,
    with_vertices: bool,
) -> Option<HandleKind> {
    get_handles(shape, with_vertices)
        .into_iter()
        .find(|handle| handle.hit_test(point, radius))
        .map(|handle| handle.kind)
}

/// Vertex insertion for a pointer-down on a polygon or polyline outline.
///
/// The click must land on the stroke (within `stroke_tolerance`) and the
/// nearest segment must lie within `threshold`. The new vertex goes right
/// after the segment's start index, which for the wrap-around segment of a
/// closed polygon is the end of the list.
pub fn edge_insertion(
    polygon: &Polygon,
    point: Point,
    stroke_tolerance: f64,
    threshold: f64,
) -> Option<EditCommand> {
    let (index, dist) = polygon.nearest_edge(point)?;
    if dist > stroke_tolerance || dist > threshold {
        return None;
    }
    Some(EditCommand::InsertVertex {
        id: polygon.id,
        index: index + 1,
        point,
    })
}

/// Scale and translation produced by dragging `corner` of `shape` by `delta`.
///
/// The opposite corner of the bounding box stays fixed. Rectangles take the
/// translation of their top-left corner, polygons that of their bounding box
/// center, matching how [`EditCommand::Transform`] is applied.
pub fn corner_transform(shape: &Shape, corner: Corner, delta: Vec2) -> (Vec2, Vec2) {
    let bounds = shape.bounds();
    let anchor = corner.opposite().position(bounds);
    let grabbed = corner.position(bounds);
    let dragged = grabbed + delta;

    let axis_scale = |from: f64, to: f64, origin: f64| {
        let span = from - origin;
        if span.abs() < f64::EPSILON {
            1.0
        } else {
            (to - origin) / span
        }
    };
    let scale = Vec2::new(
        axis_scale(grabbed.x, dragged.x, anchor.x),
        axis_scale(grabbed.y, dragged.y, anchor.y),
    );

    let reference = match shape {
        Shape::Rectangle(rect) => rect.position,
        Shape::Polygon(poly) => poly.center(),
    };
    let moved = Point::new(
        anchor.x + (reference.x - anchor.x) * scale.x,
        anchor.y + (reference.y - anchor.y) * scale.y,
    );
    (scale, moved - reference)
}

/// State of an active manipulation of a single shape.
#[derive(Debug, Clone)]
pub struct ManipulationState {
    /// The shape being manipulated.
    pub shape_id: ShapeId,
    /// The handle being dragged (None = moving the whole shape).
    pub handle: Option<HandleKind>,
    /// Starting point of the drag.
    pub start_point: Point,
    /// Current point of the drag.
    pub current_point: Point,
    /// Shape as it was when the gesture began.
    pub original_shape: Shape,
}

impl ManipulationState {
    /// Create a new manipulation state.
    pub fn new(
        shape_id: ShapeId,
        handle: Option<HandleKind>,
        start_point: Point,
        original_shape: Shape,
    ) -> Self {
        Self {
            shape_id,
            handle,
            start_point,
            current_point: start_point,
            original_shape,
        }
    }

    /// Get the drag delta.
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }

    /// Command that applies the gesture so far to the original shape.
    ///
    /// Vertex drags always target the current pointer, so a drag back to the
    /// press point restores the vertex. Translate and transform return `None`
    /// while the pointer sits on the press point.
    pub fn command(&self, min_size: f64) -> Option<EditCommand> {
        let delta = self.delta();
        let id = self.shape_id;
        match self.handle {
            None | Some(HandleKind::Corner(_)) if delta == Vec2::ZERO => None,
            None => Some(EditCommand::Translate { id, delta }),
            Some(HandleKind::Corner(corner)) => {
                let (scale, translation) = corner_transform(&self.original_shape, corner, delta);
                Some(EditCommand::Transform {
                    id,
                    scale,
                    translation,
                    min_size,
                })
            }
            Some(HandleKind::Vertex(index)) => {
                let vertex = *self.original_shape.as_polygon()?.vertices.get(index)?;
                Some(EditCommand::MoveVertex {
                    id,
                    index,
                    point: vertex + delta,
                })
            }
        }
    }

    /// Original shape with the gesture applied, for live preview.
    pub fn preview(&self, min_size: f64) -> Shape {
        self.command(min_size)
            .and_then(|command| apply_command(std::slice::from_ref(&self.original_shape), &command))
            .and_then(|mut shapes| shapes.pop())
            .unwrap_or_else(|| self.original_shape.clone())
    }
}
