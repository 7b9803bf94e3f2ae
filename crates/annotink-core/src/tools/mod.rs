//! Drawing modes and the draw session that turns pointer input into new shapes.

use crate::shapes::{Polygon, Rectangle, SerializableColor, Shape};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Active interaction mode chosen by the owning screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Selection and editing only; no new shapes.
    #[default]
    Cursor,
    Rectangle,
    Polygon,
    Polyline,
}

impl Mode {
    /// Whether this mode creates new shapes on empty canvas space.
    pub fn is_drawing(self) -> bool {
        !matches!(self, Mode::Cursor)
    }
}

/// State of the draw session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DraftState {
    /// No shape in progress.
    #[default]
    Idle,
    /// A rectangle is being dragged out from `start`.
    Dragging { start: Point, current: Point },
    /// Polygon/polyline vertices are being placed one click at a time.
    PlacingVertices { closed: bool, points: Vec<Point> },
}

/// In-progress geometry handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftPreview {
    /// Raw drag box; `width`/`height` may be negative.
    Rectangle { origin: Point, width: f64, height: f64 },
    /// Placed vertices plus the rubber-band end at the pointer, if known.
    Vertices {
        points: Vec<Point>,
        closed: bool,
        pointer: Option<Point>,
    },
}

/// Accumulates pointer input into a single new shape.
///
/// At most one draft exists at a time. A finished draft is returned to the
/// caller as a complete [`Shape`] with a fresh id; a draft that fails its
/// size or vertex-count check is discarded without producing anything.
#[derive(Debug, Clone, Default)]
pub struct DrawSession {
    /// Current draft.
    pub state: DraftState,
    /// Last pointer position while placing vertices.
    pointer: Option<Point>,
}

impl DrawSession {
    /// Create an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a draft is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DraftState::Idle)
    }

    /// Check if polygon/polyline vertices are being placed.
    pub fn is_placing_vertices(&self) -> bool {
        matches!(self.state, DraftState::PlacingVertices { .. })
    }

    /// Start dragging out a rectangle.
    pub fn begin_rectangle(&mut self, start: Point) {
        self.pointer = None;
        self.state = DraftState::Dragging { start, current: start };
    }

    /// Track the pointer.
    pub fn update(&mut self, point: Point) {
        match &mut self.state {
            DraftState::Dragging { current, .. } => *current = point,
            DraftState::PlacingVertices { .. } => self.pointer = Some(point),
            DraftState::Idle => {}
        }
    }

    /// Finish a rectangle drag at `point`.
    ///
    /// The rectangle is kept only if both raw extents exceed `min_size`.
    pub fn end_rectangle(&mut self, point: Point, min_size: f64, color: SerializableColor) -> Option<Shape> {
        let DraftState::Dragging { start, .. } = self.state else {
            return None;
        };
        self.state = DraftState::Idle;

        let width = point.x - start.x;
        let height = point.y - start.y;
        if width.abs() <= min_size || height.abs() <= min_size {
            log::debug!("Discarding rectangle draft {width:.1}x{height:.1}");
            return None;
        }
        let mut rect = Rectangle::from_corners(start, point);
        rect.color = color;
        Some(Shape::Rectangle(rect))
    }

    /// Handle a click while drawing a polygon (`closed`) or polyline.
    ///
    /// The first click starts the draft and later clicks append. For
    /// polygons, a click within `close_radius` of the first vertex with at
    /// least two vertices placed finishes the draft instead; the result of
    /// that finish is returned.
    pub fn place_vertex(
        &mut self,
        point: Point,
        closed: bool,
        close_radius: f64,
        color: SerializableColor,
    ) -> Option<Shape> {
        match &mut self.state {
            DraftState::PlacingVertices { closed: true, points }
                if points.len() >= 2 && points[0].distance(point) <= close_radius =>
            {
                self.finish(color)
            }
            DraftState::PlacingVertices { points, .. } => {
                points.push(point);
                None
            }
            DraftState::Idle | DraftState::Dragging { .. } => {
                self.state = DraftState::PlacingVertices {
                    closed,
                    points: vec![point],
                };
                self.pointer = Some(point);
                None
            }
        }
    }

    /// Finish the vertex draft (double-click or close-click).
    ///
    /// Needs at least two placed vertices to do anything. A polygon with
    /// fewer than three distinct vertices is discarded.
    pub fn finish(&mut self, color: SerializableColor) -> Option<Shape> {
        let DraftState::PlacingVertices { closed, points } = &self.state else {
            return None;
        };
        if points.len() < 2 {
            return None;
        }
        let closed = *closed;
        let mut points = points.clone();
        self.reset();

        // The clicks of a double-click land on the same spot
        points.dedup_by(|a, b| a.distance(*b) < f64::EPSILON);

        let min = if closed { 3 } else { 2 };
        if points.len() < min {
            log::debug!("Discarding vertex draft with {} vertices", points.len());
            return None;
        }
        let mut polygon = Polygon::new(points, closed);
        polygon.color = color;
        Some(Shape::Polygon(polygon))
    }

    /// Abandon the draft.
    pub fn cancel(&mut self) {
        if self.is_active() {
            log::trace!("Draw session cancelled");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = DraftState::Idle;
        self.pointer = None;
    }

    /// Geometry of the draft for rendering.
    pub fn preview(&self) -> Option<DraftPreview> {
        match &self.state {
            DraftState::Idle => None,
            DraftState::Dragging { start, current } => Some(DraftPreview::Rectangle {
                origin: *start,
                width: current.x - start.x,
                height: current.y - start.y,
            }),
            DraftState::PlacingVertices { closed, points } => Some(DraftPreview::Vertices {
                points: points.clone(),
                closed: *closed,
                pointer: self.pointer,
            }),
        }
    }
}
