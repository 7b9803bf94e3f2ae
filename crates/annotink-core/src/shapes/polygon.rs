//! Polygon and polyline shapes.

use super::{
    Classification, SerializableColor, ShapeId, ShapeTrait, point_to_segment_dist, points_bounds,
};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum number of logical vertices of a closed polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;
/// Minimum number of logical vertices of an open polyline.
pub const MIN_POLYLINE_VERTICES: usize = 2;

/// A closed polygon or an open polyline.
///
/// `vertices` only ever holds logical vertices. The closing edge of a polygon
/// is implied by `closed`; no duplicate of the first vertex is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub(crate) id: ShapeId,
    /// Logical vertices in drawing order.
    pub vertices: Vec<Point>,
    /// Whether the last vertex connects back to the first.
    pub closed: bool,
    /// Stroke color.
    pub color: SerializableColor,
    /// Label assigned by the owning screen.
    #[serde(default)]
    pub classification: Classification,
}

impl Polygon {
    /// Create a new polygon or polyline with a fresh id.
    pub fn new(vertices: Vec<Point>, closed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            vertices,
            closed,
            color: SerializableColor::black(),
            classification: Classification::default(),
        }
    }

    /// Create a closed polygon.
    pub fn polygon(vertices: Vec<Point>) -> Self {
        Self::new(vertices, true)
    }

    /// Create an open polyline.
    pub fn polyline(vertices: Vec<Point>) -> Self {
        Self::new(vertices, false)
    }

    /// Reconstruct a polygon with a specific ID (for records).
    pub(crate) fn reconstruct(
        id: ShapeId,
        vertices: Vec<Point>,
        closed: bool,
        color: SerializableColor,
        classification: Classification,
    ) -> Self {
        Self {
            id,
            vertices,
            closed,
            color,
            classification,
        }
    }

    /// Vertex floor: 3 for polygons, 2 for polylines.
    pub fn min_vertices(&self) -> usize {
        if self.closed {
            MIN_POLYGON_VERTICES
        } else {
            MIN_POLYLINE_VERTICES
        }
    }

    /// Iterate over edges as `(start_index, start, end)`.
    ///
    /// Closed polygons include the wrap-around edge from the last vertex back
    /// to the first; polylines do not.
    pub fn edges(&self) -> impl Iterator<Item = (usize, Point, Point)> + '_ {
        let n = self.vertices.len();
        let count = if self.closed && n > 2 { n } else { n.saturating_sub(1) };
        (0..count).map(move |i| (i, self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Find the edge closest to `point`, as `(start_index, distance)`.
    pub fn nearest_edge(&self, point: Point) -> Option<(usize, f64)> {
        self.edges()
            .map(|(i, a, b)| (i, point_to_segment_dist(point, a, b)))
            .fold(None, |best, (i, dist)| match best {
                Some((_, best_dist)) if best_dist <= dist => best,
                _ => Some((i, dist)),
            })
    }

    /// Minimum distance from `point` to the outline.
    pub fn outline_dist(&self, point: Point) -> f64 {
        self.nearest_edge(point)
            .map(|(_, dist)| dist)
            .unwrap_or(f64::INFINITY)
    }

    /// Insert a vertex at `index` (`0..=len`). Returns false if out of range.
    pub fn insert_vertex(&mut self, index: usize, point: Point) -> bool {
        if index > self.vertices.len() {
            return false;
        }
        self.vertices.insert(index, point);
        true
    }

    /// Move the vertex at `index`. Returns false if out of range.
    pub fn move_vertex(&mut self, index: usize, point: Point) -> bool {
        match self.vertices.get_mut(index) {
            Some(vertex) => {
                *vertex = point;
                true
            }
            None => false,
        }
    }

    /// Remove the vertex at `index`.
    ///
    /// Refused (returns false) when out of range or when it would take the
    /// shape below its vertex floor.
    pub fn remove_vertex(&mut self, index: usize) -> bool {
        if index >= self.vertices.len() || self.vertices.len() <= self.min_vertices() {
            return false;
        }
        self.vertices.remove(index);
        true
    }

    /// Center of the axis-aligned bounding box.
    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Scale every vertex about `center` by `(sx, sy)`, then translate.
    pub fn scale_about(&mut self, center: Point, sx: f64, sy: f64, translation: Vec2) {
        for vertex in &mut self.vertices {
            *vertex = Point::new(
                center.x + (vertex.x - center.x) * sx + translation.x,
                center.y + (vertex.y - center.y) * sy + translation.y,
            );
        }
    }
}

impl ShapeTrait for Polygon {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        points_bounds(&self.vertices)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        if self.outline_dist(point) <= tolerance {
            return true;
        }
        self.closed && self.vertices.len() >= MIN_POLYGON_VERTICES && self.to_path().winding(point) != 0
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let Some((first, rest)) = self.vertices.split_first() else {
            return path;
        };
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
        if self.closed {
            path.close_path();
        }
        path
    }

    fn translate(&mut self, delta: Vec2) {
        for vertex in &mut self.vertices {
            *vertex += delta;
        }
    }
}
