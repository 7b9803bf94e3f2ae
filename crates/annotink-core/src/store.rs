//! The ordered shape collection that backs the canvas.

use crate::command::{EditCommand, apply_command};
use crate::shapes::{Shape, ShapeId};
use kurbo::Point;

/// In-memory, ordered collection of shapes (back to front).
///
/// The store is replaced wholesale: callers compute a complete new sequence
/// and hand it over through [`ShapeStore::replace`] or [`ShapeStore::apply`],
/// so a rejected edit never leaves a half-applied state behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeStore {
    shapes: Vec<Shape>,
}

impl ShapeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current shapes in draw order.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Replace the whole sequence.
    pub fn replace(&mut self, shapes: Vec<Shape>) {
        self.shapes = shapes;
    }

    /// Apply an edit command. Returns true if the store changed.
    pub fn apply(&mut self, command: &EditCommand) -> bool {
        match apply_command(&self.shapes, command) {
            Some(shapes) => {
                self.replace(shapes);
                true
            }
            None => false,
        }
    }

    /// Get a shape by ID.
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    /// Check whether a shape exists.
    pub fn contains(&self, id: ShapeId) -> bool {
        self.get(id).is_some()
    }

    /// Front-most shape at a point.
    pub fn topmost_at_point(&self, point: Point, tolerance: f64) -> Option<ShapeId> {
        self.shapes
            .iter()
            .rev()
            .find(|s| s.hit_test(point, tolerance))
            .map(Shape::id)
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Get the number of shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Polygon, Rectangle};

    fn rect(x: f64, y: f64, size: f64) -> Shape {
        Shape::Rectangle(Rectangle::new(Point::new(x, y), size, size))
    }

    #[test]
    fn test_topmost_at_point() {
        let back = rect(0.0, 0.0, 100.0);
        let front = rect(50.0, 50.0, 100.0);
        let (back_id, front_id) = (back.id(), front.id());
        let mut store = ShapeStore::new();
        store.replace(vec![back, front]);

        assert_eq!(store.topmost_at_point(Point::new(75.0, 75.0), 0.0), Some(front_id));
        assert_eq!(store.topmost_at_point(Point::new(10.0, 10.0), 0.0), Some(back_id));
        assert_eq!(store.topmost_at_point(Point::new(500.0, 500.0), 0.0), None);
    }

    #[test]
    fn test_apply_reports_change() {
        let mut store = ShapeStore::new();
        let shape = rect(0.0, 0.0, 20.0);
        let id = shape.id();
        assert!(store.apply(&EditCommand::Add(shape)));
        assert!(store.contains(id));
        assert!(store.apply(&EditCommand::Remove(id)));
        assert!(!store.apply(&EditCommand::Remove(id)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_polyline_hit_on_stroke_only() {
        let mut store = ShapeStore::new();
        let line = Shape::Polygon(Polygon::polyline(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]));
        let id = line.id();
        store.replace(vec![line]);
        assert_eq!(store.topmost_at_point(Point::new(50.0, 3.0), 4.0), Some(id));
        assert_eq!(store.topmost_at_point(Point::new(50.0, 10.0), 4.0), None);
    }
}
